use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

use crate::llm::credentials::{DEFAULT_METADATA_HOST, METADATA_HOST_ENV};
use crate::llm::{
    ClientConfig, CredentialProvider, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
    MetadataIdentity, RetryConfig,
};

pub const URL_ENV: &str = "GEMMA_URL";
pub const MODEL_ENV: &str = "GP_MODEL";
pub const AUTH_ENV: &str = "GP_AUTH";
pub const TEMPERATURE_ENV: &str = "GP_TEMPERATURE";
pub const TIMEOUT_ENV: &str = "GP_TIMEOUT";
pub const RETRIES_ENV: &str = "GP_RETRIES";
pub const RETRY_DELAY_ENV: &str = "GP_RETRY_DELAY";
pub const CONFIG_ENV: &str = "GP_CONFIG";

/// Configuration failures. All of them are fatal before any request is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No endpoint URL provided. Use --url or set GEMMA_URL.")]
    MissingEndpoint,

    #[error("Invalid endpoint URL '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("Invalid {origin} '{value}'. {expected}.")]
    InvalidValue {
        origin: String,
        value: String,
        expected: &'static str,
    },

    #[error("Cannot resolve config path: set GP_CONFIG or HOME/XDG_CONFIG_HOME.")]
    NoConfigPath,

    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file '{}' does not contain a [profiles] section.", .path.display())]
    NoProfiles { path: PathBuf },

    #[error("Profile '{name}' not found in config file '{}'.", .path.display())]
    ProfileNotFound { name: String, path: PathBuf },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

const AUTH_VALUES: &str = "Supported values: metadata, none";
const OUTPUT_VALUES: &str = "Supported values: text, json";
const TEMPERATURE_RANGE: &str = "Expected a number between 0 and 1";
const POSITIVE_SECONDS: &str = "Expected a positive number of seconds";
const NON_NEGATIVE: &str = "Expected a non-negative integer";

/// How outgoing requests are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthMode {
    /// Identity token from the compute metadata server, falling back to none.
    Metadata,
    /// Never attach an identity token.
    None,
}

impl AuthMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::None => "none",
        }
    }
}

impl FromStr for AuthMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "metadata" => Ok(Self::Metadata),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileConfig {
    pub url: Option<String>,
    pub model: Option<String>,
    pub auth: Option<String>,
    pub temperature: Option<f64>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub output: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    profiles: Option<HashMap<String, ProfileConfig>>,
}

/// Values given on the command line. They win over environment and profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub auth: Option<AuthMode>,
    pub temperature: Option<f64>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay: Option<u64>,
    pub output: Option<OutputMode>,
}

/// Fully resolved settings for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url: String,
    pub model: String,
    pub auth: AuthMode,
    pub metadata_host: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub output: OutputMode,
}

impl Settings {
    /// Resolves settings from flags, the process environment and the
    /// profile named by `overrides.profile`.
    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| env::var(key).ok())
    }

    /// Same as [`Settings::resolve`] with an explicit environment lookup.
    pub fn resolve_with<F>(overrides: &Overrides, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = match overrides.profile.as_deref() {
            Some(name) => load_profile_with(name, &env)?,
            None => ProfileConfig::default(),
        };

        let url = overrides
            .url
            .clone()
            .or_else(|| env_value(&env, URL_ENV))
            .or(profile.url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        let model = overrides
            .model
            .clone()
            .or_else(|| env_value(&env, MODEL_ENV))
            .or(profile.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let auth = match overrides.auth {
            Some(auth) => auth,
            None => match parse_env::<AuthMode, _>(&env, AUTH_ENV, AUTH_VALUES)? {
                Some(auth) => auth,
                None => parse_profile(profile.auth.as_deref(), "profile auth", AUTH_VALUES)?
                    .unwrap_or(AuthMode::Metadata),
            },
        };

        let temperature = match overrides.temperature {
            Some(value) => Some(value),
            None => parse_env::<f64, _>(&env, TEMPERATURE_ENV, TEMPERATURE_RANGE)?,
        }
        .or(profile.temperature)
        .unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                origin: "temperature".to_string(),
                value: temperature.to_string(),
                expected: TEMPERATURE_RANGE,
            });
        }

        let timeout_secs = match overrides.timeout {
            Some(value) => Some(value),
            None => parse_env::<u64, _>(&env, TIMEOUT_ENV, POSITIVE_SECONDS)?,
        }
        .or(profile.timeout)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                origin: "timeout".to_string(),
                value: "0".to_string(),
                expected: POSITIVE_SECONDS,
            });
        }

        let retries = match overrides.retries {
            Some(value) => Some(value),
            None => parse_env::<u32, _>(&env, RETRIES_ENV, NON_NEGATIVE)?,
        }
        .or(profile.retries)
        .unwrap_or(0);

        let retry_delay_ms = match overrides.retry_delay {
            Some(value) => Some(value),
            None => parse_env::<u64, _>(&env, RETRY_DELAY_ENV, NON_NEGATIVE)?,
        }
        .or(profile.retry_delay)
        .unwrap_or(RetryConfig::default().retry_delay_ms);

        let output = match overrides.output {
            Some(output) => output,
            None => parse_profile(profile.output.as_deref(), "profile output", OUTPUT_VALUES)?
                .unwrap_or(OutputMode::Text),
        };

        let metadata_host =
            env_value(&env, METADATA_HOST_ENV).unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());

        Ok(Self {
            url,
            model,
            auth,
            metadata_host,
            temperature,
            timeout_secs,
            retries,
            retry_delay_ms,
            output,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.url.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryConfig {
                retries: self.retries,
                retry_delay_ms: self.retry_delay_ms,
            },
        }
    }

    pub fn credentials(&self) -> Result<CredentialProvider, ConfigError> {
        match self.auth {
            AuthMode::Metadata => {
                let source =
                    MetadataIdentity::new(&self.metadata_host).map_err(ConfigError::HttpClient)?;
                Ok(CredentialProvider::new(Arc::new(source)))
            }
            AuthMode::None => Ok(CredentialProvider::disabled()),
        }
    }
}

fn env_value<F: Fn(&str) -> Option<String>>(env: &F, key: &str) -> Option<String> {
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: FromStr, F: Fn(&str) -> Option<String>>(
    env: &F,
    key: &str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match env_value(env, key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                origin: key.to_string(),
                value: raw,
                expected,
            }),
        None => Ok(None),
    }
}

fn parse_profile<T: FromStr>(
    raw: Option<&str>,
    origin: &str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                origin: origin.to_string(),
                value: raw.to_string(),
                expected,
            }),
        None => Ok(None),
    }
}

fn load_profile_with<F: Fn(&str) -> Option<String>>(
    name: &str,
    env: &F,
) -> Result<ProfileConfig, ConfigError> {
    let path = config_path(env)?;
    let profiles = read_profiles(&path)?;
    profiles
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
            path,
        })
}

fn read_profiles(path: &Path) -> Result<HashMap<String, ProfileConfig>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.profiles.ok_or_else(|| ConfigError::NoProfiles {
        path: path.to_path_buf(),
    })
}

/// Checks that the config file parses and, when `profile` is given, that the
/// profile exists and its enumerated values are valid.
pub fn validate_config(profile: Option<&str>) -> Result<PathBuf, ConfigError> {
    let env = |key: &str| env::var(key).ok();
    let path = config_path(&env)?;
    let profiles = read_profiles(&path)?;

    if let Some(name) = profile {
        let selected = profiles.get(name).ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.to_string(),
            path: path.clone(),
        })?;
        parse_profile::<AuthMode>(selected.auth.as_deref(), "profile auth", AUTH_VALUES)?;
        parse_profile::<OutputMode>(selected.output.as_deref(), "profile output", OUTPUT_VALUES)?;
    }

    Ok(path)
}

fn config_path<F: Fn(&str) -> Option<String>>(env: &F) -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_value(env, CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    if let Some(xdg) = env_value(env, "XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("gempipe").join("config.toml"));
    }

    let home = env_value(env, "HOME").ok_or(ConfigError::NoConfigPath)?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("gempipe")
        .join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        }
    }

    fn temp_config(label: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!(
            "gempipe-config-{label}-{}.toml",
            std::process::id()
        ));
        fs::write(&path, contents).expect("config should be writable");
        path
    }

    #[test]
    fn missing_endpoint_is_fatal() {
        let err = Settings::resolve_with(&Overrides::default(), env_of(&[]))
            .expect_err("no url anywhere");
        assert!(matches!(err, ConfigError::MissingEndpoint));
    }

    #[test]
    fn blank_endpoint_counts_as_missing() {
        let err = Settings::resolve_with(&Overrides::default(), env_of(&[(URL_ENV, "   ")]))
            .expect_err("blank url");
        assert!(matches!(err, ConfigError::MissingEndpoint));
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let settings =
            Settings::resolve_with(&Overrides::default(), env_of(&[(URL_ENV, "http://gemma")]))
                .expect("settings");
        assert_eq!(settings.url, "http://gemma");
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.auth, AuthMode::Metadata);
        assert_eq!(settings.metadata_host, DEFAULT_METADATA_HOST);
        assert_eq!(settings.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.retries, 0);
        assert_eq!(settings.output, OutputMode::Text);
    }

    #[test]
    fn flags_override_environment() {
        let overrides = Overrides {
            url: Some("http://flag".to_string()),
            auth: Some(AuthMode::None),
            timeout: Some(5),
            ..Overrides::default()
        };
        let env = env_of(&[
            (URL_ENV, "http://env"),
            (AUTH_ENV, "metadata"),
            (TIMEOUT_ENV, "9"),
            (MODEL_ENV, "gemma3:12b"),
        ]);
        let settings = Settings::resolve_with(&overrides, env).expect("settings");
        assert_eq!(settings.url, "http://flag");
        assert_eq!(settings.auth, AuthMode::None);
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.model, "gemma3:12b");
    }

    #[test]
    fn environment_overrides_profile() {
        let path = temp_config(
            "env-over-profile",
            "[profiles.cloud]\nurl = \"http://profile\"\nretries = 2\ntimeout = 11\n",
        );
        let overrides = Overrides {
            profile: Some("cloud".to_string()),
            ..Overrides::default()
        };
        let path_str = path.to_string_lossy().to_string();
        let env = env_of(&[(CONFIG_ENV, path_str.as_str()), (TIMEOUT_ENV, "4")]);
        let settings = Settings::resolve_with(&overrides, env).expect("settings");
        assert_eq!(settings.url, "http://profile");
        assert_eq!(settings.retries, 2);
        assert_eq!(settings.timeout_secs, 4);
    }

    #[test]
    fn invalid_env_values_name_the_variable() {
        let err = Settings::resolve_with(
            &Overrides::default(),
            env_of(&[(URL_ENV, "http://gemma"), (AUTH_ENV, "kerberos")]),
        )
        .expect_err("bad auth");
        assert_eq!(
            err.to_string(),
            "Invalid GP_AUTH 'kerberos'. Supported values: metadata, none."
        );

        let err = Settings::resolve_with(
            &Overrides::default(),
            env_of(&[(URL_ENV, "http://gemma"), (RETRIES_ENV, "-1")]),
        )
        .expect_err("bad retries");
        assert!(err.to_string().starts_with("Invalid GP_RETRIES '-1'"));
    }

    #[test]
    fn temperature_outside_unit_range_is_rejected() {
        let overrides = Overrides {
            temperature: Some(1.5),
            ..Overrides::default()
        };
        let err = Settings::resolve_with(&overrides, env_of(&[(URL_ENV, "http://gemma")]))
            .expect_err("temperature too high");
        assert!(err.to_string().contains("between 0 and 1"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Settings::resolve_with(
            &Overrides::default(),
            env_of(&[(URL_ENV, "http://gemma"), (TIMEOUT_ENV, "0")]),
        )
        .expect_err("zero timeout");
        assert!(err.to_string().contains("positive number of seconds"));
    }

    #[test]
    fn metadata_host_comes_from_environment() {
        let settings = Settings::resolve_with(
            &Overrides::default(),
            env_of(&[(URL_ENV, "http://gemma"), (METADATA_HOST_ENV, "127.0.0.1:9")]),
        )
        .expect("settings");
        assert_eq!(settings.metadata_host, "127.0.0.1:9");
    }

    #[test]
    fn xdg_config_home_is_used_before_home() {
        let path = config_path(&env_of(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]))
            .expect("path");
        assert_eq!(path, PathBuf::from("/xdg/gempipe/config.toml"));

        let path = config_path(&env_of(&[("HOME", "/home/u")])).expect("path");
        assert_eq!(path, PathBuf::from("/home/u/.config/gempipe/config.toml"));

        assert!(matches!(
            config_path(&env_of(&[])),
            Err(ConfigError::NoConfigPath)
        ));
    }

    #[test]
    fn client_config_carries_timeout_and_retry() {
        let overrides = Overrides {
            retries: Some(3),
            retry_delay: Some(50),
            timeout: Some(12),
            ..Overrides::default()
        };
        let settings = Settings::resolve_with(&overrides, env_of(&[(URL_ENV, "http://gemma/")]))
            .expect("settings");
        let config = settings.client_config();
        assert_eq!(config.endpoint, "http://gemma/");
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(
            config.retry,
            RetryConfig {
                retries: 3,
                retry_delay_ms: 50
            }
        );
    }
}
