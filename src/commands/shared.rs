use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;
use tracing::debug;

use crate::config::{AuthMode, OutputMode, Overrides, Settings};
use crate::llm::GenerationClient;
use crate::logging::Verbosity;

/// Endpoint, auth and output flags common to every request-issuing command.
#[derive(Debug, Args, Clone, Default)]
pub struct ConnectionArgs {
    #[arg(long, help = "Base URL of the generation endpoint (overrides GEMMA_URL)")]
    pub url: Option<String>,
    #[arg(long, help = "Profile name from the config file")]
    pub profile: Option<String>,
    #[arg(long, help = "Model identifier (overrides GP_MODEL)")]
    pub model: Option<String>,
    #[arg(long, value_enum, help = "Identity token source (overrides GP_AUTH)")]
    pub auth: Option<AuthMode>,
    #[arg(long, help = "Request timeout in seconds (overrides GP_TIMEOUT)")]
    pub timeout: Option<u64>,
    #[arg(long, help = "Retries on connect errors and timeouts (overrides GP_RETRIES)")]
    pub retries: Option<u32>,
    #[arg(long = "retry-delay", help = "Base retry delay in milliseconds")]
    pub retry_delay: Option<u64>,
    #[arg(long, value_enum, help = "Output format")]
    pub output: Option<OutputMode>,
    #[arg(long, help = "Shorthand for --output json")]
    pub json: bool,
    #[arg(long, value_name = "PATH", help = "Also write the output to PATH")]
    pub save: Option<PathBuf>,
    #[arg(long = "dry-run", help = "Print the request instead of sending it")]
    pub dry_run: bool,
    #[arg(short, long, help = "Log request details to stderr")]
    pub verbose: bool,
    #[arg(short, long, help = "Suppress all logs on stderr")]
    pub quiet: bool,
}

impl ConnectionArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    pub(crate) fn overrides(&self, temperature: Option<f64>) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            url: self.url.clone(),
            model: self.model.clone(),
            auth: self.auth,
            temperature,
            timeout: self.timeout,
            retries: self.retries,
            retry_delay: self.retry_delay,
            output: if self.json {
                Some(OutputMode::Json)
            } else {
                self.output
            },
        }
    }

    pub(crate) fn settings(&self, temperature: Option<f64>) -> Result<Settings, String> {
        let settings = Settings::resolve(&self.overrides(temperature)).map_err(|err| err.to_string())?;
        debug!(
            url = %settings.url,
            model = %settings.model,
            auth = settings.auth.as_str(),
            timeout_secs = settings.timeout_secs,
            retries = settings.retries,
            "resolved settings"
        );
        Ok(settings)
    }

    /// Prints `text` to stdout and, with `--save`, writes it to the file.
    pub(crate) fn emit(&self, text: &str) -> Result<(), String> {
        println!("{text}");
        match &self.save {
            Some(path) => save_output(path, text),
            None => Ok(()),
        }
    }

    pub(crate) fn emit_json(&self, value: &Value) -> Result<(), String> {
        self.emit(&to_json_line(value)?)
    }
}

fn save_output(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    fs::write(path, contents)
        .map_err(|err| format!("Failed to write output file '{}': {err}", path.display()))
}

fn to_json_line(value: &Value) -> Result<String, String> {
    serde_json::to_string(value).map_err(|err| format!("Failed to serialize output: {err}"))
}

pub(crate) fn build_client(settings: &Settings) -> Result<GenerationClient, String> {
    let credentials = settings.credentials().map_err(|err| err.to_string())?;
    GenerationClient::new(settings.client_config(), credentials).map_err(|err| err.to_string())
}

pub(crate) fn print_json(value: &Value) -> Result<(), String> {
    println!("{}", to_json_line(value)?);
    Ok(())
}
