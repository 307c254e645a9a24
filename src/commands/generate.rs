use std::io::{self, IsTerminal, Read};
use std::time::Instant;

use clap::Args;
use serde_json::{Value, json};

use crate::commands::shared::build_client;
use crate::commands::ConnectionArgs;
use crate::config::OutputMode;
use crate::llm::Usage;

const NO_PROMPT: &str = "No prompt provided. Pass PROMPT or pipe text on stdin.";

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(long, help = "Sampling temperature between 0 and 1 (overrides GP_TEMPERATURE)")]
    pub temperature: Option<f64>,
    #[arg(long = "show-usage", help = "Print token usage and latency to stderr")]
    pub show_usage: bool,
    #[arg(value_name = "PROMPT", help = "Prompt text; read from stdin when omitted")]
    pub prompt: Option<String>,
}

pub async fn run(args: GenerateArgs) -> Result<(), String> {
    let connection = &args.connection;
    let settings = connection.settings(args.temperature)?;
    let prompt = read_prompt(args.prompt.clone())?;
    let client = build_client(&settings)?;
    let report_usage = args.show_usage && !connection.quiet;

    if connection.dry_run {
        connection.emit_json(&json!({
            "dry_run": true,
            "url": client.generate_url(),
            "model": client.model(),
            "auth": settings.auth.as_str(),
            "output": settings.output.as_str(),
            "timeout_secs": settings.timeout_secs,
            "retries": settings.retries,
            "request": client.request_body(&prompt, settings.temperature),
        }))?;
        if report_usage {
            eprintln!("usage: unavailable latency_ms=0 (dry-run)");
        }
        return Ok(());
    }

    let started = Instant::now();
    let result = client.generate(&prompt, settings.temperature).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    client.close();
    let generation = result.map_err(|err| err.to_string())?;

    match settings.output {
        OutputMode::Text => connection.emit(&generation.text)?,
        OutputMode::Json => connection.emit_json(&json!({
            "model": client.model(),
            "text": generation.text,
            "placeholder": generation.placeholder,
            "latency_ms": latency_ms,
            "usage": generation.usage.map(usage_json),
        }))?,
    }
    if report_usage {
        eprintln!("{}", usage_line(generation.usage, latency_ms));
    }
    Ok(())
}

fn read_prompt(arg: Option<String>) -> Result<String, String> {
    if let Some(prompt) = arg.filter(|prompt| !prompt.trim().is_empty()) {
        return Ok(prompt);
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(NO_PROMPT.to_string());
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|err| format!("Failed to read prompt from stdin: {err}"))?;

    let prompt = buffer.trim_end_matches(['\n', '\r']);
    if prompt.trim().is_empty() {
        return Err(NO_PROMPT.to_string());
    }
    Ok(prompt.to_string())
}

fn usage_json(usage: Usage) -> Value {
    json!({
        "prompt_tokens": usage.prompt_tokens,
        "completion_tokens": usage.completion_tokens,
        "total_duration_ns": usage.total_duration_ns,
    })
}

fn usage_line(usage: Option<Usage>, latency_ms: u64) -> String {
    let Some(usage) = usage else {
        return format!("usage: unavailable latency_ms={latency_ms}");
    };
    let count = |value: Option<u32>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
    format!(
        "usage: prompt_tokens={} completion_tokens={} latency_ms={latency_ms}",
        count(usage.prompt_tokens),
        count(usage.completion_tokens),
    )
}
