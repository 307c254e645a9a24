use std::sync::Arc;

use clap::Args;
use serde_json::{Value, json};

use crate::commands::ConnectionArgs;
use crate::commands::shared::{build_client, print_json};
use crate::config::OutputMode;
use crate::tools::{ToolDefinition, ToolRequest, Toolbox, tool_definitions};

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(long, default_value = "", help = "Optional context for the question")]
    pub context: String,
    #[arg(value_name = "QUESTION")]
    pub question: String,
}

#[derive(Debug, Args, Clone)]
pub struct CodeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(long, default_value = "python", help = "Programming language")]
    pub language: String,
    #[arg(value_name = "DESCRIPTION")]
    pub description: String,
}

#[derive(Debug, Args, Clone)]
pub struct BrainstormArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(long = "ideas", default_value_t = 5, help = "Number of ideas to generate")]
    pub num_ideas: u32,
    #[arg(value_name = "TOPIC")]
    pub topic: String,
}

#[derive(Debug, Args, Clone)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(
        long,
        default_value = "intermediate",
        help = "Complexity level: beginner, intermediate, or advanced"
    )]
    pub level: String,
    #[arg(value_name = "CONCEPT")]
    pub concept: String,
}

#[derive(Debug, Args, Clone)]
pub struct ResearchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(
        long,
        default_value = "general",
        help = "Focus area: general, technical, business, social"
    )]
    pub focus: String,
    #[arg(value_name = "TOPIC")]
    pub topic: String,
}

#[derive(Debug, Args, Clone)]
pub struct TrendsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[arg(value_name = "DOMAIN")]
    pub domain: String,
}

impl From<AskArgs> for (ConnectionArgs, ToolRequest) {
    fn from(args: AskArgs) -> Self {
        let request = ToolRequest::Ask {
            question: args.question,
            context: args.context,
        };
        (args.connection, request)
    }
}

impl From<CodeArgs> for (ConnectionArgs, ToolRequest) {
    fn from(args: CodeArgs) -> Self {
        let request = ToolRequest::GenerateCode {
            description: args.description,
            language: args.language,
        };
        (args.connection, request)
    }
}

impl From<BrainstormArgs> for (ConnectionArgs, ToolRequest) {
    fn from(args: BrainstormArgs) -> Self {
        let request = ToolRequest::Brainstorm {
            topic: args.topic,
            num_ideas: args.num_ideas,
        };
        (args.connection, request)
    }
}

impl From<ExplainArgs> for (ConnectionArgs, ToolRequest) {
    fn from(args: ExplainArgs) -> Self {
        let request = ToolRequest::Explain {
            concept: args.concept,
            level: args.level,
        };
        (args.connection, request)
    }
}

impl From<ResearchArgs> for (ConnectionArgs, ToolRequest) {
    fn from(args: ResearchArgs) -> Self {
        let request = ToolRequest::ResearchTopic {
            topic: args.topic,
            focus: args.focus,
        };
        (args.connection, request)
    }
}

impl From<TrendsArgs> for (ConnectionArgs, ToolRequest) {
    fn from(args: TrendsArgs) -> Self {
        let request = ToolRequest::AnalyzeTrends {
            domain: args.domain,
        };
        (args.connection, request)
    }
}

/// Runs one tool and prints its envelope.
///
/// Text output prints only the tool's answer; a failed envelope becomes the
/// command's error. JSON output prints the whole envelope either way.
pub async fn run(connection: ConnectionArgs, request: ToolRequest) -> Result<(), String> {
    let settings = connection.settings(None)?;
    let client = Arc::new(build_client(&settings)?);

    if connection.dry_run {
        return connection.emit_json(&json!({
            "dry_run": true,
            "tool": request.name(),
            "url": client.generate_url(),
            "auth": settings.auth.as_str(),
            "output": settings.output.as_str(),
            "request": client.request_body(&request.prompt(), request.temperature()),
        }));
    }

    let toolbox = Toolbox::new(Arc::clone(&client));
    let envelope = toolbox.invoke(&request).await;
    client.close();

    if settings.output == OutputMode::Json {
        connection.emit_json(&envelope.to_value())?;
    }
    if !envelope.is_success() {
        let message = envelope.error_message().unwrap_or("Tool failed");
        return Err(message.to_string());
    }
    if settings.output == OutputMode::Text {
        connection.emit(envelope.answer().unwrap_or_default())?;
    }
    Ok(())
}

/// Prints every tool declaration as a JSON array.
pub fn list() -> Result<(), String> {
    let definitions: Vec<Value> = tool_definitions()
        .iter()
        .map(ToolDefinition::to_json)
        .collect();
    print_json(&Value::Array(definitions))
}
