//! Agent-facing tools built on [`GenerationClient`].
//!
//! Every tool turns its arguments into a prompt, runs one generation at a
//! fixed temperature, and answers with a status [`Envelope`]. A failed
//! generation is reported as `status: "error"`, never as text inside a
//! success envelope.

/// Prompt templates and report formatting.
pub mod prompts;
/// Function-calling declarations for the tool surface.
pub mod schema;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use crate::llm::{GenerationClient, GenerationError};

pub use schema::{ToolDefinition, tool_definitions};

/// One tool invocation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Ask { question: String, context: String },
    GenerateCode { description: String, language: String },
    Brainstorm { topic: String, num_ideas: u32 },
    Explain { concept: String, level: String },
    ResearchTopic { topic: String, focus: String },
    AnalyzeTrends { domain: String },
    AskQuestion { question: String },
}

impl ToolRequest {
    /// Name under which the tool is declared.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ask { .. } => "ask_gemma",
            Self::GenerateCode { .. } => "generate_code",
            Self::Brainstorm { .. } => "brainstorm_ideas",
            Self::Explain { .. } => "explain_concept",
            Self::ResearchTopic { .. } => "research_topic",
            Self::AnalyzeTrends { .. } => "analyze_trends",
            Self::AskQuestion { .. } => "ask_question",
        }
    }

    pub fn temperature(&self) -> f64 {
        match self {
            Self::GenerateCode { .. } => 0.5,
            Self::Explain { .. } | Self::AskQuestion { .. } => 0.6,
            Self::Ask { .. } | Self::ResearchTopic { .. } => 0.7,
            Self::Brainstorm { .. } | Self::AnalyzeTrends { .. } => 0.8,
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::Ask { question, context } => prompts::ask(question, context),
            Self::GenerateCode {
                description,
                language,
            } => prompts::generate_code(description, language),
            Self::Brainstorm { topic, num_ideas } => prompts::brainstorm(topic, *num_ideas),
            Self::Explain { concept, level } => prompts::explain_concept(concept, level),
            Self::ResearchTopic { topic, focus } => prompts::research_topic(topic, focus),
            Self::AnalyzeTrends { domain } => prompts::analyze_trends(domain),
            Self::AskQuestion { question } => prompts::ask_question(question),
        }
    }

    fn answer_field(&self) -> &'static str {
        match self {
            Self::Ask { .. } | Self::AskQuestion { .. } => "answer",
            Self::GenerateCode { .. } => "generated_code",
            Self::Brainstorm { .. } => "ideas",
            Self::Explain { .. } => "explanation",
            Self::ResearchTopic { .. } | Self::AnalyzeTrends { .. } => "analysis",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Ask { .. } | Self::AskQuestion { .. } => "Failed to query Gemma",
            Self::GenerateCode { .. } => "Failed to generate code",
            Self::Brainstorm { .. } => "Failed to brainstorm ideas",
            Self::Explain { .. } => "Failed to explain concept",
            Self::ResearchTopic { .. } => "Failed to research topic",
            Self::AnalyzeTrends { .. } => "Failed to analyze trends",
        }
    }

    /// Inputs echoed back in a success envelope.
    fn echo(&self) -> Map<String, Value> {
        let mut echo = Map::new();
        let mut put = |key: &str, value: Value| {
            echo.insert(key.to_string(), value);
        };
        match self {
            Self::Ask { question, context } => {
                put("question", json!(question));
                put("context_provided", json!(!context.is_empty()));
            }
            Self::GenerateCode {
                description,
                language,
            } => {
                put("description", json!(description));
                put("language", json!(language));
            }
            Self::Brainstorm { topic, num_ideas } => {
                put("topic", json!(topic));
                put("requested_ideas", json!(num_ideas));
            }
            Self::Explain { concept, level } => {
                put("concept", json!(concept));
                put("level", json!(level));
            }
            Self::ResearchTopic { topic, focus } => {
                put("topic", json!(topic));
                put("focus", json!(focus));
            }
            Self::AnalyzeTrends { domain } => put("domain", json!(domain)),
            Self::AskQuestion { question } => put("question", json!(question)),
        }
        echo
    }

    /// The primary input echoed back in an error envelope.
    fn error_echo(&self) -> (&'static str, &str) {
        match self {
            Self::Ask { question, .. } | Self::AskQuestion { question } => {
                ("question", question.as_str())
            }
            Self::GenerateCode { description, .. } => ("description", description.as_str()),
            Self::Brainstorm { topic, .. } | Self::ResearchTopic { topic, .. } => {
                ("topic", topic.as_str())
            }
            Self::Explain { concept, .. } => ("concept", concept.as_str()),
            Self::AnalyzeTrends { domain } => ("domain", domain.as_str()),
        }
    }

    /// Wraps model text the way each tool presents it.
    fn render(&self, text: &str) -> String {
        match self {
            Self::ResearchTopic { topic, focus } => prompts::research_report(topic, focus, text),
            Self::AnalyzeTrends { domain } => prompts::trends_report(domain, text),
            Self::AskQuestion { question } => prompts::answer_report(question, text),
            _ => text.to_string(),
        }
    }

    pub fn success(&self, text: &str) -> Envelope {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("success"));
        fields.extend(self.echo());
        fields.insert(self.answer_field().to_string(), json!(self.render(text)));
        Envelope {
            fields,
            answer_field: self.answer_field(),
        }
    }

    pub fn failure(&self, err: &GenerationError) -> Envelope {
        let (echo_key, echo_value) = self.error_echo();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("error"));
        fields.insert("error_kind".to_string(), json!(err.kind().as_str()));
        fields.insert(
            "error_message".to_string(),
            json!(format!("{}: {err}", self.failure_prefix())),
        );
        fields.insert(echo_key.to_string(), json!(echo_value));
        Envelope {
            fields,
            answer_field: self.answer_field(),
        }
    }
}

/// Status envelope returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope {
    fields: Map<String, Value>,
    #[serde(skip)]
    answer_field: &'static str,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status() == "success"
    }

    pub fn status(&self) -> &str {
        self.fields
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("error")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Tool output on success.
    pub fn answer(&self) -> Option<&str> {
        self.fields.get(self.answer_field).and_then(Value::as_str)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.fields.get("error_message").and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// The tool surface, sharing one generation client.
#[derive(Debug, Clone)]
pub struct Toolbox {
    client: Arc<GenerationClient>,
}

impl Toolbox {
    pub fn new(client: Arc<GenerationClient>) -> Self {
        Self { client }
    }

    #[instrument(skip(self, request), fields(tool = request.name()))]
    pub async fn invoke(&self, request: &ToolRequest) -> Envelope {
        info!("invoking tool");
        match self
            .client
            .generate(&request.prompt(), request.temperature())
            .await
        {
            Ok(generation) => request.success(&generation.text),
            Err(err) => request.failure(&err),
        }
    }

    pub async fn ask(&self, question: &str, context: &str) -> Envelope {
        self.invoke(&ToolRequest::Ask {
            question: question.to_string(),
            context: context.to_string(),
        })
        .await
    }

    pub async fn generate_code(&self, description: &str, language: &str) -> Envelope {
        self.invoke(&ToolRequest::GenerateCode {
            description: description.to_string(),
            language: language.to_string(),
        })
        .await
    }

    pub async fn brainstorm(&self, topic: &str, num_ideas: u32) -> Envelope {
        self.invoke(&ToolRequest::Brainstorm {
            topic: topic.to_string(),
            num_ideas,
        })
        .await
    }

    pub async fn explain(&self, concept: &str, level: &str) -> Envelope {
        self.invoke(&ToolRequest::Explain {
            concept: concept.to_string(),
            level: level.to_string(),
        })
        .await
    }

    pub async fn research_topic(&self, topic: &str, focus: &str) -> Envelope {
        self.invoke(&ToolRequest::ResearchTopic {
            topic: topic.to_string(),
            focus: focus.to_string(),
        })
        .await
    }

    pub async fn analyze_trends(&self, domain: &str) -> Envelope {
        self.invoke(&ToolRequest::AnalyzeTrends {
            domain: domain.to_string(),
        })
        .await
    }

    pub async fn ask_question(&self, question: &str) -> Envelope {
        self.invoke(&ToolRequest::AskQuestion {
            question: question.to_string(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn temperatures_follow_tool_character() {
        let code = ToolRequest::GenerateCode {
            description: "d".to_string(),
            language: "rust".to_string(),
        };
        let ideas = ToolRequest::Brainstorm {
            topic: "t".to_string(),
            num_ideas: 5,
        };
        assert_eq!(code.temperature(), 0.5);
        assert_eq!(ideas.temperature(), 0.8);
    }

    #[test]
    fn ask_success_echoes_inputs() {
        let request = ToolRequest::Ask {
            question: "What is a monad?".to_string(),
            context: String::new(),
        };
        let envelope = request.success("A burrito.");
        assert!(envelope.is_success());
        assert_eq!(envelope.answer(), Some("A burrito."));
        assert_eq!(
            envelope.to_value(),
            json!({
                "status": "success",
                "question": "What is a monad?",
                "context_provided": false,
                "answer": "A burrito.",
            })
        );
    }

    #[test]
    fn failure_carries_kind_message_and_primary_input() {
        let request = ToolRequest::Brainstorm {
            topic: "robots".to_string(),
            num_ideas: 3,
        };
        let err = GenerationError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        let envelope = request.failure(&err);
        assert!(!envelope.is_success());
        assert_eq!(envelope.answer(), None);
        assert_eq!(
            envelope.to_value(),
            json!({
                "status": "error",
                "error_kind": "status",
                "error_message": "Failed to brainstorm ideas: LLM API error 500 Internal Server Error: boom",
                "topic": "robots",
            })
        );
    }

    #[test]
    fn report_tools_wrap_text_in_markdown() {
        let request = ToolRequest::AnalyzeTrends {
            domain: "energy".to_string(),
        };
        let envelope = request.success("Solar keeps growing.");
        let analysis = envelope.answer().expect("analysis present");
        assert!(analysis.starts_with("# Trend Analysis: energy\n\nSolar keeps growing."));
        assert_eq!(envelope.get("domain"), Some(&json!("energy")));
    }

    #[test]
    fn success_echoes_every_input_of_the_request() {
        let research = ToolRequest::ResearchTopic {
            topic: "CRDTs".to_string(),
            focus: "technical".to_string(),
        };
        let value = research.success("body").to_value();
        assert_eq!(value["topic"], "CRDTs");
        assert_eq!(value["focus"], "technical");

        let ideas = ToolRequest::Brainstorm {
            topic: "robots".to_string(),
            num_ideas: 4,
        };
        let value = ideas.success("1. a").to_value();
        assert_eq!(value["requested_ideas"], 4);
        assert_eq!(
            value.as_object().map(|fields| fields.len()),
            Some(4),
            "status, topic, requested_ideas, ideas"
        );
    }

    #[test]
    fn envelope_serializes_as_plain_object() {
        let request = ToolRequest::Explain {
            concept: "lifetimes".to_string(),
            level: "beginner".to_string(),
        };
        let text = serde_json::to_string(&request.success("x")).expect("serializes");
        assert!(text.starts_with('{'));
        assert!(!text.contains("answer_field"));
    }
}
