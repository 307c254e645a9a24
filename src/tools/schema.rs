use serde_json::{Map, Value, json};

/// JSON schema primitive types supported for tool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolParamType {
    Integer,
    String,
}

impl ToolParamType {
    fn as_str(self) -> &'static str {
        match self {
            ToolParamType::Integer => "integer",
            ToolParamType::String => "string",
        }
    }
}

/// One function parameter definition.
#[derive(Debug, Clone)]
pub struct ToolParam {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolParamType,
    /// Value used when the caller omits the parameter. `None` means required.
    pub default: Option<Value>,
}

impl ToolParam {
    pub fn required(name: &'static str, kind: ToolParamType, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind,
            default: None,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: ToolParamType,
        description: &'static str,
        default: Value,
    ) -> Self {
        Self {
            name,
            description,
            kind,
            default: Some(default),
        }
    }
}

/// Callable tool declaration in function-calling format.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ToolParam>,
}

impl ToolDefinition {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut param_def = Map::new();
            param_def.insert("type".to_string(), json!(param.kind.as_str()));
            param_def.insert("description".to_string(), json!(param.description));
            match &param.default {
                Some(default) => {
                    param_def.insert("default".to_string(), default.clone());
                }
                None => required.push(json!(param.name)),
            }
            properties.insert(param.name.to_string(), Value::Object(param_def));
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema(),
            }
        })
    }
}

/// Declarations for every tool [`super::Toolbox`] implements.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    use ToolParamType::{Integer, String as Text};

    vec![
        ToolDefinition::new("ask_gemma", "Ask a question to the deployed Gemma model.")
            .with_param(ToolParam::required("question", Text, "The question to ask"))
            .with_param(ToolParam::optional(
                "context",
                Text,
                "Optional context to provide with the question",
                json!(""),
            )),
        ToolDefinition::new(
            "generate_code",
            "Generate code based on a description using Gemma.",
        )
        .with_param(ToolParam::required(
            "description",
            Text,
            "Description of what the code should do",
        ))
        .with_param(ToolParam::optional(
            "language",
            Text,
            "Programming language",
            json!("python"),
        )),
        ToolDefinition::new(
            "brainstorm_ideas",
            "Brainstorm creative ideas for a given topic using Gemma.",
        )
        .with_param(ToolParam::required(
            "topic",
            Text,
            "The topic to brainstorm ideas for",
        ))
        .with_param(ToolParam::optional(
            "num_ideas",
            Integer,
            "Number of ideas to generate",
            json!(5),
        )),
        ToolDefinition::new(
            "explain_concept",
            "Explain a concept at different levels of complexity.",
        )
        .with_param(ToolParam::required("concept", Text, "The concept to explain"))
        .with_param(ToolParam::optional(
            "level",
            Text,
            "Complexity level: beginner, intermediate, or advanced",
            json!("intermediate"),
        )),
        ToolDefinition::new(
            "research_topic",
            "Research any topic and return a structured markdown analysis.",
        )
        .with_param(ToolParam::required(
            "topic",
            Text,
            "The research topic to investigate",
        ))
        .with_param(ToolParam::optional(
            "focus",
            Text,
            "Focus area: general, technical, business, social",
            json!("general"),
        )),
        ToolDefinition::new(
            "analyze_trends",
            "Analyze trends in a domain and return a markdown report.",
        )
        .with_param(ToolParam::required(
            "domain",
            Text,
            "Domain to analyze: technology, business, science",
        )),
        ToolDefinition::new("ask_question", "Ask any question and get a formatted answer.")
            .with_param(ToolParam::required("question", Text, "Your question")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_params_carry_defaults_and_are_not_required() {
        let definitions = tool_definitions();
        let brainstorm = definitions
            .iter()
            .find(|definition| definition.name == "brainstorm_ideas")
            .expect("brainstorm declared");
        let json = brainstorm.to_json();

        assert_eq!(json["type"], "function");
        let parameters = &json["function"]["parameters"];
        assert_eq!(parameters["required"], json!(["topic"]));
        assert_eq!(parameters["properties"]["num_ideas"]["type"], "integer");
        assert_eq!(parameters["properties"]["num_ideas"]["default"], 5);
    }

    #[test]
    fn every_tool_has_a_unique_name() {
        let mut names: Vec<_> = tool_definitions().iter().map(|d| d.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 7);
    }
}
