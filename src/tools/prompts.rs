//! Prompt templates and report formatting for the tool wrappers.

/// Detail descriptions for [`explain_concept`], keyed by level.
const LEVELS: [(&str, &str); 3] = [
    (
        "beginner",
        "as if explaining to someone new to the field, using simple language and analogies",
    ),
    (
        "intermediate",
        "assuming some background knowledge, with moderate technical detail",
    ),
    ("advanced", "with comprehensive technical depth and nuance"),
];

pub fn ask(question: &str, context: &str) -> String {
    if context.is_empty() {
        format!("Question: {question}\n\nPlease provide a helpful and informative answer.")
    } else {
        format!(
            "Context: {context}\n\nQuestion: {question}\n\nPlease provide a helpful and informative answer."
        )
    }
}

pub fn generate_code(description: &str, language: &str) -> String {
    format!(
        "Please generate {language} code based on this description:\n\n\
         {description}\n\n\
         Please provide:\n\
         1. Clean, well-commented code\n\
         2. A brief explanation of how it works\n\
         3. Any important notes or considerations\n\n\
         Format your response with the code in a code block and explanation afterwards."
    )
}

pub fn brainstorm(topic: &str, num_ideas: u32) -> String {
    format!(
        "Please brainstorm {num_ideas} creative and practical ideas for: {topic}\n\n\
         For each idea, provide:\n\
         1. A clear title\n\
         2. A brief description\n\
         3. Why it would be useful or interesting\n\n\
         Format your response as a numbered list with clear structure."
    )
}

/// Level description for `level`; unknown levels read as intermediate.
pub fn level_description(level: &str) -> &'static str {
    LEVELS
        .iter()
        .find(|(name, _)| *name == level)
        .or_else(|| LEVELS.iter().find(|(name, _)| *name == "intermediate"))
        .map(|(_, description)| *description)
        .unwrap_or_default()
}

pub fn explain_concept(concept: &str, level: &str) -> String {
    let detail = level_description(level);
    format!(
        "Please explain the concept of \"{concept}\" {detail}.\n\n\
         Structure your explanation with:\n\
         1. A clear definition\n\
         2. Key characteristics or components\n\
         3. Real-world examples or applications\n\
         4. Why it's important or relevant\n\n\
         Keep the explanation engaging and informative."
    )
}

pub fn research_topic(topic: &str, focus: &str) -> String {
    format!(
        "You are a knowledgeable research assistant. Provide a comprehensive analysis of the following topic:\n\n\
         Topic: {topic}\n\
         Focus: {focus}\n\n\
         Please structure your response with:\n\
         1. Overview and key concepts\n\
         2. Current state and developments\n\
         3. Key challenges and opportunities\n\
         4. Future outlook and trends\n\n\
         Keep your response informative and well-organized (under 400 words)."
    )
}

pub fn analyze_trends(domain: &str) -> String {
    format!(
        "You are a trend analyst. Provide a comprehensive trend analysis for the {domain} domain.\n\n\
         Please structure your analysis with:\n\
         1. Top 3 current trends\n\
         2. Emerging patterns and innovations\n\
         3. Market impacts and opportunities\n\
         4. Predictions for the next 2-3 years\n\n\
         Keep your response focused and actionable (under 350 words)."
    )
}

pub fn ask_question(question: &str) -> String {
    format!(
        "You are a helpful AI assistant. Please answer the following question clearly and informatively:\n\n\
         Question: {question}\n\n\
         Please provide a helpful, accurate, and well-structured response."
    )
}

pub fn research_report(topic: &str, focus: &str, body: &str) -> String {
    format!(
        "# Research Analysis: {topic}\n\n**Focus Area:** {focus}\n\n{body}\n\n---\n*Research powered by Gemma 3 on Cloud Run*"
    )
}

pub fn trends_report(domain: &str, body: &str) -> String {
    format!(
        "# Trend Analysis: {domain}\n\n{body}\n\n---\n*Analysis powered by Gemma 3 on Cloud Run*"
    )
}

pub fn answer_report(question: &str, body: &str) -> String {
    format!(
        "# AI Assistant Response\n\n**Question:** {question}\n\n{body}\n\n---\n*Powered by Gemma 3 on Cloud Run*"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_mentions_context_only_when_given() {
        assert_eq!(
            ask("What is Rust?", ""),
            "Question: What is Rust?\n\nPlease provide a helpful and informative answer."
        );
        assert!(ask("Why?", "Ownership").starts_with("Context: Ownership\n\nQuestion: Why?"));
    }

    #[test]
    fn unknown_level_reads_as_intermediate() {
        assert_eq!(level_description("expert"), level_description("intermediate"));
        assert!(level_description("beginner").contains("analogies"));
        assert!(explain_concept("borrowing", "advanced").contains("\"borrowing\" with comprehensive"));
    }

    #[test]
    fn templates_interpolate_arguments() {
        assert!(generate_code("parse CSV", "rust").starts_with("Please generate rust code"));
        assert!(brainstorm("hackathon demos", 3).starts_with("Please brainstorm 3 creative"));
        assert!(analyze_trends("biotech").contains("for the biotech domain."));
        assert!(research_topic("CRDTs", "technical").contains("Topic: CRDTs\nFocus: technical"));
    }

    #[test]
    fn reports_wrap_model_text() {
        let report = research_report("CRDTs", "technical", "BODY");
        assert!(report.starts_with("# Research Analysis: CRDTs\n\n**Focus Area:** technical"));
        assert!(report.ends_with("*Research powered by Gemma 3 on Cloud Run*"));
        assert!(answer_report("Q?", "A.").contains("**Question:** Q?\n\nA."));
    }
}
