//! Prompt templates

/// Characters of document text sent with each summary prompt
pub const SUMMARY_INPUT_CHARS: usize = 2000;

/// One exchange in a website Q&A conversation
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    /// `user` or `model`
    pub role: String,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            text: text.into(),
        }
    }
}

/// First `max` characters of `text`, on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn page_summary(page_text: &str) -> String {
    format!(
        "Summarize the following page content into 3–5 concise bullet points:\n\n{}",
        truncate_chars(page_text, SUMMARY_INPUT_CHARS)
    )
}

pub fn document_summary(all_text: &str) -> String {
    format!(
        "Summarize the objective, methods, and key findings from the following text:\n\n{}",
        truncate_chars(all_text, SUMMARY_INPUT_CHARS)
    )
}

/// Grounded question: the model may only use `context`
pub fn website_answer(context: &str, history: &[ChatMessage], question: &str) -> String {
    let mut prompt = format!(
        "Based ONLY on the following text, answer the question. Do not use outside knowledge.\n\nCONTEXT:\n{}\n\n---\n\nChat History:\n",
        context
    );
    for message in history {
        prompt.push_str(&format!("{}: {}\n", message.role, message.text));
    }
    prompt.push_str(&format!("user: {}", question));
    prompt
}

pub fn code_fix(code: &str) -> String {
    format!(
        "\nAs an expert Python programmer, please analyze the following code or error message.\n\
         Provide a step-by-step explanation of the issue and the corrected code.\n\n\
         CODE/ERROR:\n```python\n{}\n```\n",
        code
    )
}

pub fn code_explain(code: &str) -> String {
    format!(
        "Explain this code in 4-5 simple lines, specify the programming language, and detect if it's AI-written or human-written.\n\nCODE:\n```\n{}\n```",
        code
    )
}
