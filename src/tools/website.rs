//! Website Q&A
//!
//! Scrapes the readable text of a page and answers questions grounded only
//! in that text, keeping a per-session chat history.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, info};

use super::error::ToolError;
use crate::llm::{generate_with_retry, prompts, ChatMessage, LanguageModel, RetryPolicy};

pub const MAX_CONTEXT_CHARS: usize = 15000;
pub const NO_TEXT_FOUND: &str = "No text content found.";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0";

/// Elements whose text is collected, matched in document order
static TEXT_ELEMENTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, p, li, span").expect("text element selector"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// All text under `element`, script and style bodies excluded, with
/// whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|parent| matches!(parent.name(), "script" | "style"));
        if !hidden {
            text.push(' ');
            text.push_str(fragment);
        }
    }
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Visible text of heading, paragraph, list item and span elements, in
/// document order, one element per line, capped at [`MAX_CONTEXT_CHARS`].
///
/// A matched element nested in another is listed again on its own line.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let joined = document
        .select(&TEXT_ELEMENTS)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.is_empty() {
        NO_TEXT_FOUND.to_string()
    } else {
        prompts::truncate_chars(&joined, MAX_CONTEXT_CHARS).to_string()
    }
}

/// Loaded page text plus the conversation about it
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebsiteConversation {
    pub context: Option<String>,
    pub history: Vec<ChatMessage>,
}

impl WebsiteConversation {
    /// Replace the context; a new page starts a new conversation
    pub fn load(&mut self, context: String) {
        self.context = Some(context);
        self.history.clear();
    }
}

pub struct WebsiteQa {
    http: reqwest::Client,
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl WebsiteQa {
    pub fn new(model: Arc<dyn LanguageModel>) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            model,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GET `url` and return its extracted text
    pub async fn scrape(&self, url: &str) -> Result<String, ToolError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ToolError::validation("Please enter a website URL."));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::Upstream(format!("Error scraping website: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Upstream(format!(
                "Error scraping website: HTTP {}",
                status.as_u16()
            )));
        }
        let html = response
            .text()
            .await
            .map_err(|e| ToolError::Upstream(format!("Error scraping website: {}", e)))?;

        let text = extract_text(&html);
        info!("Loaded {} chars of text from {}", text.chars().count(), url);
        Ok(text)
    }

    /// Scrape `url` into `conversation`; on failure the conversation is untouched
    pub async fn load(
        &self,
        conversation: &mut WebsiteConversation,
        url: &str,
    ) -> Result<(), ToolError> {
        let context = self.scrape(url).await?;
        conversation.load(context);
        Ok(())
    }

    /// Answer from the loaded context. History grows only when an answer
    /// was produced.
    pub async fn ask(
        &self,
        conversation: &mut WebsiteConversation,
        question: &str,
    ) -> Result<String, ToolError> {
        let question = question.trim();
        let context = conversation
            .context
            .as_deref()
            .ok_or_else(|| ToolError::validation("Load a website before asking questions."))?;
        if question.is_empty() {
            return Err(ToolError::validation("Please enter a question."));
        }

        let prompt = prompts::website_answer(context, &conversation.history, question);
        debug!("Asking about loaded website ({} history messages)", conversation.history.len());

        let reply = generate_with_retry(self.model.as_ref(), &prompt, &self.retry).await?;

        conversation.history.push(ChatMessage::user(question));
        conversation.history.push(ChatMessage::model(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::llm::LlmError;
    use crate::test_support::serve_once;

    const PAGE: &str = r#"<html><head><title>t</title>
        <style>p { color: red }</style>
        <script>var p = "<p>hidden</p>";</script></head>
        <body>
          <h1>Python   Tutorial</h1>
          <div>ignored div text</div>
          <p>Python is a <b>popular</b> language &amp; easy.</p>
          <ul><li>Fast</li><li>   </li><li>Readable&#33;</li></ul>
        </body></html>"#;

    fn qa(model: Arc<ScriptedModel>) -> WebsiteQa {
        WebsiteQa::new(model)
            .unwrap()
            .with_retry(RetryPolicy::new(1))
    }

    #[test]
    fn test_extract_text_selected_elements_in_order() {
        assert_eq!(
            extract_text(PAGE),
            "Python Tutorial\nPython is a popular language & easy.\nFast\nReadable!"
        );
    }

    #[test]
    fn test_extract_text_empty_and_truncated() {
        assert_eq!(extract_text("<div>nothing useful</div>"), NO_TEXT_FOUND);

        let long = format!("<p>{}</p>", "a".repeat(MAX_CONTEXT_CHARS + 500));
        assert_eq!(extract_text(&long).chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_extract_text_nested_elements() {
        assert_eq!(
            extract_text("<ul><li>a<ul><li>b</li></ul>c</li></ul>"),
            "a b c\nb"
        );
        assert_eq!(
            extract_text("<span>x<script>var y = 1;</script><style>p{}</style></span>"),
            "x"
        );
        assert_eq!(extract_text("<p>&lt;b&gt; &#x41;&#66;</p>"), "<b> AB");
    }

    #[tokio::test]
    async fn test_load_sets_context_and_clears_history() {
        let (base, request) = serve_once("200 OK", "text/html", PAGE).await;
        let mut conversation = WebsiteConversation {
            context: Some("old".into()),
            history: vec![ChatMessage::user("old question")],
        };

        qa(Arc::default()).load(&mut conversation, &base).await.unwrap();

        assert!(conversation.context.unwrap().starts_with("Python Tutorial"));
        assert!(conversation.history.is_empty());
        let request = request.await.unwrap();
        assert!(request.head.to_lowercase().contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_conversation() {
        let (base, _) = serve_once("500 Internal Server Error", "text/html", "").await;
        let mut conversation = WebsiteConversation::default();

        let err = qa(Arc::default()).load(&mut conversation, &base).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
        assert!(conversation.context.is_none());
    }

    #[tokio::test]
    async fn test_ask_appends_history_on_success_only() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("It is a language.".into()),
            Err(LlmError::Fatal("quota".into())),
        ]));
        let qa = qa(model.clone());
        let mut conversation = WebsiteConversation::default();
        conversation.load("Python is a language.".into());

        let answer = qa.ask(&mut conversation, "What is Python?").await.unwrap();
        assert_eq!(answer, "It is a language.");
        assert_eq!(
            conversation.history,
            vec![
                ChatMessage::user("What is Python?"),
                ChatMessage::model("It is a language.")
            ]
        );

        assert!(qa.ask(&mut conversation, "Who made it?").await.is_err());
        assert_eq!(conversation.history.len(), 2);

        // Second prompt carried the first exchange
        let prompts = model.prompts.lock().clone();
        assert!(prompts[1].contains("user: What is Python?\nmodel: It is a language.\nuser: Who made it?"));
    }

    #[tokio::test]
    async fn test_ask_requires_context_and_question() {
        let model = Arc::new(ScriptedModel::default());
        let qa = qa(model.clone());
        let mut conversation = WebsiteConversation::default();

        assert!(matches!(
            qa.ask(&mut conversation, "anything").await,
            Err(ToolError::Validation(_))
        ));
        conversation.load("ctx".into());
        assert!(matches!(
            qa.ask(&mut conversation, "   ").await,
            Err(ToolError::Validation(_))
        ));
        assert_eq!(model.calls(), 0);
    }
}
