//! PDF summarizer
//!
//! Downloads a PDF, splits it into pages and asks the language model for a
//! bullet summary of each page plus one overall summary.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::ToolError;
use crate::llm::{generate_with_retry, prompts, LanguageModel, LlmError, RetryPolicy};

pub const DEFAULT_PAGES: usize = 5;
pub const MAX_PAGES: usize = 20;

/// Largest PDF the summarizer will download
pub const MAX_DOWNLOAD_BYTES: usize = 50 * 1024 * 1024;

const SUMMARY_FAILED: &str = "Failed to generate summary.";
const RETRIES_EXHAUSTED: &str = "Failed after multiple retries.";

/// Turns a local document into per-page text
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load_pages(&self, path: &Path) -> Result<Vec<String>, ToolError>;
}

/// Runs poppler's `pdftotext`, which separates pages with form feeds
pub struct PdfToTextLoader {
    program: String,
}

impl Default for PdfToTextLoader {
    fn default() -> Self {
        Self {
            program: "pdftotext".to_string(),
        }
    }
}

#[async_trait]
impl DocumentLoader for PdfToTextLoader {
    async fn load_pages(&self, path: &Path) -> Result<Vec<String>, ToolError> {
        let output = Command::new(&self.program)
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| ToolError::Data {
                what: "the PDF".to_string(),
                reason: format!("failed to run {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(ToolError::Data {
                what: "the PDF".to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Split form-feed separated text; the trailing feed does not start a page
pub fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    if pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    /// 1-based page number
    pub page: usize,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub pages: Vec<PageSummary>,
    pub overall: Option<String>,
    /// Plain-text export of the whole report
    pub text: String,
}

impl SummaryReport {
    fn new(pages: Vec<PageSummary>, overall: Option<String>) -> Self {
        let mut lines: Vec<String> = pages
            .iter()
            .map(|p| format!("Page {}:\n{}\n", p.page, p.summary))
            .collect();
        if let Some(overall) = &overall {
            lines.push(format!("Overall Summary:\n{}", overall));
        }

        Self {
            text: lines.join("\n"),
            pages,
            overall,
        }
    }
}

pub struct Summarizer {
    http: reqwest::Client,
    loader: Arc<dyn DocumentLoader>,
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
    max_download: usize,
}

impl Summarizer {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            loader,
            model,
            retry: RetryPolicy::default(),
            max_download: MAX_DOWNLOAD_BYTES,
        })
    }

    pub fn with_download_limit(mut self, bytes: usize) -> Self {
        self.max_download = bytes;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Download the PDF at `url` and summarize its first `pages` pages
    pub async fn summarize_url(
        &self,
        url: &str,
        pages: Option<usize>,
    ) -> Result<SummaryReport, ToolError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ToolError::validation("Please enter a PDF URL."));
        }
        let max_pages = pages.unwrap_or(DEFAULT_PAGES);
        if !(1..=MAX_PAGES).contains(&max_pages) {
            return Err(ToolError::validation(format!(
                "Pages to analyze must be between 1 and {}.",
                MAX_PAGES
            )));
        }

        let bytes = self.download(url).await?;
        info!("Downloaded {} bytes from {}", bytes.len(), url);

        // Removed on drop, including when loading fails
        let staged = tempfile::Builder::new()
            .prefix("hub-doc-")
            .suffix(".pdf")
            .tempfile()?;
        tokio::fs::write(staged.path(), &bytes).await?;

        let pages = self.loader.load_pages(staged.path()).await?;
        drop(staged);

        Ok(self.summarize_pages(pages, max_pages).await)
    }

    /// Fetch `url` into memory, refusing bodies over the download limit
    async fn download(&self, url: &str) -> Result<Vec<u8>, ToolError> {
        let mut response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ToolError::Upstream(format!(
                "Download returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let too_large = || {
            warn!("Refusing PDF from {} larger than {} bytes", url, self.max_download);
            ToolError::validation(format!(
                "The PDF is larger than the {} byte limit.",
                self.max_download
            ))
        };
        if response
            .content_length()
            .is_some_and(|length| length > self.max_download as u64)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong; count what actually arrives
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_download {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// Summarize up to `max_pages` pages; there is no overall summary without pages
    pub async fn summarize_pages(&self, pages: Vec<String>, max_pages: usize) -> SummaryReport {
        let mut summaries = Vec::new();
        let mut all_text = String::new();

        for (i, page_text) in pages.into_iter().take(max_pages).enumerate() {
            all_text.push_str(&page_text);
            all_text.push_str("\n\n");

            let summary = self.safe_generate(&prompts::page_summary(&page_text)).await;
            summaries.push(PageSummary {
                page: i + 1,
                summary,
            });
        }

        let overall = if summaries.is_empty() {
            None
        } else {
            Some(
                self.safe_generate(&prompts::document_summary(&all_text))
                    .await,
            )
        };

        debug!("Summarized {} pages", summaries.len());
        SummaryReport::new(summaries, overall)
    }

    /// Generate, replacing failure with a fixed message
    async fn safe_generate(&self, prompt: &str) -> String {
        match generate_with_retry(self.model.as_ref(), prompt, &self.retry).await {
            Ok(text) => text,
            Err(LlmError::RetriesExhausted { .. }) => RETRIES_EXHAUSTED.to_string(),
            Err(e) => {
                warn!("Error generating summary: {}", e);
                SUMMARY_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::test_support::serve_once;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    /// Treats the file as form-feed separated text and remembers its path
    #[derive(Default)]
    struct TextLoader {
        seen: Mutex<Option<PathBuf>>,
    }

    #[async_trait]
    impl DocumentLoader for TextLoader {
        async fn load_pages(&self, path: &Path) -> Result<Vec<String>, ToolError> {
            *self.seen.lock() = Some(path.to_path_buf());
            let text = tokio::fs::read_to_string(path).await?;
            Ok(split_pages(&text))
        }
    }

    fn summarizer(model: Arc<ScriptedModel>, loader: Arc<TextLoader>) -> Summarizer {
        Summarizer::new(loader, model)
            .unwrap()
            .with_retry(RetryPolicy::default().with_backoff(Duration::from_millis(1)))
    }

    #[test]
    fn test_split_pages() {
        assert_eq!(split_pages("one\x0ctwo\x0c"), vec!["one", "two"]);
        assert_eq!(split_pages("single"), vec!["single"]);
        assert!(split_pages("").is_empty());
    }

    #[tokio::test]
    async fn test_summarize_pages_builds_report() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("- p1".into()),
            Ok("- p2".into()),
            Ok("overall".into()),
        ]));
        let s = summarizer(model.clone(), Arc::default());

        let report = s
            .summarize_pages(vec!["first".into(), "second".into(), "third".into()], 2)
            .await;

        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.overall.as_deref(), Some("overall"));
        assert_eq!(
            report.text,
            "Page 1:\n- p1\n\nPage 2:\n- p2\n\nOverall Summary:\noverall"
        );

        let prompts = model.prompts.lock().clone();
        assert!(prompts[0].ends_with("\n\nfirst"));
        assert!(prompts[2].contains("first\n\nsecond\n\n"));
        assert!(!prompts[2].contains("third"));
    }

    #[tokio::test]
    async fn test_failures_become_fixed_messages() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(LlmError::Fatal("quota".into())),
            Err(LlmError::Transient("stream has ended".into())),
            Err(LlmError::Transient("stream has ended".into())),
            Err(LlmError::Transient("stream has ended".into())),
        ]));
        let s = summarizer(model, Arc::default());

        let report = s.summarize_pages(vec!["only".into()], 5).await;
        assert_eq!(report.pages[0].summary, "Failed to generate summary.");
        assert_eq!(report.overall.as_deref(), Some("Failed after multiple retries."));
    }

    #[tokio::test]
    async fn test_no_pages_no_overall_summary() {
        let model = Arc::new(ScriptedModel::default());
        let report = summarizer(model.clone(), Arc::default())
            .summarize_pages(Vec::new(), 5)
            .await;
        assert!(report.overall.is_none());
        assert!(report.text.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_input_validation() {
        let s = summarizer(Arc::default(), Arc::default());
        assert!(matches!(
            s.summarize_url("  ", None).await,
            Err(ToolError::Validation(_))
        ));
        assert!(matches!(
            s.summarize_url("http://example.invalid/a.pdf", Some(21)).await,
            Err(ToolError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_summarize_url_downloads_and_cleans_up() {
        let (base, _) = serve_once("200 OK", "application/pdf", "page one\x0cpage two\x0c").await;
        let loader = Arc::new(TextLoader::default());
        let model = Arc::new(ScriptedModel::default());
        let s = summarizer(model.clone(), loader.clone());

        let report = s
            .summarize_url(&format!("{}/paper.pdf", base), Some(5))
            .await
            .unwrap();

        assert_eq!(report.pages.len(), 2);
        assert_eq!(model.calls(), 3);
        let staged = loader.seen.lock().clone().unwrap();
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_download_error_is_upstream() {
        let (base, _) = serve_once("404 Not Found", "text/plain", "missing").await;
        let s = summarizer(Arc::default(), Arc::default());

        let err = s.summarize_url(&base, None).await.unwrap_err();
        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_oversized_download_is_refused() {
        let (base, _) = serve_once("200 OK", "application/pdf", vec![b'x'; 4096]).await;
        let loader = Arc::new(TextLoader::default());
        let model = Arc::new(ScriptedModel::default());
        let s = summarizer(model.clone(), loader.clone()).with_download_limit(1024);

        let err = s.summarize_url(&base, None).await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert!(err.to_string().contains("1024 byte limit"));
        assert!(loader.seen.lock().is_none());
        assert_eq!(model.calls(), 0);
    }
}
