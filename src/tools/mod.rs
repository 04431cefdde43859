//! Single-page tools of the dashboard
//!
//! Each tool validates its input, calls its upstream service (with retries
//! only for the language model) and returns a value the web layer can
//! serialize directly.

pub mod blog;
mod code_assist;
mod error;
pub mod ledger;
mod mail;
mod marks;
mod messaging;
mod report;
mod search;
mod summarizer;
mod tweets;
mod website;

pub use code_assist::CodeAssistant;
pub use error::ToolError;
pub use ledger::{LedgerError, LedgerStore, Transaction, TransactionKind, User};
pub use mail::Mailer;
pub use marks::{MarksModel, MarksPredictor, Prediction, MARKS_FILE, MAX_HOURS};
pub use messaging::TwilioClient;
pub use report::render_pdf;
pub use search::{
    web_search, SearchEngine, SearchOutcome, SerpApiClient, DEFAULT_RESULTS, MAX_RESULTS,
};
pub use summarizer::{
    split_pages, DocumentLoader, PageSummary, PdfToTextLoader, Summarizer, SummaryReport,
    DEFAULT_PAGES, MAX_DOWNLOAD_BYTES, MAX_PAGES,
};
pub use tweets::{PostedTweet, TweetBatch, TweetPoster, MAX_TWEETS, MAX_TWEET_CHARS};
pub use website::{extract_text, WebsiteConversation, WebsiteQa};
