//! Route table for the dashboard API

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::error::ApiError;
use super::http::{Request, Response};
use super::session::{BrowserSession, SharedSession};
use super::state::AppState;
use crate::remote::{DockerOperation, DockerRequest, RemoteOperation, RemoteSession};
use crate::tools::{blog, render_pdf, web_search, LedgerError, LedgerStore};

const INDEX_HTML: &str = include_str!("assets/index.html");

#[derive(Serialize)]
struct ToolInfo {
    id: &'static str,
    title: &'static str,
    description: &'static str,
}

const TOOLS: [ToolInfo; 10] = [
    ToolInfo {
        id: "linux",
        title: "Linux File Manager",
        description: "Browse, create, edit and remove files on a remote host over SSH.",
    },
    ToolInfo {
        id: "docker",
        title: "Docker Manager",
        description: "List, pull, launch, start, stop and remove containers on a remote host.",
    },
    ToolInfo {
        id: "summarizer",
        title: "PDF Summarizer",
        description: "Summarize the first pages of a PDF and download the report.",
    },
    ToolInfo {
        id: "website",
        title: "Website Q&A",
        description: "Load a web page and ask questions answered only from its text.",
    },
    ToolInfo {
        id: "code",
        title: "Code Fixer & Explainer",
        description: "Get a step-by-step fix or a short explanation of a code snippet.",
    },
    ToolInfo {
        id: "blogs",
        title: "Blog Explorer",
        description: "Browse articles by category.",
    },
    ToolInfo {
        id: "social",
        title: "Messaging",
        description: "Send an SMS, place a call, send an email or post tweets.",
    },
    ToolInfo {
        id: "marks",
        title: "Marks Predictor",
        description: "Predict exam marks from hours of study.",
    },
    ToolInfo {
        id: "bank",
        title: "Bank Ledger",
        description: "Create users, deposit, withdraw and review transactions.",
    },
    ToolInfo {
        id: "search",
        title: "Web Search",
        description: "Search the web and list result links.",
    },
];

#[derive(Deserialize)]
struct Connection {
    #[serde(default)]
    host: String,
    #[serde(default)]
    principal: String,
}

#[derive(Deserialize)]
struct LinuxExecuteBody {
    #[serde(flatten)]
    connection: Connection,
    operation: RemoteOperation,
    target: Option<String>,
}

#[derive(Deserialize)]
struct EditOpenBody {
    #[serde(flatten)]
    connection: Connection,
    target: Option<String>,
}

#[derive(Deserialize)]
struct EditSaveBody {
    #[serde(flatten)]
    connection: Connection,
    target: Option<String>,
    content: String,
}

#[derive(Deserialize)]
struct DockerExecuteBody {
    #[serde(flatten)]
    connection: Connection,
    #[serde(flatten)]
    request: DockerRequest,
}

#[derive(Deserialize)]
struct SummarizeBody {
    url: String,
    pages: Option<usize>,
}

#[derive(Deserialize)]
struct UrlBody {
    url: String,
}

#[derive(Deserialize)]
struct QuestionBody {
    question: String,
}

#[derive(Deserialize)]
struct CodeBody {
    code: String,
}

#[derive(Deserialize)]
struct SmsBody {
    message: String,
}

#[derive(Deserialize)]
struct EmailBody {
    to: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

#[derive(Deserialize)]
struct TweetsBody {
    tweets: Vec<String>,
}

#[derive(Deserialize)]
struct ReportBody {
    text: String,
}

#[derive(Deserialize)]
struct MarksBody {
    hours: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewUserBody {
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    initial_balance: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmountBody {
    user_id: u64,
    amount: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    query: String,
    num_results: Option<usize>,
}

fn parse_body<T: DeserializeOwned>(request: &Request) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(&request.body)?)
}

fn ok<T: Serialize>(value: &T) -> Result<Response, ApiError> {
    Ok(Response::json(200, value))
}

fn operation_menu() -> serde_json::Value {
    let linux: Vec<_> = RemoteOperation::ALL
        .iter()
        .map(|op| json!({ "id": op, "label": op.label() }))
        .collect();
    let docker: Vec<_> = DockerOperation::ALL
        .iter()
        .map(|op| json!({ "id": op, "label": op.label() }))
        .collect();
    json!({ "linux": linux, "docker": docker })
}

fn connect(session: &mut RemoteSession, connection: &Connection) -> Result<(), ApiError> {
    Ok(session.retarget(&connection.host, &connection.principal)?)
}

/// Run a ledger call off the async workers
async fn with_ledger<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&LedgerStore) -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let ledger = state.ledger.clone();
    tokio::task::spawn_blocking(move || f(ledger.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("Ledger task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn session_view(session: &BrowserSession) -> serde_json::Value {
    json!({
        "linux": &session.linux,
        "docker": &session.docker,
        "websiteLoaded": session.website.context.is_some(),
    })
}

/// Dispatch one request. `session` is the caller's browser session.
pub async fn handle(state: &Arc<AppState>, session: &SharedSession, request: &Request) -> Response {
    debug!("{} {}", request.method, request.path);
    match route(state, session, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn route(
    state: &Arc<AppState>,
    session: &SharedSession,
    request: &Request,
) -> Result<Response, ApiError> {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") | ("GET", "/index.html") => Ok(Response::html(INDEX_HTML)),
        ("GET", "/api/tools") => ok(&json!({ "tools": TOOLS, "operations": operation_menu() })),
        ("GET", "/api/session") => ok(&session_view(&*session.lock().await)),

        ("POST", "/api/linux/execute") => {
            let body: LinuxExecuteBody = parse_body(request)?;
            let mut guard = session.lock().await;
            connect(&mut guard.linux, &body.connection)?;
            let outcome = state
                .shell
                .run(&mut guard.linux, body.operation, body.target.as_deref())
                .await?;
            ok(&outcome)
        }
        ("POST", "/api/linux/edit/open") => {
            let body: EditOpenBody = parse_body(request)?;
            let mut guard = session.lock().await;
            connect(&mut guard.linux, &body.connection)?;
            let result = state
                .shell
                .open_for_edit(&guard.linux, body.target.as_deref())
                .await?;
            ok(&json!({ "content": &result.stdout, "result": &result }))
        }
        ("POST", "/api/linux/edit/save") => {
            let body: EditSaveBody = parse_body(request)?;
            let mut guard = session.lock().await;
            connect(&mut guard.linux, &body.connection)?;
            let remote_path = state
                .shell
                .commit_edit(&guard.linux, body.target.as_deref(), &body.content)
                .await?;
            ok(&json!({ "remotePath": remote_path, "message": "File updated successfully!" }))
        }

        ("POST", "/api/docker/execute") => {
            let body: DockerExecuteBody = parse_body(request)?;
            let operation = body
                .request
                .operation
                .ok_or_else(|| ApiError::BadRequest("Please choose a Docker operation.".into()))?;
            let mut guard = session.lock().await;
            connect(&mut guard.docker, &body.connection)?;
            let outcome = state
                .shell
                .docker(
                    &guard.docker,
                    operation,
                    body.request.name.as_deref(),
                    body.request.image.as_deref(),
                )
                .await?;
            ok(&outcome)
        }

        ("POST", "/api/summarize") => {
            let body: SummarizeBody = parse_body(request)?;
            ok(&state.summarizer.summarize_url(&body.url, body.pages).await?)
        }
        ("POST", "/api/summarize/pdf") => {
            let body: ReportBody = parse_body(request)?;
            let pdf = tokio::task::spawn_blocking(move || render_pdf("Summary", &body.text))
                .await
                .map_err(|e| ApiError::Internal(format!("PDF task failed: {}", e)))??;
            Ok(Response::new(200, "application/pdf", pdf)
                .with_header("Content-Disposition", "attachment; filename=\"summary.pdf\""))
        }

        ("POST", "/api/website/load") => {
            let body: UrlBody = parse_body(request)?;
            let mut guard = session.lock().await;
            state.website.load(&mut guard.website, &body.url).await?;
            let characters = guard.website.context.as_deref().map_or(0, |c| c.chars().count());
            ok(&json!({ "message": "Website content loaded.", "characters": characters }))
        }
        ("POST", "/api/website/ask") => {
            let body: QuestionBody = parse_body(request)?;
            let mut guard = session.lock().await;
            let answer = state.website.ask(&mut guard.website, &body.question).await?;
            ok(&json!({ "answer": answer, "history": &guard.website.history }))
        }
        ("GET", "/api/website/history") => {
            let guard = session.lock().await;
            ok(&json!({
                "loaded": guard.website.context.is_some(),
                "history": &guard.website.history,
            }))
        }

        ("POST", "/api/code/fix") => {
            let body: CodeBody = parse_body(request)?;
            ok(&json!({ "answer": state.code.fix(&body.code).await? }))
        }
        ("POST", "/api/code/explain") => {
            let body: CodeBody = parse_body(request)?;
            ok(&json!({ "answer": state.code.explain(&body.code).await? }))
        }

        ("GET", "/api/blogs") => {
            let category = request.query_param("category");
            ok(&json!({ "categories": blog::categories(), "posts": blog::posts(category) }))
        }

        ("POST", "/api/social/sms") => {
            let body: SmsBody = parse_body(request)?;
            let sid = state.messaging.send_sms(&body.message).await?;
            ok(&json!({ "sid": sid, "message": "Message sent." }))
        }
        ("POST", "/api/social/call") => {
            let sid = state.messaging.place_call().await?;
            ok(&json!({ "sid": sid, "message": "Call initiated." }))
        }
        ("POST", "/api/social/email") => {
            let body: EmailBody = parse_body(request)?;
            state
                .mailer
                .send_email(&body.to, &body.subject, &body.body)
                .await?;
            ok(&json!({ "message": "Email sent successfully!" }))
        }
        ("POST", "/api/social/tweets") => {
            let body: TweetsBody = parse_body(request)?;
            ok(&state.tweets.post_tweets(&body.tweets).await?)
        }

        ("POST", "/api/marks/predict") => {
            let body: MarksBody = parse_body(request)?;
            ok(&state.marks.predict(body.hours).await?)
        }

        ("GET", "/api/bank/users") => ok(&with_ledger(state, |l| l.list_users()).await?),
        ("POST", "/api/bank/users") => {
            let body: NewUserBody = parse_body(request)?;
            let user = with_ledger(state, move |l| {
                l.create_user(&body.name, &body.email, body.initial_balance)
            })
            .await?;
            ok(&user)
        }
        ("POST", "/api/bank/deposit") => {
            let body: AmountBody = parse_body(request)?;
            ok(&with_ledger(state, move |l| l.deposit(body.user_id, body.amount)).await?)
        }
        ("POST", "/api/bank/withdraw") => {
            let body: AmountBody = parse_body(request)?;
            ok(&with_ledger(state, move |l| l.withdraw(body.user_id, body.amount)).await?)
        }
        ("GET", "/api/bank/transactions") => {
            let user_id = request
                .query_param("user_id")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or_else(|| ApiError::BadRequest("Please provide a valid user_id.".into()))?;
            ok(&with_ledger(state, move |l| l.transactions(user_id)).await?)
        }

        ("POST", "/api/search") => {
            let body: SearchBody = parse_body(request)?;
            ok(&web_search(state.search.as_ref(), &body.query, body.num_results).await?)
        }

        (_, path) if is_known_path(path) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound(format!("No route for {}", request.path))),
    }
}

fn is_known_path(path: &str) -> bool {
    matches!(
        path,
        "/" | "/index.html"
            | "/api/tools"
            | "/api/session"
            | "/api/linux/execute"
            | "/api/linux/edit/open"
            | "/api/linux/edit/save"
            | "/api/docker/execute"
            | "/api/summarize"
            | "/api/summarize/pdf"
            | "/api/website/load"
            | "/api/website/ask"
            | "/api/website/history"
            | "/api/code/fix"
            | "/api/code/explain"
            | "/api/blogs"
            | "/api/social/sms"
            | "/api/social/call"
            | "/api/social/email"
            | "/api/social/tweets"
            | "/api/marks/predict"
            | "/api/bank/users"
            | "/api/bank/deposit"
            | "/api/bank/withdraw"
            | "/api/bank/transactions"
            | "/api/search"
    )
}
