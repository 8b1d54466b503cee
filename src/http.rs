use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{LogReaderError, Result};
use crate::mcp::{process_request, RpcRequest};
use crate::model::ReadLogsRequest;
use crate::retriever::LogRetriever;

type Sessions = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Event>>>>;

#[derive(Clone)]
pub struct AppState {
    pub retriever: Arc<LogRetriever>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(retriever: Arc<LogRetriever>) -> Self {
        Self {
            retriever,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

/// Owned by an SSE stream; unregisters the session when the client goes away.
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(&self.id);
        }
        debug!("SSE session {} closed", self.id);
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

async fn read_logs_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ReadLogsRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"))
        }
    };

    match state.retriever.read_logs(&req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read MCP logs: {e}"),
        ),
    }
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = format!("{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));

    let endpoint_url = format!("/message?session_id={session_id}");
    let _ = tx.send(Event::default().event("endpoint").data(endpoint_url));

    if let Ok(mut sessions) = state.sessions.write() {
        sessions.insert(session_id.clone(), tx);
    }
    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };

    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        let _session = &guard;
        Ok::<_, axum::Error>(event)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    Json(req): Json<RpcRequest>,
) -> impl IntoResponse {
    let sender = state
        .sessions
        .read()
        .ok()
        .and_then(|sessions| sessions.get(&q.session_id).cloned());

    let Some(sender) = sender else {
        return StatusCode::NOT_FOUND;
    };

    let retriever = state.retriever.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let Some(resp) = process_request(&retriever, req).await else {
            return;
        };
        if let Ok(json_str) = serde_json::to_string(&resp) {
            if sender.send(Event::default().event("message").data(json_str)).is_err() {
                // client went away
                if let Ok(mut sessions) = sessions.write() {
                    sessions.remove(&q.session_id);
                }
            }
        }
    });
    StatusCode::ACCEPTED
}

pub fn build_router(retriever: Arc<LogRetriever>) -> Router {
    router(AppState::new(retriever))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/logs", post(read_logs_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state)
}

pub async fn serve_http(retriever: Arc<LogRetriever>, server: &ServerConfig) -> Result<()> {
    let addr = format!(
        "{}:{}",
        server.http_addr.as_deref().unwrap_or("127.0.0.1"),
        server.http_port.unwrap_or(3000)
    );
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("HTTP server could not bind {addr}: {e}");
            return Err(LogReaderError::ConfigError(format!("bind {addr} failed: {e}")));
        }
    };
    info!("HTTP server listening on http://{addr}");
    let result = axum::serve(listener, build_router(retriever)).await;
    if let Err(e) = &result {
        warn!("HTTP server stopped: {e}");
    }
    result.map_err(Into::into)
}

/// Runs the HTTP server next to `primary` (the stdio loop in `both` mode).
/// Returns when `primary` finishes or as soon as the HTTP server fails.
pub async fn serve_alongside<F>(
    retriever: Arc<LogRetriever>,
    server: &ServerConfig,
    primary: F,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::pin!(primary);
    tokio::select! {
        res = &mut primary => res,
        res = serve_http(retriever, server) => match res {
            Ok(()) => primary.await,
            Err(e) => Err(e),
        },
    }
}
