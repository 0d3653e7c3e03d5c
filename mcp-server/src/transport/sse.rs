//! HTTP transport: responses are pushed over a server-sent event stream.
//!
//! A host opens `GET /sse`; the first event (`endpoint`) tells it where to
//! POST messages for that session. Each POSTed message is answered with
//! `202 Accepted` and its JSON-RPC response arrives later on the stream as a
//! `message` event.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::logging::request_logger;
use crate::mcp::McpServer;

/// Responses buffered per session before POST handlers start waiting.
const SESSION_BUFFER: usize = 32;

/// Open sessions. The map lock is never held across an await.
pub struct SseState {
    server: McpServer,
    sessions: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
}

impl SseState {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn open(&self, id: Uuid, tx: mpsc::Sender<String>) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
    }

    fn close(&self, id: &Uuid) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Sender for a live session.
    fn session(&self, id: &Uuid) -> Option<mpsc::Sender<String>> {
        let tx = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()?;
        (!tx.is_closed()).then_some(tx)
    }
}

/// Unregisters its session when the event stream owning it is dropped.
struct SessionGuard {
    state: Arc<SseState>,
    session_id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.close(&self.session_id);
        tracing::info!(session_id = %self.session_id, "SSE session closed");
    }
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Uuid,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the SSE router.
pub fn router(server: McpServer) -> Router {
    let state = Arc::new(SseState::new(server));

    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(server: McpServer, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
}

/// GET /sse - open a session.
async fn open_stream(
    State(state): State<Arc<SseState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel::<String>(SESSION_BUFFER);
    state.open(session_id, tx);
    tracing::info!(session_id = %session_id, "SSE session opened");
    let guard = SessionGuard {
        state: state.clone(),
        session_id,
    };

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={}", session_id));
    let messages = ReceiverStream::new(rx).map(move |json| {
        let _session = &guard;
        Ok(Event::default().event("message").data(json))
    });
    let stream = tokio_stream::once(Ok::<_, Infallible>(endpoint)).chain(messages);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// POST /messages?session_id= - accept one JSON-RPC message.
async fn post_message(
    State(state): State<Arc<SseState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> StatusCode {
    let Some(tx) = state.session(&query.session_id) else {
        return StatusCode::NOT_FOUND;
    };

    // Each message runs in its own task so slow queries do not block others.
    let server = state.server.clone();
    let session_id = query.session_id;
    tokio::spawn(async move {
        if let Some(response) = server.handle_message(&body).await {
            if tx.send(response).await.is_err() {
                tracing::debug!(session_id = %session_id, "Session closed before response was sent");
            }
        }
    });

    StatusCode::ACCEPTED
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
