use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use log::{error, info};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::config::SystemPreamble;
use crate::llm::chat::{BoxError, ChatClient};
use crate::models::{ChatMessage, Role};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body did not deserialize to an array of messages.
    #[error("Invalid input: expected an array of messages")]
    InvalidInput(String),
    /// Provider call failed before the first streamed byte.
    #[error("An unexpected error occurred")]
    Provider(#[source] BoxError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = match self {
            ApiError::InvalidInput(detail) => {
                info!("Rejected chat request body: {}", detail);
                StatusCode::BAD_REQUEST
            }
            ApiError::Provider(e) => {
                error!("Error invoking chat provider: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    client: Arc<dyn ChatClient>,
    preamble: Arc<RwLock<SystemPreamble>>,
}

impl AppState {
    pub fn new(client: Arc<dyn ChatClient>, preamble: SystemPreamble) -> Self {
        Self {
            client,
            preamble: Arc::new(RwLock::new(preamble)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/reload-preamble", get(reload_preamble_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(addr: &str, state: AppState) -> Result<(), BoxError> {
    let addr = addr.parse::<SocketAddr>()?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// `POST /api/chat` — relays the client's conversation to the provider and
/// streams the reply back as a raw concatenated UTF-8 text body. The system
/// preamble is prepended here and never echoed back to the caller.
async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let messages: Vec<ChatMessage> = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

    let preamble = state.preamble.read().await.text().to_string();
    let mut outbound = Vec::with_capacity(messages.len() + 1);
    outbound.push(ChatMessage { role: Role::System, content: preamble });
    outbound.extend(messages);

    let deltas = state
        .client
        .stream_completion(&outbound)
        .await
        .map_err(ApiError::Provider)?;

    // Once streaming has begun a mid-stream failure can only abort the body;
    // the failure is logged here since no structured payload can follow.
    let byte_stream = deltas.map(|item| match item {
        Ok(delta) => Ok(Bytes::from(delta)),
        Err(e) => {
            error!("Streaming error: {}", e);
            Err(e)
        }
    });

    let mut response = Body::from_stream(byte_stream).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(response)
}

/// `GET /api/reload-preamble` — re-reads the preamble file if it changed.
async fn reload_preamble_handler(State(state): State<AppState>) -> impl IntoResponse {
    let reloaded = {
        let current = state.preamble.read().await;
        current.reload_if_changed()
    };

    match reloaded {
        Ok(Some(fresh)) => {
            *state.preamble.write().await = fresh;
            (StatusCode::OK, Json(ReloadResponse {
                success: true,
                message: "Preamble reloaded".into(),
            }))
        }
        Ok(None) => (StatusCode::OK, Json(ReloadResponse {
            success: true,
            message: "Preamble unchanged".into(),
        })),
        Err(e) => {
            error!("Preamble reload failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ReloadResponse {
                success: false,
                message: format!("Reload error: {}", e),
            }))
        }
    }
}
