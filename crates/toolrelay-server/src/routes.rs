//! HTTP routes
//!
//! - `POST /generate`: run one agent turn, streamed as newline-delimited JSON
//! - `GET /health`: tool provider states

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use toolrelay_core::{log_info, log_warn};
use toolrelay_core::{GenerateRequest, ProviderStatus, RequestContext};

use crate::state::AppState;

/// Content type of the `/generate` response body
pub const STREAM_CONTENT_TYPE: &str = "application/x-json-stream";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub providers: Vec<ProviderStatus>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn error_response(status: StatusCode, error: &str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message,
        }),
    )
        .into_response()
}

/// Parse and validate the body, then stream the turn.
///
/// The body is read as raw bytes so clients that omit the JSON content type
/// are still served. Dropping the response body (client disconnect) drops
/// the event stream, which cancels the turn.
async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    let request: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log_warn!(state.logger, "[Server] Rejected malformed generate body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "invalid_json", e.to_string());
        }
    };

    let ctx = RequestContext::new(request.user());
    let request_id = ctx.short_id().to_string();

    let events = match state.service.handle(&request, ctx) {
        Ok(events) => events,
        Err(e) => {
            log_warn!(state.logger, "[Server] [{}] Rejected generate request: {}", request_id, e);
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid_prompt", e.to_string());
        }
    };

    log_info!(state.logger, "[Server] [{}] Streaming generate response", request_id);

    let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(event.to_line())));
    ([(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)], body).into_response()
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state.registry().statuses();
    let status = if providers.iter().any(|p| p.last_error.is_some()) {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthResponse { status, providers })
}
