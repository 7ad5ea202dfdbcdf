//! HTTP endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use parley_protocol::{
    ChatRequest, ChatResponse, HealthResponse, InfoResponse, CHAT_ALIAS_PATH,
    CHAT_COMPLETIONS_PATH, HEALTH_PATH,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::completion::complete_with_deadline;
use crate::error::ServiceError;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(HEALTH_PATH, get(health))
        .route(CHAT_COMPLETIONS_PATH, post(chat_completions))
        .route(CHAT_ALIAS_PATH, post(chat_completions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness and static info; answers in every state.
async fn root(State(state): State<AppState>) -> Json<InfoResponse> {
    let device = state.device();
    Json(InfoResponse {
        status: "running".to_string(),
        model: state.model_name().to_string(),
        device: device.device.to_string(),
        cuda_available: device.cuda_available,
    })
}

/// Readiness: succeeds only once the model is loaded.
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ServiceError> {
    state.generator().await?;
    Ok(Json(HealthResponse::healthy()))
}

async fn chat_completions(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServiceError> {
    let Json(request) = body?;
    if request.messages.is_empty() {
        return Err(ServiceError::EmptyMessages);
    }

    let generator = state.generator().await?;

    if request.stream {
        debug!("Streaming requested; replying with a single body");
    }

    match complete_with_deadline(generator.as_ref(), &request, state.generation_timeout()).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("Chat completion failed: {}", e);
            Err(e)
        }
    }
}
