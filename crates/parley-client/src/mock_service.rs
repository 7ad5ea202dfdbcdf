//! Scripted stand-in for the Parley service, used by tests.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parley_protocol::{
    ChatRequest, ChatResponse, ErrorBody, HealthResponse, Usage, CHAT_COMPLETIONS_PATH,
    HEALTH_PATH,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::ClientConfig;

/// What the service answers to the next chat request.
pub enum MockReply {
    Text { response: String, usage: Usage },
    Status(StatusCode, String),
    /// Sleep before answering, to trigger client timeouts.
    Hang(Duration),
}

impl MockReply {
    pub fn text(response: &str, prompt_tokens: u32, completion_tokens: u32) -> Self {
        MockReply::Text {
            response: response.to_string(),
            usage: Usage::new(prompt_tokens, completion_tokens),
        }
    }

    pub fn status(code: u16, detail: &str) -> Self {
        let code = StatusCode::from_u16(code).unwrap();
        MockReply::Status(code, detail.to_string())
    }

    pub fn hang(duration: Duration) -> Self {
        MockReply::Hang(duration)
    }
}

#[derive(Clone, Default)]
struct Shared {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

pub struct MockService {
    url: String,
    shared: Shared,
}

impl MockService {
    /// Serve the scripted replies, in order, on an ephemeral port.
    pub async fn spawn(replies: Vec<MockReply>) -> Self {
        let shared = Shared::default();
        shared.replies.lock().unwrap().extend(replies);

        let router = Router::new()
            .route(HEALTH_PATH, get(|| async { Json(HealthResponse::healthy()) }))
            .route(CHAT_COMPLETIONS_PATH, post(chat))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            shared,
        }
    }

    /// Client settings pointing at this service, with fast health polling.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_url(self.url.clone())
            .with_health_polling(3, Duration::from_millis(10))
    }

    /// Every chat request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.shared.requests.lock().unwrap().clone()
    }
}

async fn chat(State(shared): State<Shared>, Json(request): Json<ChatRequest>) -> Response {
    shared.requests.lock().unwrap().push(request);
    let reply = shared.replies.lock().unwrap().pop_front();

    match reply {
        Some(MockReply::Text { response, usage }) => {
            Json(ChatResponse { response, usage }).into_response()
        }
        Some(MockReply::Status(code, detail)) => (code, Json(ErrorBody::new(detail))).into_response(),
        Some(MockReply::Hang(duration)) => {
            tokio::time::sleep(duration).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("no scripted reply")),
        )
            .into_response(),
    }
}
