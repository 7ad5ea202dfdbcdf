//! HTTP client for the Parley service.

use parley_protocol::{
    ChatRequest, ChatResponse, Message, Usage, CHAT_COMPLETIONS_PATH, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, HEALTH_PATH,
};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::conversation::Conversation;
use crate::error::ClientError;

/// Service address the client talks to.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Generation can be slow; this is deliberately generous.
    pub request_timeout: Duration,
    /// Timeout of a single health probe
    pub health_timeout: Duration,
    /// Number of health probes before giving up
    pub health_attempts: u32,
    /// Pause between health probes
    pub health_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(300),
            health_timeout: Duration::from_secs(2),
            health_attempts: 30,
            health_interval: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_health_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.health_attempts = attempts;
        self.health_interval = interval;
        self
    }
}

/// Client for the chat-completion endpoint.
pub struct ChatClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check if the service is ready to answer.
    pub async fn check_health(&self) -> Result<(), ClientError> {
        let url = format!("{}{}", self.config.api_url, HEALTH_PATH);

        let response = self
            .client
            .get(&url)
            .timeout(self.config.health_timeout)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    /// Poll the health endpoint until ready or out of attempts.
    ///
    /// `on_wait` is called with the attempt number before each pause.
    pub async fn wait_for_service(
        &self,
        mut on_wait: impl FnMut(u32, u32),
    ) -> Result<(), ClientError> {
        let attempts = self.config.health_attempts;

        for attempt in 1..=attempts {
            match self.check_health().await {
                Ok(()) => return Ok(()),
                Err(e) => debug!("Health check {}/{} failed: {}", attempt, attempts, e),
            }

            if attempt < attempts {
                on_wait(attempt, attempts);
                tokio::time::sleep(self.config.health_interval).await;
            }
        }

        Err(ClientError::ServiceUnavailable { attempts })
    }

    /// Request a reply to the given conversation.
    pub async fn complete(&self, messages: &[Message]) -> Result<ChatResponse, ClientError> {
        let url = format!("{}{}", self.config.api_url, CHAT_COMPLETIONS_PATH);
        let request = ChatRequest::new(messages.to_vec())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        Ok(response.json().await?)
    }
}

async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}

/// Outcome of a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub reply: String,
    pub usage: Usage,
    pub elapsed: Duration,
}

/// A conversation bound to a service.
pub struct ChatSession {
    client: ChatClient,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
        }
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send a user message with the whole history as context.
    ///
    /// The user turn is recorded even when the request fails, so the next
    /// message carries it as context. The reply and its token usage are only
    /// recorded on success.
    pub async fn send_message(&mut self, input: &str) -> Result<TurnReply, ClientError> {
        self.conversation.push(Message::user(input));

        let start = Instant::now();
        let response = self.client.complete(self.conversation.messages()).await?;
        let elapsed = start.elapsed();

        self.conversation
            .push(Message::assistant(response.response.clone()));
        self.conversation.record_usage(response.usage.total_tokens);

        Ok(TurnReply {
            reply: response.response,
            usage: response.usage,
            elapsed,
        })
    }

    pub fn clear(&mut self) {
        self.conversation.clear();
    }
}
