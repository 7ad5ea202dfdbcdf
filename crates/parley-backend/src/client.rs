//! HTTP client for llama-server's native API.

use parley_protocol::Message;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::BackendError;
use crate::generator::{Generation, GenerationParams, TokenId};
use crate::DEFAULT_PORT;

/// Client for communicating with llama-server.
#[derive(Debug, Clone)]
pub struct LlamaCppClient {
    client: reqwest::Client,
    base_url: String,
}

/// Request to `/apply-template`.
#[derive(Debug, Serialize)]
struct ApplyTemplateRequest<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ApplyTemplateResponse {
    prompt: String,
}

/// Request to `/tokenize`.
#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    content: &'a str,
    add_special: bool,
    parse_special: bool,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    tokens: Vec<TokenId>,
}

/// Request to `/completion`.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a [TokenId],
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    stream: bool,
    cache_prompt: bool,
}

/// Response from `/completion`.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
    #[serde(default)]
    tokens_predicted: u32,
    #[serde(default)]
    stop_type: Option<String>,
}

/// Error response from llama-server.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl<'a> CompletionRequest<'a> {
    fn new(prompt: &'a [TokenId], params: &GenerationParams) -> Self {
        // Greedy decoding is requested as zero temperature with a single
        // candidate.
        let (temperature, top_k) = if params.do_sample {
            (params.temperature, None)
        } else {
            (0.0, Some(1))
        };

        Self {
            prompt,
            n_predict: params.max_new_tokens,
            temperature,
            top_p: params.top_p,
            top_k,
            stream: false,
            cache_prompt: true,
        }
    }
}

impl LlamaCppClient {
    /// Create a new client with default URL (localhost:11435).
    pub fn new() -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", DEFAULT_PORT))
    }

    /// Create a new client with a custom URL.
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Create a new client with a custom port on localhost.
    pub fn with_port(port: u16) -> Self {
        Self::with_url(format!("http://127.0.0.1:{}", port))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is running and has finished loading the model.
    pub async fn check_health(&self) -> Result<(), BackendError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::ServerNotRunning(self.base_url.clone()))
        }
    }

    /// Render messages through the model's chat template.
    pub async fn apply_template(&self, messages: &[Message]) -> Result<String, BackendError> {
        let response: ApplyTemplateResponse = self
            .post("/apply-template", &ApplyTemplateRequest { messages })
            .await?;
        Ok(response.prompt)
    }

    /// Tokenize text, honouring special tokens written by the template.
    pub async fn tokenize(&self, content: &str) -> Result<Vec<TokenId>, BackendError> {
        let request = TokenizeRequest {
            content,
            add_special: true,
            parse_special: true,
        };
        let response: TokenizeResponse = self.post("/tokenize", &request).await?;
        Ok(response.tokens)
    }

    /// Generate a continuation of a tokenized prompt.
    pub async fn complete(
        &self,
        prompt: &[TokenId],
        params: &GenerationParams,
    ) -> Result<Generation, BackendError> {
        let request = CompletionRequest::new(prompt, params);
        let response: CompletionResponse = self.post("/completion", &request).await?;

        debug!(
            "Completion finished: {} tokens, stop type {:?}",
            response.tokens_predicted, response.stop_type
        );

        Ok(Generation {
            text: response.content,
            completion_tokens: response.tokens_predicted,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(BackendError::Api(format!("{}: {}", status, message)));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn connect_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::ServerNotRunning(self.base_url.clone())
        } else {
            BackendError::Http(e)
        }
    }
}

impl Default for LlamaCppClient {
    fn default() -> Self {
        Self::new()
    }
}
