//! The model capability seen by the service.

use async_trait::async_trait;
use parley_protocol::Message;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

/// Vocabulary index of a token.
pub type TokenId = u32;

/// Sampling settings for one generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Sample from the distribution; greedy decoding when false.
    pub do_sample: bool,
}

impl GenerationParams {
    /// Sampling is enabled exactly when `temperature` is positive.
    pub fn new(max_new_tokens: u32, temperature: f32, top_p: f32) -> Self {
        Self {
            max_new_tokens,
            temperature,
            top_p,
            do_sample: temperature > 0.0,
        }
    }
}

/// Output of a generation call, prompt excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Decoded continuation with special tokens stripped.
    pub text: String,
    /// Number of tokens generated after the prompt.
    pub completion_tokens: u32,
}

/// A loaded model that can format, tokenize and continue conversations.
///
/// Implementations are shared read-only across concurrent requests. Any
/// serialization of compute access is the implementation's concern.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Render messages with the model's chat template, leaving an open
    /// assistant turn at the end.
    async fn apply_chat_template(&self, messages: &[Message]) -> Result<String, BackendError>;

    /// Tokenize a rendered prompt.
    async fn tokenize(&self, prompt: &str) -> Result<Vec<TokenId>, BackendError>;

    /// Continue a tokenized prompt.
    ///
    /// Must stop promptly with [`BackendError::Cancelled`] once `cancel`
    /// fires.
    async fn generate(
        &self,
        prompt: &[TokenId],
        params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<Generation, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_temperature_is_greedy() {
        let params = GenerationParams::new(16, 0.0, 0.8);
        assert!(!params.do_sample);
    }

    #[test]
    fn test_positive_temperature_samples() {
        let params = GenerationParams::new(16, 0.7, 0.8);
        assert!(params.do_sample);
        assert_eq!(params.max_new_tokens, 16);
    }

    #[test]
    fn test_negative_temperature_is_greedy() {
        assert!(!GenerationParams::new(16, -1.0, 0.8).do_sample);
    }
}
