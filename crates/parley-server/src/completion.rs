//! Chat completion against a loaded model.

use parley_backend::{BackendError, GenerationParams, TextGenerator};
use parley_protocol::{ChatRequest, ChatResponse, Usage};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ServiceError;

/// Run one completion: template, tokenize, generate.
///
/// The prompt is excluded from the reply; usage counts the rendered prompt
/// and the generated continuation.
pub async fn complete(
    generator: &dyn TextGenerator,
    request: &ChatRequest,
    cancel: &CancellationToken,
) -> Result<ChatResponse, BackendError> {
    let prompt = generator.apply_chat_template(&request.messages).await?;
    let tokens = generator.tokenize(&prompt).await?;

    let params = GenerationParams::new(request.max_tokens, request.temperature, request.top_p);
    debug!(
        "Generating: {} prompt tokens, max_new_tokens={}, do_sample={}",
        tokens.len(),
        params.max_new_tokens,
        params.do_sample
    );

    let generation = generator.generate(&tokens, &params, cancel).await?;
    let prompt_tokens = u32::try_from(tokens.len()).unwrap_or(u32::MAX);

    Ok(ChatResponse {
        response: generation.text,
        usage: Usage::new(prompt_tokens, generation.completion_tokens),
    })
}

/// Run a completion that is cancelled once `deadline` passes.
///
/// Dropping the returned future (the caller went away) also cancels the
/// generation.
pub async fn complete_with_deadline(
    generator: &dyn TextGenerator,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<ChatResponse, ServiceError> {
    let cancel = CancellationToken::new();
    let _on_drop = cancel.clone().drop_guard();

    let run = complete(generator, request, &cancel);
    tokio::pin!(run);

    // On expiry the generator is told to stop and allowed to unwind.
    let outcome = tokio::time::timeout(deadline, &mut run).await;
    let result = match outcome {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            run.await
        }
    };

    match result {
        Ok(response) => Ok(response),
        Err(BackendError::Cancelled) if cancel.is_cancelled() => {
            warn!("Generation exceeded deadline of {:?}", deadline);
            Err(ServiceError::DeadlineExceeded(deadline))
        }
        Err(e) => Err(ServiceError::InferenceFailed(e)),
    }
}
