//! Service state shared by every request handler.

use parley_backend::{DeviceInfo, TextGenerator};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::ServiceError;

/// Lifecycle of the loaded model.
///
/// `Ready` and `Failed` are terminal; there is no reload.
#[derive(Clone)]
pub enum ServiceStatus {
    Unloaded,
    Loading,
    Ready(Arc<dyn TextGenerator>),
    Failed(String),
}

/// Payload-free view of [`ServiceStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl ServiceStatus {
    pub fn phase(&self) -> Phase {
        match self {
            ServiceStatus::Unloaded => Phase::Unloaded,
            ServiceStatus::Loading => Phase::Loading,
            ServiceStatus::Ready(_) => Phase::Ready,
            ServiceStatus::Failed(_) => Phase::Failed,
        }
    }
}

impl fmt::Debug for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
            other => write!(f, "{:?}", other.phase()),
        }
    }
}

/// Shared service state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    /// Display name of the served model
    model_name: String,
    /// Device selected before loading
    device: DeviceInfo,
    /// Per-request generation deadline
    generation_timeout: Duration,
    status: RwLock<ServiceStatus>,
}

impl AppState {
    pub fn new(model_name: impl Into<String>, device: DeviceInfo, generation_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                model_name: model_name.into(),
                device,
                generation_timeout,
                status: RwLock::new(ServiceStatus::Unloaded),
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.inner.model_name
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.inner.device
    }

    pub fn generation_timeout(&self) -> Duration {
        self.inner.generation_timeout
    }

    pub async fn phase(&self) -> Phase {
        self.inner.status.read().await.phase()
    }

    /// `unloaded -> loading`
    pub async fn mark_loading(&self) {
        self.transition(Phase::Unloaded, ServiceStatus::Loading).await;
    }

    /// `loading -> ready`
    pub async fn mark_ready(&self, generator: Arc<dyn TextGenerator>) {
        self.transition(Phase::Loading, ServiceStatus::Ready(generator))
            .await;
    }

    /// `loading -> failed`
    pub async fn mark_failed(&self, reason: impl Into<String>) {
        self.transition(Phase::Loading, ServiceStatus::Failed(reason.into()))
            .await;
    }

    /// The loaded model, or `NotReady` in any other state.
    pub async fn generator(&self) -> Result<Arc<dyn TextGenerator>, ServiceError> {
        match &*self.inner.status.read().await {
            ServiceStatus::Ready(generator) => Ok(generator.clone()),
            _ => Err(ServiceError::NotReady),
        }
    }

    async fn transition(&self, from: Phase, to: ServiceStatus) {
        let mut status = self.inner.status.write().await;
        if status.phase() != from {
            warn!(
                "Ignoring transition {:?} -> {:?}: current state is {:?}",
                from,
                to.phase(),
                status.phase()
            );
            return;
        }
        info!("Service state: {:?} -> {:?}", from, to);
        *status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_backend::{
        BackendError, CancellationToken, Generation, GenerationParams, TokenId,
    };
    use parley_protocol::Message;

    struct NullGenerator;

    #[async_trait]
    impl TextGenerator for NullGenerator {
        async fn apply_chat_template(&self, _: &[Message]) -> Result<String, BackendError> {
            Ok(String::new())
        }

        async fn tokenize(&self, _: &str) -> Result<Vec<TokenId>, BackendError> {
            Ok(vec![])
        }

        async fn generate(
            &self,
            _: &[TokenId],
            _: &GenerationParams,
            _: &CancellationToken,
        ) -> Result<Generation, BackendError> {
            Ok(Generation {
                text: String::new(),
                completion_tokens: 0,
            })
        }
    }

    fn state() -> AppState {
        AppState::new("test-model", DeviceInfo::cpu(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_load_success_path() {
        let state = state();
        assert_eq!(state.phase().await, Phase::Unloaded);
        assert!(matches!(state.generator().await, Err(ServiceError::NotReady)));

        state.mark_loading().await;
        assert_eq!(state.phase().await, Phase::Loading);
        assert!(state.generator().await.is_err());

        state.mark_ready(Arc::new(NullGenerator)).await;
        assert_eq!(state.phase().await, Phase::Ready);
        assert!(state.generator().await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_is_terminal() {
        let state = state();
        state.mark_loading().await;
        state.mark_failed("model path does not exist").await;
        assert_eq!(state.phase().await, Phase::Failed);

        state.mark_ready(Arc::new(NullGenerator)).await;
        assert_eq!(state.phase().await, Phase::Failed);
        assert!(state.generator().await.is_err());
    }

    #[tokio::test]
    async fn test_ready_requires_loading() {
        let state = state();
        state.mark_ready(Arc::new(NullGenerator)).await;
        assert_eq!(state.phase().await, Phase::Unloaded);
    }
}
