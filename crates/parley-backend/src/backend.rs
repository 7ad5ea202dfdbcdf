//! `TextGenerator` backed by a supervised llama-server process.

use async_trait::async_trait;
use parley_protocol::Message;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::LlamaCppClient;
use crate::device::Device;
use crate::error::BackendError;
use crate::generator::{Generation, GenerationParams, TextGenerator, TokenId};
use crate::model::ModelFile;
use crate::server::LlamaCppServer;

/// Everything needed to bring a model online.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// llama-server executable.
    pub binary: PathBuf,
    pub model: ModelFile,
    pub device: Device,
    /// Loopback port for the runtime.
    pub port: u16,
    pub ctx_size: u32,
    /// How long to wait for the model to load.
    pub load_timeout: Duration,
}

/// A loaded model served by llama-server.
///
/// Dropping the backend stops the runtime process.
#[derive(Debug)]
pub struct LlamaCppBackend {
    server: LlamaCppServer,
    client: LlamaCppClient,
    model_name: String,
}

impl LlamaCppBackend {
    /// Spawn llama-server and wait until the model is loaded.
    pub async fn launch(options: LaunchOptions) -> Result<Self, BackendError> {
        info!(
            "Loading model '{}' from {} on {}",
            options.model.name,
            options.model.path.display(),
            options.device
        );

        let mut server = LlamaCppServer::new(&options.binary, &options.model.path)
            .with_port(options.port)
            .with_ctx_size(options.ctx_size)
            .with_gpu_layers(options.device.gpu_layers());

        server.start()?;
        // On failure `server` is dropped here, which stops the process.
        server.wait_ready(options.load_timeout).await?;

        let client = server.client();
        Ok(Self {
            server,
            client,
            model_name: options.model.name,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn pid(&self) -> Option<u32> {
        self.server.pid()
    }

    /// Stop the runtime process.
    pub async fn shutdown(mut self) -> Result<(), BackendError> {
        self.server.shutdown().await
    }
}

#[async_trait]
impl TextGenerator for LlamaCppBackend {
    async fn apply_chat_template(&self, messages: &[Message]) -> Result<String, BackendError> {
        self.client.apply_template(messages).await
    }

    async fn tokenize(&self, prompt: &str) -> Result<Vec<TokenId>, BackendError> {
        self.client.tokenize(prompt).await
    }

    async fn generate(
        &self,
        prompt: &[TokenId],
        params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<Generation, BackendError> {
        // Dropping the in-flight request closes the connection, which makes
        // llama-server abandon the task.
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Generation cancelled");
                Err(BackendError::Cancelled)
            }
            result = self.client.complete(prompt, params) => result,
        }
    }
}
