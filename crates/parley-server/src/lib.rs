//! # Parley Inference Service
//!
//! OpenAI-style chat completions over HTTP for one locally loaded model.
//!
//! ## Lifecycle
//!
//! ```text
//! unloaded ──► loading ──► ready    (serving)
//!                  └─────► failed   (process exits non-zero)
//! ```
//!
//! The model is loaded before the listener is bound, so traffic is only
//! accepted once the service is ready. Handlers still check readiness
//! through [`AppState`] and answer 503 otherwise.

mod completion;
mod config;
mod error;
mod routes;
mod state;

pub use completion::{complete, complete_with_deadline};
pub use config::{ServiceConfig, ServiceConfigBuilder, DEFAULT_MODEL_PATH, LISTEN_ADDR};
pub use error::{ServiceError, StartupError};
pub use routes::create_router;
pub use state::{AppState, Phase, ServiceStatus};

use parley_backend::{
    model_display_name, paths, BackendError, DeviceInfo, LaunchOptions, LlamaCppBackend,
    ModelFile,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Load the model, then serve until interrupted.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let device = DeviceInfo::detect();
    match &device.gpu_name {
        Some(name) => info!("Using GPU: {}", name),
        None if device.cuda_available => info!("Using CUDA device"),
        None => warn!("CUDA not available, using CPU"),
    }

    let model_name = model_display_name(&config.model_path);
    let state = AppState::new(model_name, device.clone(), config.generation_timeout);

    state.mark_loading().await;
    let backend = match load(&config, &device).await {
        Ok(backend) => {
            info!(
                "Model '{}' loaded (llama-server PID {:?})",
                backend.model_name(),
                backend.pid()
            );
            Arc::new(backend)
        }
        Err(e) => {
            error!("Model load failed: {}", e);
            state.mark_failed(e.to_string()).await;
            return Err(e.into());
        }
    };
    state.mark_ready(backend.clone()).await;

    let listener = TcpListener::bind(LISTEN_ADDR)
        .await
        .map_err(|source| StartupError::Bind {
            addr: LISTEN_ADDR.to_string(),
            source,
        })?;

    let served = serve(listener, state).await;

    // Every handler is gone once serving returns.
    match Arc::try_unwrap(backend) {
        Ok(backend) => {
            if let Err(e) = backend.shutdown().await {
                warn!("Failed to stop llama-server: {}", e);
            }
        }
        Err(_) => warn!("Model still in use at shutdown; stopping it on drop"),
    }

    served
}

/// Serve the router on an already-bound listener until Ctrl-C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), StartupError> {
    if let Ok(addr) = listener.local_addr() {
        info!("Parley service listening on http://{}", addr);
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("Parley service stopped");
    Ok(())
}

async fn load(config: &ServiceConfig, device: &DeviceInfo) -> Result<LlamaCppBackend, BackendError> {
    let model = ModelFile::resolve(&config.model_path)?;
    let binary = paths::locate_llama_server(config.llama_server_bin.as_deref());

    LlamaCppBackend::launch(LaunchOptions {
        binary,
        model,
        device: device.device,
        port: config.backend_port,
        ctx_size: config.ctx_size,
        load_timeout: config.load_timeout,
    })
    .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
