//! Serve command - load the model and run the HTTP service.

use parley_server::ServiceConfig;
use tracing::info;

pub(crate) async fn run() -> miette::Result<()> {
    let config = ServiceConfig::from_env();
    info!(
        "Model path: {} (context {} tokens)",
        config.model_path.display(),
        config.ctx_size
    );

    parley_server::run(config)
        .await
        .map_err(|e| miette::miette!("Service failed: {}", e))
}
