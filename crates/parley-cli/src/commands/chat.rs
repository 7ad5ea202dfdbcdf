//! Chat command - interactive conversation with a running service.

use parley_client::ClientConfig;

pub(crate) async fn run() -> miette::Result<()> {
    parley_client::run_interactive(ClientConfig::default())
        .await
        .map_err(|e| miette::miette!("{}", e))
}
