//! Interactive chat client for the Parley service.
//!
//! The conversation lives on the client: every request carries the whole
//! history, and the service keeps no per-session state.

mod client;
mod command;
mod conversation;
mod error;
mod input;
mod repl;

#[cfg(test)]
mod mock_service;

pub use client::{ChatClient, ChatSession, ClientConfig, TurnReply, DEFAULT_API_URL};
pub use command::{Command, HELP_LINES};
pub use conversation::Conversation;
pub use error::ClientError;
pub use input::{ChannelLines, LineSource};
pub use repl::Repl;

use tokio_util::sync::CancellationToken;

/// Run the chat loop on the terminal against `config.api_url`.
///
/// Ctrl-C ends the session even while a line is being read.
pub async fn run_interactive(config: ClientConfig) -> Result<(), ClientError> {
    let session = ChatSession::new(ChatClient::new(config));
    let input = ChannelLines::stdin()?;

    let interrupt = CancellationToken::new();
    let on_ctrl_c = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    Repl::new(session, input, std::io::stdout())
        .with_interrupt(interrupt)
        .run()
        .await
}
