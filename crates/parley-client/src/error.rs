//! Client-side errors.

use thiserror::Error;

/// Errors from talking to the Parley service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out, please try again later")]
    Timeout,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
    #[error("service not ready after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(e)
        }
    }
}
