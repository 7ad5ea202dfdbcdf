//! Error types for model backend operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or invoking the model runtime.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Runtime returned an error response.
    #[error("runtime error: {0}")]
    Api(String),

    /// Runtime is not running or not reachable.
    #[error("llama-server not reachable at {0}")]
    ServerNotRunning(String),

    /// Runtime process failed to start.
    #[error("failed to start llama-server: {0}")]
    ServerStartFailed(String),

    /// Runtime process died unexpectedly.
    #[error("llama-server process died: {0}")]
    ServerDied(String),

    /// Model path does not exist.
    #[error("model path does not exist: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Model directory holds no loadable model file.
    #[error("no .gguf model file found in {}", .0.display())]
    NoModelFile(PathBuf),

    /// llama-server binary not found.
    #[error("llama-server binary not found at {0}. Set LLAMA_SERVER_BIN or install llama.cpp")]
    ServerBinaryNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for the model to load.
    #[error("timeout waiting for llama-server to load the model")]
    ServerStartTimeout,

    /// Generation was cancelled before it finished.
    #[error("generation cancelled")]
    Cancelled,
}
