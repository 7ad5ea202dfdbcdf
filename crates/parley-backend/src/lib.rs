//! Model capability for Parley using llama.cpp.
//!
//! The service never touches weights or tokenizers itself. This crate
//! launches a `llama-server` process for the configured model, waits for it
//! to load, and exposes it through the [`TextGenerator`] trait.

mod backend;
mod client;
mod device;
mod error;
mod generator;
mod model;
pub mod paths;
mod server;

pub use backend::{LaunchOptions, LlamaCppBackend};
pub use client::LlamaCppClient;
pub use device::{Device, DeviceInfo};
pub use error::BackendError;
pub use generator::{Generation, GenerationParams, TextGenerator, TokenId};
pub use model::{is_model_file, model_display_name, ModelFile, MODEL_EXTENSION};
pub use server::LlamaCppServer;

pub use tokio_util::sync::CancellationToken;

/// Default loopback port for the llama-server instance.
pub const DEFAULT_PORT: u16 = 11435;

/// Default context window handed to llama-server.
pub const DEFAULT_CTX_SIZE: u32 = 8192;
