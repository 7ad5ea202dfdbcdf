//! # Parley Protocol
//!
//! JSON request and response types exchanged between the Parley inference
//! service and its clients.
//!
//! ## Example
//!
//! ```json
//! {
//!   "messages": [{"role": "user", "content": "Hello"}],
//!   "temperature": 0.7,
//!   "max_tokens": 2048
//! }
//! ```

mod chat;
mod service;

pub use chat::*;
pub use service::*;

/// Path of the OpenAI-style chat completion endpoint.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Short alias of the chat completion endpoint.
pub const CHAT_ALIAS_PATH: &str = "/chat";

/// Path of the readiness endpoint.
pub const HEALTH_PATH: &str = "/health";
