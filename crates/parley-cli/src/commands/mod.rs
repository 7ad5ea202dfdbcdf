//! CLI commands.

pub mod chat;
pub mod info;
pub mod serve;
