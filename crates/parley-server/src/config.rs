//! Service configuration.

use parley_backend::{DEFAULT_CTX_SIZE, DEFAULT_PORT};
use std::path::PathBuf;
use std::time::Duration;

/// Address the HTTP service listens on.
pub const LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Model location used when `MODEL_PATH` is unset.
pub const DEFAULT_MODEL_PATH: &str = "./Qwen3-4B-Instruct-2507";

const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 600;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 600;

/// Configuration for the inference service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Model file or directory
    pub model_path: PathBuf,
    /// Explicit llama-server executable (default: ~/.parley/bin, then PATH)
    pub llama_server_bin: Option<PathBuf>,
    /// Loopback port for llama-server
    pub backend_port: u16,
    /// Context window handed to llama-server
    pub ctx_size: u32,
    /// Maximum time to wait for the model to load
    pub load_timeout: Duration,
    /// Maximum time a single generation may run
    pub generation_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            llama_server_bin: None,
            backend_port: DEFAULT_PORT,
            ctx_size: DEFAULT_CTX_SIZE,
            load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let model_path = lookup("MODEL_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let llama_server_bin = lookup("LLAMA_SERVER_BIN")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let backend_port = lookup("PARLEY_BACKEND_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.backend_port);

        let ctx_size = lookup("PARLEY_CTX_SIZE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.ctx_size);

        let load_timeout = lookup("PARLEY_LOAD_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.load_timeout);

        let generation_timeout = lookup("PARLEY_GENERATION_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.generation_timeout);

        Self {
            model_path,
            llama_server_bin,
            backend_port,
            ctx_size,
            load_timeout,
            generation_timeout,
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }
}

/// Builder for service configuration.
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = path.into();
        self
    }

    pub fn llama_server_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.llama_server_bin = Some(path.into());
        self
    }

    pub fn backend_port(mut self, port: u16) -> Self {
        self.config.backend_port = port;
        self
    }

    pub fn ctx_size(mut self, ctx_size: u32) -> Self {
        self.config.ctx_size = ctx_size;
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.load_timeout = timeout;
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    pub fn build(self) -> ServiceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[]));
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.llama_server_bin, None);
        assert_eq!(config.backend_port, DEFAULT_PORT);
        assert_eq!(config.generation_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_env_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "/models/qwen3.gguf"),
            ("LLAMA_SERVER_BIN", "/opt/llama/llama-server"),
            ("PARLEY_BACKEND_PORT", "12000"),
            ("PARLEY_GENERATION_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.model_path, PathBuf::from("/models/qwen3.gguf"));
        assert_eq!(
            config.llama_server_bin,
            Some(PathBuf::from("/opt/llama/llama-server"))
        );
        assert_eq!(config.backend_port, 12000);
        assert_eq!(config.generation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("PARLEY_BACKEND_PORT", "not-a-port"),
            ("PARLEY_CTX_SIZE", "-5"),
        ]));
        assert_eq!(config.backend_port, DEFAULT_PORT);
        assert_eq!(config.ctx_size, DEFAULT_CTX_SIZE);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServiceConfig::builder()
            .model_path("/tmp/model.gguf")
            .generation_timeout(Duration::from_millis(250))
            .build();
        assert_eq!(config.model_path, PathBuf::from("/tmp/model.gguf"));
        assert_eq!(config.generation_timeout, Duration::from_millis(250));
        assert_eq!(config.ctx_size, DEFAULT_CTX_SIZE);
    }
}
