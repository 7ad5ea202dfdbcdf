//! Process manager for llama-server.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::LlamaCppClient;
use crate::error::BackendError;
use crate::{DEFAULT_CTX_SIZE, DEFAULT_PORT};

/// Time a stopped server gets to exit before it is killed.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Manager for the llama-server process.
#[derive(Debug)]
pub struct LlamaCppServer {
    binary: PathBuf,
    model: PathBuf,
    port: u16,
    ctx_size: u32,
    gpu_layers: u32,
    process: Option<Child>,
}

impl LlamaCppServer {
    /// Create a new server manager with default settings.
    pub fn new(binary: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            port: DEFAULT_PORT,
            ctx_size: DEFAULT_CTX_SIZE,
            gpu_layers: 0,
            process: None,
        }
    }

    /// Set a custom port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the context window size.
    pub fn with_ctx_size(mut self, ctx_size: u32) -> Self {
        self.ctx_size = ctx_size;
        self
    }

    /// Set how many layers are offloaded to the GPU.
    pub fn with_gpu_layers(mut self, gpu_layers: u32) -> Self {
        self.gpu_layers = gpu_layers;
        self
    }

    /// Get the port this server is configured to use.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// PID of the running process, if started.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().map(|child| child.id())
    }

    /// Command-line arguments passed to llama-server.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--model".to_string(),
            self.model.display().to_string(),
            "--host".to_string(),
            "127.0.0.1".to_string(),
            "--port".to_string(),
            self.port.to_string(),
            "--ctx-size".to_string(),
            self.ctx_size.to_string(),
            "--n-gpu-layers".to_string(),
            self.gpu_layers.to_string(),
        ]
    }

    /// Start the llama-server process.
    pub fn start(&mut self) -> Result<(), BackendError> {
        // A bare name is looked up on PATH by the OS; only check explicit paths.
        if is_explicit_path(&self.binary) && !self.binary.exists() {
            return Err(BackendError::ServerBinaryNotFound(
                self.binary.display().to_string(),
            ));
        }

        if !self.model.exists() {
            return Err(BackendError::ModelNotFound(self.model.clone()));
        }

        info!(
            "Starting llama-server on port {} with model {}",
            self.port,
            self.model.display()
        );

        let child = Command::new(&self.binary)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BackendError::ServerBinaryNotFound(self.binary.display().to_string())
                } else {
                    BackendError::ServerStartFailed(e.to_string())
                }
            })?;

        debug!("llama-server process started with PID: {}", child.id());
        self.process = Some(child);

        Ok(())
    }

    /// Wait for the server to finish loading the model.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), BackendError> {
        let client = self.client();
        let start = Instant::now();
        let check_interval = Duration::from_millis(500);

        info!("Waiting for llama-server to load the model...");

        while start.elapsed() < timeout {
            match client.check_health().await {
                Ok(()) => {
                    info!(
                        "llama-server is ready after {:.1}s",
                        start.elapsed().as_secs_f64()
                    );
                    return Ok(());
                }
                Err(e) => {
                    if let Some(status) = self.exit_status()? {
                        return Err(BackendError::ServerDied(status));
                    }
                    debug!("Server not ready yet: {}", e);
                    sleep(check_interval).await;
                }
            }
        }

        Err(BackendError::ServerStartTimeout)
    }

    /// Stop the server process without blocking the runtime.
    ///
    /// Sends SIGTERM, waits up to half a second for the process to exit and
    /// kills it otherwise.
    pub async fn shutdown(&mut self) -> Result<(), BackendError> {
        let Some(mut child) = self.process.take() else {
            return Ok(());
        };
        info!("Stopping llama-server (PID: {})", child.id());

        #[cfg(unix)]
        unsafe {
            libc::kill(child.id() as i32, libc::SIGTERM);
        }

        let start = Instant::now();
        while start.elapsed() < STOP_GRACE {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Server exited with status: {:?}", status);
                    return Ok(());
                }
                Ok(None) => sleep(Duration::from_millis(50)).await,
                Err(e) => {
                    warn!("Error checking server status: {}", e);
                    break;
                }
            }
        }

        warn!("Server didn't exit gracefully, killing...");
        let _ = child.kill();
        let _ = child.wait();
        Ok(())
    }

    /// Stop the server process, blocking the calling thread.
    pub fn stop(&mut self) -> Result<(), BackendError> {
        if let Some(mut child) = self.process.take() {
            info!("Stopping llama-server (PID: {})", child.id());

            // Try graceful shutdown first
            #[cfg(unix)]
            {
                unsafe {
                    libc::kill(child.id() as i32, libc::SIGTERM);
                }
                std::thread::sleep(STOP_GRACE);
            }

            // Force kill if still running
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Server exited with status: {:?}", status);
                }
                Ok(None) => {
                    warn!("Server didn't exit gracefully, killing...");
                    let _ = child.kill();
                    let _ = child.wait();
                }
                Err(e) => {
                    warn!("Error checking server status: {}", e);
                    let _ = child.kill();
                }
            }
        }
        Ok(())
    }

    /// Check if the server process is running.
    pub fn is_running(&mut self) -> bool {
        self.process.is_some() && matches!(self.exit_status(), Ok(None))
    }

    /// Get a client connected to this server.
    pub fn client(&self) -> LlamaCppClient {
        LlamaCppClient::with_port(self.port)
    }

    /// Exit status of a process that has already terminated.
    fn exit_status(&mut self) -> Result<Option<String>, BackendError> {
        let Some(child) = self.process.as_mut() else {
            return Ok(None);
        };

        match child.try_wait()? {
            Some(status) => {
                self.process = None;
                Ok(Some(status.to_string()))
            }
            None => Ok(None),
        }
    }
}

impl Drop for LlamaCppServer {
    fn drop(&mut self) {
        if self.process.is_none() {
            return;
        }

        // `stop` sleeps; keep it off the async worker threads.
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| {
                    let _ = self.stop();
                });
            }
            _ => {
                let _ = self.stop();
            }
        }
    }
}

fn is_explicit_path(binary: &Path) -> bool {
    binary.components().count() > 1 || binary.is_absolute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_server_config() {
        let server = LlamaCppServer::new("llama-server", "model.gguf")
            .with_port(9999)
            .with_ctx_size(4096)
            .with_gpu_layers(999);
        assert_eq!(server.port(), 9999);
        assert_eq!(server.pid(), None);

        let args = server.args();
        let pairs: Vec<_> = args.chunks(2).map(|c| (c[0].as_str(), c[1].as_str())).collect();
        assert!(pairs.contains(&("--port", "9999")));
        assert!(pairs.contains(&("--ctx-size", "4096")));
        assert!(pairs.contains(&("--n-gpu-layers", "999")));
        assert!(pairs.contains(&("--host", "127.0.0.1")));
    }

    #[test]
    fn test_missing_binary() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.gguf");
        std::fs::write(&model, b"gguf").unwrap();

        let mut server = LlamaCppServer::new(dir.path().join("bin/llama-server"), &model);
        let result = server.start();
        assert!(matches!(result, Err(BackendError::ServerBinaryNotFound(_))));
        assert!(!server.is_running());
    }

    #[test]
    fn test_missing_model() {
        let dir = tempdir().unwrap();
        let mut server = LlamaCppServer::new("llama-server", dir.path().join("missing.gguf"));
        let result = server.start();
        assert!(matches!(result, Err(BackendError::ModelNotFound(_))));
    }

    #[test]
    fn test_explicit_path_detection() {
        assert!(!is_explicit_path(Path::new("llama-server")));
        assert!(is_explicit_path(Path::new("./llama-server")));
        assert!(is_explicit_path(Path::new("/usr/local/bin/llama-server")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_reported() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.gguf");
        std::fs::write(&model, b"gguf").unwrap();

        // `false` ignores its arguments and exits non-zero immediately.
        let unused_port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut server = LlamaCppServer::new("false", &model).with_port(unused_port);
        server.start().unwrap();

        let result = server.wait_ready(Duration::from_secs(10)).await;
        assert!(matches!(result, Err(BackendError::ServerDied(_))));
        assert!(!server.is_running());
    }

    /// Writes an executable that ignores its arguments and sleeps.
    #[cfg(unix)]
    fn sleeper(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-llama-server");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_terminates_process() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.gguf");
        std::fs::write(&model, b"gguf").unwrap();

        let mut server = LlamaCppServer::new(sleeper(dir.path()), &model);
        server.start().unwrap();
        assert!(server.is_running());

        let start = Instant::now();
        server.shutdown().await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(!server.is_running());
        assert_eq!(server.pid(), None);

        // A second shutdown is a no-op.
        server.shutdown().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_inside_multi_thread_runtime() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.gguf");
        std::fs::write(&model, b"gguf").unwrap();

        let mut server = LlamaCppServer::new(sleeper(dir.path()), &model);
        server.start().unwrap();
        let pid = server.pid().unwrap();
        drop(server);

        // Reaped by `stop`, so the pid no longer refers to our child.
        let alive = unsafe { libc::kill(pid as i32, 0) } == 0;
        assert!(!alive);
    }
}
