//! Path utilities for Parley data directories.

use std::path::{Path, PathBuf};

/// Get the Parley data directory (~/.parley/).
pub fn parley_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}

/// Get the bin directory (~/.parley/bin/).
pub fn bin_dir() -> PathBuf {
    parley_data_dir().join("bin")
}

/// File name of the llama-server executable on this platform.
pub fn llama_server_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "llama-server.exe"
    } else {
        "llama-server"
    }
}

/// Get the path of a llama-server installed under the data directory.
pub fn bundled_llama_server_path() -> PathBuf {
    bin_dir().join(llama_server_binary_name())
}

/// Pick the llama-server executable to launch.
///
/// An explicit path wins. Otherwise the copy under `~/.parley/bin/` is used
/// when present, falling back to a bare name resolved through `PATH`.
pub fn locate_llama_server(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let bundled = bundled_llama_server_path();
    if bundled.exists() {
        bundled
    } else {
        PathBuf::from(llama_server_binary_name())
    }
}
