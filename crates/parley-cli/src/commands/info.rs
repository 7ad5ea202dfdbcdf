//! Info command - show the configuration `serve` would use.

use parley_backend::{paths, DeviceInfo, ModelFile};
use parley_server::{ServiceConfig, LISTEN_ADDR};

pub(crate) fn run() -> miette::Result<()> {
    let config = ServiceConfig::from_env();
    let device = DeviceInfo::detect();

    println!("Parley");
    println!("======");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    for (label, value) in describe(&config, &device) {
        println!("  {:<16} {}", format!("{}:", label), value);
    }

    Ok(())
}

fn describe(config: &ServiceConfig, device: &DeviceInfo) -> Vec<(&'static str, String)> {
    let binary = paths::locate_llama_server(config.llama_server_bin.as_deref());
    let binary_status = if binary.components().count() > 1 {
        if binary.exists() { "found" } else { "missing" }
    } else {
        "looked up on PATH"
    };

    let model_file = match ModelFile::resolve(&config.model_path) {
        Ok(model) => model.path.display().to_string(),
        Err(e) => format!("not available ({})", e),
    };

    let device_desc = match &device.gpu_name {
        Some(name) => format!("{} ({})", device.device, name),
        None => device.device.to_string(),
    };

    vec![
        ("Data directory", paths::parley_data_dir().display().to_string()),
        ("llama-server", format!("{} ({})", binary.display(), binary_status)),
        ("Model path", config.model_path.display().to_string()),
        ("Model file", model_file),
        ("Device", device_desc),
        ("Backend port", config.backend_port.to_string()),
        ("Context size", config.ctx_size.to_string()),
        ("Listen address", LISTEN_ADDR.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn value<'a>(rows: &'a [(&'static str, String)], label: &str) -> &'a str {
        rows.iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn test_describe_resolved_model() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("qwen3-4b-q4_k_m.gguf");
        std::fs::write(&model, b"gguf").unwrap();

        let config = ServiceConfig::builder()
            .model_path(dir.path())
            .llama_server_bin(dir.path().join("llama-server"))
            .build();
        let rows = describe(&config, &DeviceInfo::cpu());

        assert_eq!(value(&rows, "Model file"), model.display().to_string());
        assert!(value(&rows, "llama-server").ends_with("(missing)"));
        assert_eq!(value(&rows, "Device"), "cpu");
        assert_eq!(value(&rows, "Listen address"), "0.0.0.0:8000");
    }

    #[test]
    fn test_describe_missing_model() {
        let dir = tempdir().unwrap();
        let config = ServiceConfig::builder()
            .model_path(dir.path().join("nope"))
            .build();
        let rows = describe(&config, &DeviceInfo::from_probe(true, Some("RTX 4090".into())));

        assert!(value(&rows, "Model file").starts_with("not available"));
        assert_eq!(value(&rows, "Device"), "cuda (RTX 4090)");
    }
}
