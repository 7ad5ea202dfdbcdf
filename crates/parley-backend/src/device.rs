//! Compute device detection.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Compute device the model is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }

    /// Number of model layers to offload to the accelerator.
    pub fn gpu_layers(&self) -> u32 {
        match self {
            Device::Cpu => 0,
            Device::Cuda => 999,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of probing the host for an accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device: Device,
    pub cuda_available: bool,
    /// Name of the first GPU, when the driver exposes it.
    pub gpu_name: Option<String>,
}

impl DeviceInfo {
    /// Probe the host once.
    pub fn detect() -> Self {
        let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
        let cuda_available = cuda_visible(visible.as_deref()) && nvidia_driver_present();

        Self::from_probe(cuda_available, if cuda_available { gpu_name() } else { None })
    }

    /// Build device info from an already-known probe result.
    pub fn from_probe(cuda_available: bool, gpu_name: Option<String>) -> Self {
        Self {
            device: if cuda_available {
                Device::Cuda
            } else {
                Device::Cpu
            },
            cuda_available,
            gpu_name,
        }
    }

    pub fn cpu() -> Self {
        Self::from_probe(false, None)
    }
}

fn cuda_visible(visible_devices: Option<&str>) -> bool {
    match visible_devices.map(str::trim) {
        Some("") | Some("-1") => false,
        _ => true,
    }
}

fn nvidia_driver_present() -> bool {
    Path::new("/proc/driver/nvidia/version").exists() || Path::new("/dev/nvidia0").exists()
}

fn gpu_name() -> Option<String> {
    let gpus = fs::read_dir("/proc/driver/nvidia/gpus").ok()?;
    for entry in gpus.filter_map(|e| e.ok()) {
        let Ok(info) = fs::read_to_string(entry.path().join("information")) else {
            continue;
        };
        if let Some(name) = parse_gpu_model(&info) {
            return Some(name);
        }
    }
    None
}

fn parse_gpu_model(information: &str) -> Option<String> {
    information
        .lines()
        .find_map(|line| line.strip_prefix("Model:"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_selects_device() {
        let info = DeviceInfo::from_probe(true, Some("NVIDIA A10".to_string()));
        assert_eq!(info.device, Device::Cuda);
        assert_eq!(info.device.gpu_layers(), 999);

        let info = DeviceInfo::cpu();
        assert_eq!(info.device, Device::Cpu);
        assert!(!info.cuda_available);
        assert_eq!(info.device.gpu_layers(), 0);
    }

    #[test]
    fn test_cuda_visible_devices() {
        assert!(cuda_visible(None));
        assert!(cuda_visible(Some("0,1")));
        assert!(!cuda_visible(Some("")));
        assert!(!cuda_visible(Some("-1")));
    }

    #[test]
    fn test_parse_gpu_model() {
        let info = "Model: \t\t NVIDIA GeForce RTX 4090\nIRQ:   \t\t 139\n";
        assert_eq!(
            parse_gpu_model(info),
            Some("NVIDIA GeForce RTX 4090".to_string())
        );
        assert_eq!(parse_gpu_model("IRQ: 1"), None);
    }
}
