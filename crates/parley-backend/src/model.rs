//! Model file resolution.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::BackendError;

/// Extension of model files the runtime can load.
pub const MODEL_EXTENSION: &str = "gguf";

/// A model file on disk, ready to hand to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    /// Display name of the model.
    pub name: String,
    /// Path of the weights file.
    pub path: PathBuf,
}

impl ModelFile {
    /// Resolve a configured model location.
    ///
    /// A file is used as is. A directory is searched for `.gguf` files and
    /// the first one in lexical order is taken; the model is then named
    /// after the directory.
    pub fn resolve(location: &Path) -> Result<Self, BackendError> {
        if !location.exists() {
            return Err(BackendError::ModelNotFound(location.to_path_buf()));
        }

        if location.is_file() {
            return Ok(Self {
                name: display_name(location, true),
                path: location.to_path_buf(),
            });
        }

        let mut candidates: Vec<PathBuf> = fs::read_dir(location)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_model_file(path))
            .collect();
        candidates.sort();

        debug!(
            "Found {} model file(s) in {}",
            candidates.len(),
            location.display()
        );

        let path = candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NoModelFile(location.to_path_buf()))?;

        Ok(Self {
            name: display_name(location, false),
            path,
        })
    }
}

/// Check whether a path carries the model file extension.
pub fn is_model_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(MODEL_EXTENSION))
        .unwrap_or(false)
}

/// Human-readable model name for a configured location.
///
/// Files are named by their stem, directories (or missing paths) by their
/// last component.
pub fn model_display_name(location: &Path) -> String {
    display_name(location, location.is_file())
}

fn display_name(location: &Path, is_file: bool) -> String {
    let name = if is_file {
        location.file_stem()
    } else {
        location.file_name()
    };

    name.and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| location.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = ModelFile::resolve(&missing);
        assert!(matches!(result, Err(BackendError::ModelNotFound(p)) if p == missing));
    }

    #[test]
    fn test_file_used_directly() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("qwen3-4b-q4.gguf");
        fs::write(&file, b"gguf").unwrap();

        let model = ModelFile::resolve(&file).unwrap();
        assert_eq!(model.path, file);
        assert_eq!(model.name, "qwen3-4b-q4");
    }

    #[test]
    fn test_directory_picks_first_gguf() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("Qwen3-4B-Instruct-2507");
        fs::create_dir(&model_dir).unwrap();
        fs::write(model_dir.join("config.json"), b"{}").unwrap();
        fs::write(model_dir.join("b-q8_0.gguf"), b"gguf").unwrap();
        fs::write(model_dir.join("a-q4_k_m.GGUF"), b"gguf").unwrap();

        let model = ModelFile::resolve(&model_dir).unwrap();
        assert_eq!(model.name, "Qwen3-4B-Instruct-2507");
        assert_eq!(model.path, model_dir.join("a-q4_k_m.GGUF"));
    }

    #[test]
    fn test_display_name_of_missing_path() {
        assert_eq!(
            model_display_name(Path::new("./Qwen3-4B-Instruct-2507")),
            "Qwen3-4B-Instruct-2507"
        );
    }

    #[test]
    fn test_directory_without_model() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tokenizer.json"), b"{}").unwrap();

        let result = ModelFile::resolve(dir.path());
        assert!(matches!(result, Err(BackendError::NoModelFile(_))));
    }
}
