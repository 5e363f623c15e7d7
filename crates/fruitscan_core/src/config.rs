use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::HISTORY_CAPACITY;
use crate::model::ClassifierConfig;
use crate::normalize::CANVAS_SIZE;
use crate::session::RECENT_COUNT;
use crate::tensor::InputSize;

/// Environment variable overriding [`AppConfig::model_path`].
pub const MODEL_ENV: &str = "FRUITSCAN_MODEL";

/// Application settings, read from `fruitscan.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub history_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub canvas_size: u32,
    pub history_capacity: usize,
    pub recent_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let classifier = ClassifierConfig::default();
        Self {
            model_path: classifier.model_path,
            history_path: PathBuf::from("classification_history.json"),
            input_width: classifier.input_size.width,
            input_height: classifier.input_size.height,
            canvas_size: CANVAS_SIZE,
            history_capacity: HISTORY_CAPACITY,
            recent_count: RECENT_COUNT,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("invalid configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    /// Sizes and the history capacity must be non-zero.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.canvas_size > 0, "canvas_size must be at least 1");
        ensure!(
            self.input_width > 0 && self.input_height > 0,
            "input size must be non-zero, got {}x{}",
            self.input_width,
            self.input_height
        );
        ensure!(self.history_capacity > 0, "history_capacity must be at least 1");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Apply `FRUITSCAN_MODEL` if it is set.
    pub fn with_env_overrides(self) -> Self {
        self.with_model_override(std::env::var(MODEL_ENV).ok())
    }

    pub fn with_model_override(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            self.model_path = PathBuf::from(model);
        }
        self
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            model_path: self.model_path.clone(),
            input_size: InputSize {
                width: self.input_width,
                height: self.input_height,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn empty_file_gives_defaults() -> Result<()> {
        assert_eq!(AppConfig::from_toml_str("")?, AppConfig::default());
        Ok(())
    }

    #[test]
    fn partial_file_overrides_only_given_fields() -> Result<()> {
        let cfg = AppConfig::from_toml_str(
            r#"
            model_path = "models/fruits.onnx"
            input_width = 224
            input_height = 224
            "#,
        )?;
        assert_eq!(cfg.model_path, PathBuf::from("models/fruits.onnx"));
        assert_eq!(
            cfg.classifier().input_size,
            InputSize {
                width: 224,
                height: 224
            }
        );
        assert_eq!(cfg.history_path, PathBuf::from("classification_history.json"));
        assert_eq!(cfg.history_capacity, 50);
        assert_eq!(cfg.recent_count, 10);
        Ok(())
    }

    #[rstest]
    #[case("canvas_size = 0", "canvas_size")]
    #[case("input_width = 0", "input size")]
    #[case("input_height = 0", "input size")]
    #[case("history_capacity = 0", "history_capacity")]
    fn zero_sizes_are_rejected(#[case] toml: &str, #[case] field: &str) {
        let err = AppConfig::from_toml_str(toml).unwrap_err();
        assert!(format!("{err:#}").contains(field), "{err:#}");
    }

    #[test]
    fn zero_recent_count_is_allowed() -> Result<()> {
        assert_eq!(AppConfig::from_toml_str("recent_count = 0")?.recent_count, 0);
        Ok(())
    }

    #[test]
    fn load_rejects_zero_canvas_with_file_context() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fruitscan.toml");
        fs::write(&path, "canvas_size = 0\n")?;
        let err = AppConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("fruitscan.toml"));
        Ok(())
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(AppConfig::from_toml_str("canvas_size = \"big\"").is_err());
    }

    #[test]
    fn load_reads_from_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fruitscan.toml");
        fs::write(&path, "history_path = \"/tmp/h.json\"\n")?;
        let cfg = AppConfig::load(&path)?;
        assert_eq!(cfg.history_path, PathBuf::from("/tmp/h.json"));
        assert!(AppConfig::load(dir.path().join("missing.toml")).is_err());
        Ok(())
    }

    #[test]
    fn model_override_ignores_blank_values() {
        let cfg = AppConfig::default().with_model_override(Some("  ".into()));
        assert_eq!(cfg.model_path, AppConfig::default().model_path);
        let cfg = AppConfig::default().with_model_override(Some("other.onnx".into()));
        assert_eq!(cfg.model_path, PathBuf::from("other.onnx"));
    }
}
