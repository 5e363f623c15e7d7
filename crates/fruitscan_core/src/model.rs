//! The pre-trained classifier and its class list.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InferenceError, ModelLoadError};
use crate::tensor::{InputSize, PreparedTensor};

/// Raw, unnormalized per-class scores.
pub type ScoreVector = Vec<f32>;

/// Anything that maps a prepared tensor to one score per class.
pub trait Classifier: Send + Sync {
    /// Resolution the model expects its input resized to.
    fn input_size(&self) -> InputSize;

    fn predict(&self, tensor: &PreparedTensor) -> Result<ScoreVector, InferenceError>;
}

/// Where to find the model and how to feed it.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub input_size: InputSize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("fruit_classifier_model.onnx"),
            input_size: InputSize::default(),
        }
    }
}

/// A loaded model together with the labels for its output indices.
pub struct ClassifierArtifact {
    model: Box<dyn Classifier>,
    labels: Vec<String>,
}

impl fmt::Debug for ClassifierArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierArtifact")
            .field("labels", &self.labels)
            .field("input_size", &self.model.input_size())
            .finish_non_exhaustive()
    }
}

impl ClassifierArtifact {
    pub fn new(model: Box<dyn Classifier>, labels: Vec<String>) -> Self {
        Self { model, labels }
    }

    /// Load the model at `cfg.model_path` and its `<model>_classes.txt` list.
    pub fn load(cfg: &ClassifierConfig) -> Result<Self, ModelLoadError> {
        if !cfg.model_path.exists() {
            return Err(ModelLoadError::MissingModel(cfg.model_path.clone()));
        }
        let labels = load_labels(&class_list_path(&cfg.model_path))?;
        let model = load_backend(cfg)?;
        tracing::info!(
            "classifier loaded from {} ({} classes)",
            cfg.model_path.display(),
            labels.len()
        );
        Ok(Self::new(model, labels))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn input_size(&self) -> InputSize {
        self.model.input_size()
    }

    pub fn predict(&self, tensor: &PreparedTensor) -> Result<ScoreVector, InferenceError> {
        self.model.predict(tensor)
    }
}

#[cfg(feature = "ort")]
fn load_backend(cfg: &ClassifierConfig) -> Result<Box<dyn Classifier>, ModelLoadError> {
    let model = crate::ort_backend::OrtClassifier::new(&cfg.model_path, cfg.input_size)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "ort"))]
fn load_backend(_cfg: &ClassifierConfig) -> Result<Box<dyn Classifier>, ModelLoadError> {
    Err(ModelLoadError::BackendUnavailable)
}

/// `<model_path>_classes.txt`, e.g. `model.onnx` -> `model.onnx_classes.txt`.
pub fn class_list_path(model_path: &Path) -> PathBuf {
    let mut name = OsString::from(model_path.as_os_str());
    name.push("_classes.txt");
    PathBuf::from(name)
}

/// One label per line, in output-index order. Blank lines are skipped.
pub fn load_labels(path: &Path) -> Result<Vec<String>, ModelLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Labels {
        path: path.to_path_buf(),
        source,
    })?;
    let labels: Vec<String> = raw
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect();
    if labels.is_empty() {
        return Err(ModelLoadError::NoLabels(path.to_path_buf()));
    }
    Ok(labels)
}
