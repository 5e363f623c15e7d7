//! Error kinds, one per pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionState;

/// The classifier artifact could not be loaded. Fatal: no session starts.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file is missing: {}", .0.display())]
    MissingModel(PathBuf),
    #[error("cannot read class list {}: {source}", path.display())]
    Labels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("class list {} contains no labels", .0.display())]
    NoLabels(PathBuf),
    #[error("inference backend failed to load the model: {0}")]
    Backend(String),
    #[error("built without an inference backend; enable the `ort` feature")]
    BackendUnavailable,
}

/// An image file could not be opened as a picture.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("cannot load an image while a classification is running")]
    Busy,
    #[error("unsupported image type: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("cannot read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("invalid classifier input size {width}x{height}")]
    InvalidInputSize { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model produced no output")]
    NoOutput,
    #[error("inference failed: {0}")]
    Backend(String),
}

/// The classifier's output length does not match the class list.
#[derive(Debug, Error)]
#[error("classifier produced {scores} scores but the class list has {labels} labels")]
pub struct ClassNameMismatchError {
    pub scores: usize,
    pub labels: usize,
}

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("score vector is empty")]
    Empty,
    #[error("score at index {0} is not finite")]
    NonFinite(usize),
    #[error(transparent)]
    ClassNameMismatch(#[from] ClassNameMismatchError),
}

/// A classification run failed after it started. Recoverable.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("result interpretation failed: {0}")]
    Interpret(#[from] InterpretError),
    #[error("classification worker could not start: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("classification worker stopped before reporting a result")]
    WorkerLost,
    #[error("no classification in flight (session is {0:?}); outcome discarded")]
    NotInFlight(SessionState),
}

/// `classify()` was rejected before any work was done.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("no image loaded (session is {0:?})")]
    NotReady(SessionState),
    #[error("a classification is already running")]
    InFlight,
    #[error(transparent)]
    Failed(#[from] ClassificationError),
}

/// Writing the history file failed. Logged, never propagated to callers.
#[derive(Debug, Error)]
pub enum HistoryPersistError {
    #[error("cannot serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write history to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A history record with malformed fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRecord {
    #[error("bad timestamp {0:?}, expected YYYY-MM-DD HH:MM:SS")]
    Date(String),
    #[error("bad confidence {0:?}, expected NN.NN%")]
    Confidence(String),
    #[error("empty prediction")]
    EmptyPrediction,
}
