//! Classification session pipeline: load a picture, classify it with a
//! pre-trained model, and keep a bounded history of the outcomes.

pub mod config;
pub mod error;
pub mod history;
pub mod interpret;
pub mod model;
pub mod normalize;
#[cfg(feature = "ort")]
mod ort_backend;
pub mod session;
pub mod tensor;
pub mod worker;

pub use config::AppConfig;
pub use error::{
    ClassNameMismatchError, ClassificationError, ClassifyError, HistoryPersistError,
    ImageLoadError, ModelLoadError,
};
pub use history::{HistoryRecord, HistoryStore, export_csv};
pub use interpret::ClassificationResult;
pub use model::{Classifier, ClassifierArtifact, ClassifierConfig, ScoreVector};
pub use normalize::{NormalizedImage, SUPPORTED_EXTENSIONS, load_image};
pub use session::{Progress, Session, SessionState};
pub use tensor::{InputSize, PreparedTensor};
pub use worker::{ClassifyTask, TaskPoll};
