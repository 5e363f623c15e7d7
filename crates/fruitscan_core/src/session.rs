//! Sequences loading, classification and history into one workflow.

use image::{DynamicImage, RgbImage};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ClassificationError, ClassifyError, ImageLoadError};
use crate::history::{HistoryRecord, HistoryStore};
use crate::interpret::{ClassificationResult, interpret};
use crate::model::ClassifierArtifact;
use crate::normalize::{CANVAS_SIZE, load_image, placeholder_canvas};
use crate::tensor::prepare_tensor;

/// How many history entries the session exposes for display.
pub const RECENT_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ImageLoaded,
    Classifying,
    ResultReady,
    Failed,
}

/// Checkpoints reported while a classification runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Progress {
    Started,
    Preprocessed,
    Inferred,
    Done,
}

impl Progress {
    /// Value for a determinate progress bar.
    pub fn percent(self) -> u8 {
        match self {
            Progress::Started => 0,
            Progress::Preprocessed => 30,
            Progress::Inferred => 60,
            Progress::Done => 100,
        }
    }
}

/// Self-contained inference work, safe to run off the control thread.
pub struct ClassifyJob {
    artifact: Arc<ClassifierArtifact>,
    image: Arc<DynamicImage>,
}

impl ClassifyJob {
    /// Preprocess, predict and interpret. Reports every checkpoint up to
    /// [`Progress::Inferred`]; `Done` is reported once the result is recorded.
    pub fn run<F>(&self, mut progress: F) -> Result<ClassificationResult, ClassificationError>
    where
        F: FnMut(Progress),
    {
        progress(Progress::Started);
        let tensor = prepare_tensor(&self.image, self.artifact.input_size())?;
        progress(Progress::Preprocessed);
        let scores = self.artifact.predict(&tensor)?;
        progress(Progress::Inferred);
        Ok(interpret(&scores, self.artifact.labels())?)
    }
}

/// One user's classification session.
pub struct Session {
    artifact: Arc<ClassifierArtifact>,
    history: HistoryStore,
    state: SessionState,
    image: Option<Arc<DynamicImage>>,
    canvas: RgbImage,
    last_result: Option<ClassificationResult>,
    canvas_size: u32,
    recent_count: usize,
}

impl Session {
    pub fn new(artifact: Arc<ClassifierArtifact>, history: HistoryStore) -> Self {
        Self {
            artifact,
            history,
            state: SessionState::Idle,
            image: None,
            canvas: placeholder_canvas(CANVAS_SIZE),
            last_result: None,
            canvas_size: CANVAS_SIZE,
            recent_count: RECENT_COUNT,
        }
    }

    pub fn with_canvas_size(mut self, size: u32) -> Self {
        self.canvas_size = size;
        self.canvas = placeholder_canvas(size);
        self
    }

    pub fn with_recent_count(mut self, n: usize) -> Self {
        self.recent_count = n;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Canvas to display: the loaded image, or a blank placeholder.
    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn last_result(&self) -> Option<&ClassificationResult> {
        self.last_result.as_ref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The last few history records, oldest first.
    pub fn recent_history(&self) -> &[HistoryRecord] {
        self.history.recent(self.recent_count)
    }

    /// Whether [`Session::classify`] would be accepted right now.
    pub fn can_classify(&self) -> bool {
        self.image.is_some() && self.state != SessionState::Classifying
    }

    /// Decode `path` and make it the working image.
    ///
    /// On failure the session moves to `Failed` but keeps any image loaded
    /// earlier, so the user can still classify it.
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<(), ImageLoadError> {
        if self.state == SessionState::Classifying {
            return Err(ImageLoadError::Busy);
        }
        match load_image(path.as_ref(), self.canvas_size) {
            Ok(loaded) => {
                tracing::info!("image loaded: {}", path.as_ref().display());
                self.image = Some(Arc::new(loaded.original));
                self.canvas = loaded.canvas;
                self.last_result = None;
                self.state = SessionState::ImageLoaded;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("image load failed: {e}");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Enter `Classifying` and hand out the work to perform.
    ///
    /// Rejected without a state change when no image is loaded or another
    /// classification is still in flight.
    pub fn begin_classify(&mut self) -> Result<ClassifyJob, ClassifyError> {
        if self.state == SessionState::Classifying {
            return Err(ClassifyError::InFlight);
        }
        let Some(image) = self.image.clone() else {
            return Err(ClassifyError::NotReady(self.state));
        };
        self.state = SessionState::Classifying;
        Ok(ClassifyJob {
            artifact: Arc::clone(&self.artifact),
            image,
        })
    }

    /// Record the outcome of a job started with [`Session::begin_classify`].
    ///
    /// Outside `Classifying` the outcome is discarded with
    /// [`ClassificationError::NotInFlight`]; state and history are untouched.
    pub fn finish_classify(
        &mut self,
        outcome: Result<ClassificationResult, ClassificationError>,
    ) -> Result<ClassificationResult, ClassificationError> {
        if self.state != SessionState::Classifying {
            tracing::warn!("discarding outcome, session is {:?}", self.state);
            return Err(ClassificationError::NotInFlight(self.state));
        }
        match outcome {
            Ok(result) => {
                tracing::info!("classified as {result}");
                self.history.append(HistoryRecord::now(&result));
                self.last_result = Some(result.clone());
                self.state = SessionState::ResultReady;
                Ok(result)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub(crate) fn fail(&mut self, e: ClassificationError) -> ClassificationError {
        tracing::warn!("classification failed: {e}");
        self.last_result = None;
        self.state = SessionState::Failed;
        e
    }

    /// Classify the working image on the calling thread.
    pub fn classify<F>(&mut self, mut progress: F) -> Result<ClassificationResult, ClassifyError>
    where
        F: FnMut(Progress),
    {
        let job = self.begin_classify()?;
        let outcome = job.run(&mut progress);
        let result = self.finish_classify(outcome)?;
        progress(Progress::Done);
        Ok(result)
    }
}
