//! ONNX Runtime implementation of [`Classifier`].

use ndarray::CowArray;
use once_cell::sync::Lazy;
use ort::{
    GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
    tensor::OrtOwnedTensor, value::Value,
};
use std::path::Path;
use std::sync::Arc;

use crate::error::{InferenceError, ModelLoadError};
use crate::model::{Classifier, ScoreVector};
use crate::tensor::{InputSize, PreparedTensor};

static ORT_ENV: Lazy<Result<Arc<Environment>, String>> = Lazy::new(|| {
    Environment::builder()
        .with_name("fruitscan")
        .build()
        .map(|env| env.into_arc())
        .map_err(|e| e.to_string())
});

pub struct OrtClassifier {
    session: Session,
    input_size: InputSize,
}

impl OrtClassifier {
    pub fn new(model_path: &Path, input_size: InputSize) -> Result<Self, ModelLoadError> {
        let env = ORT_ENV.clone().map_err(ModelLoadError::Backend)?;
        let session = SessionBuilder::new(&env)
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
            .and_then(|b| b.with_model_from_file(model_path))
            .map_err(|e| ModelLoadError::Backend(e.to_string()))?;
        Ok(Self {
            session,
            input_size,
        })
    }
}

impl Classifier for OrtClassifier {
    fn input_size(&self) -> InputSize {
        self.input_size
    }

    fn predict(&self, tensor: &PreparedTensor) -> Result<ScoreVector, InferenceError> {
        let backend = |e: ort::OrtError| InferenceError::Backend(e.to_string());
        let input_array = tensor.view().into_dyn();
        let cow = CowArray::from(input_array);
        let input = Value::from_array(self.session.allocator(), &cow).map_err(backend)?;
        let outputs: Vec<Value> = self.session.run(vec![input]).map_err(backend)?;
        let Some(first) = outputs.first() else {
            return Err(InferenceError::NoOutput);
        };
        let logits: OrtOwnedTensor<f32, _> = first.try_extract().map_err(backend)?;
        let scores: ScoreVector = logits.view().iter().copied().collect();
        if scores.is_empty() {
            return Err(InferenceError::NoOutput);
        }
        Ok(scores)
    }
}
