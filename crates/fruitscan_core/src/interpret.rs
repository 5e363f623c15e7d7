//! Turns raw classifier scores into a label and a confidence.

use std::fmt;

use crate::error::{ClassNameMismatchError, InterpretError};

/// Predicted class with its softmax confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    /// Position of `label` in the class list.
    pub index: usize,
    /// 100 x softmax probability, in [0, 100].
    pub confidence_percent: f64,
}

impl ClassificationResult {
    /// Confidence as shown to the user and stored in history, e.g. `"97.31%"`.
    pub fn confidence_display(&self) -> String {
        format!("{:.2}%", self.confidence_percent)
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.confidence_display())
    }
}

/// Numerically stable softmax. Computed in f64 so the sum stays within 1e-6.
pub fn softmax(scores: &[f32]) -> Vec<f64> {
    let max = scores
        .iter()
        .map(|&s| f64::from(s))
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (f64::from(s) - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; on exact ties the lowest index wins.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Map a score vector onto `labels`.
pub fn interpret(scores: &[f32], labels: &[String]) -> Result<ClassificationResult, InterpretError> {
    if scores.is_empty() {
        return Err(InterpretError::Empty);
    }
    if scores.len() != labels.len() {
        return Err(ClassNameMismatchError {
            scores: scores.len(),
            labels: labels.len(),
        }
        .into());
    }
    if let Some(idx) = scores.iter().position(|s| !s.is_finite()) {
        return Err(InterpretError::NonFinite(idx));
    }
    let probs = softmax(scores);
    let index = argmax(&probs).ok_or(InterpretError::Empty)?;
    let confidence_percent = (probs[index] * 100.0).clamp(0.0, 100.0);
    Ok(ClassificationResult {
        label: labels[index].clone(),
        index,
        confidence_percent,
    })
}
