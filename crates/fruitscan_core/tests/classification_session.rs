use anyhow::Result;
use approx::assert_abs_diff_eq;
use fruitscan_core::error::InferenceError;
use fruitscan_core::{
    Classifier, ClassifierArtifact, ClassifyError, HistoryStore, InputSize, PreparedTensor,
    ScoreVector, Session, SessionState,
};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

struct FixtureClassifier;

impl Classifier for FixtureClassifier {
    fn input_size(&self) -> InputSize {
        InputSize {
            width: 100,
            height: 100,
        }
    }

    fn predict(&self, _tensor: &PreparedTensor) -> Result<ScoreVector, InferenceError> {
        Ok(vec![2.0, 5.0, 1.0])
    }
}

fn fixture_labels() -> Vec<String> {
    vec!["Apple".into(), "Banana".into(), "Cherry".into()]
}

fn write_fixture_jpeg(path: &Path) -> Result<()> {
    let img = RgbImage::from_fn(500, 500, |x, y| {
        Rgb([(x / 2) as u8, (y / 2) as u8, ((x + y) / 4) as u8])
    });
    img.save(path)?;
    Ok(())
}

fn new_session(history: HistoryStore) -> Session {
    let artifact = ClassifierArtifact::new(Box::new(FixtureClassifier), fixture_labels());
    Session::new(Arc::new(artifact), history)
}

#[test]
fn jpeg_through_fixture_classifier_lands_in_history() -> Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("fruit.jpg");
    write_fixture_jpeg(&image_path)?;
    let history_path = dir.path().join("classification_history.json");

    let mut session = new_session(HistoryStore::open(&history_path));
    session.load_image(&image_path)?;
    assert_eq!(session.canvas().dimensions(), (300, 300));

    let result = session.classify(|_| {})?;

    let exps = [2f64.exp(), 5f64.exp(), 1f64.exp()];
    let expected = exps[1] / exps.iter().sum::<f64>() * 100.0;
    assert_eq!(result.label, "Banana");
    assert_abs_diff_eq!(result.confidence_percent, expected, epsilon = 1e-6);
    assert_eq!(session.state(), SessionState::ResultReady);

    let records = session.history().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prediction(), "Banana");
    assert_eq!(records[0].confidence(), format!("{expected:.2}%"));

    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&history_path)?)?;
    assert_eq!(on_disk.as_array().map(|a| a.len()), Some(1));
    assert_eq!(on_disk[0]["prediction"], "Banana");
    assert_eq!(on_disk[0]["confidence"], "93.62%");
    Ok(())
}

#[test]
fn history_survives_a_restart() -> Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("fruit.jpg");
    write_fixture_jpeg(&image_path)?;
    let history_path = dir.path().join("classification_history.json");

    let first_run = {
        let mut session = new_session(HistoryStore::open(&history_path));
        session.load_image(&image_path)?;
        for _ in 0..3 {
            session.classify(|_| {})?;
        }
        session.history().records().to_vec()
    };

    let session = new_session(HistoryStore::open(&history_path));
    assert_eq!(session.recent_history(), first_run.as_slice());
    Ok(())
}

#[test]
fn sixty_classifications_keep_fifty_on_disk() -> Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("fruit.jpg");
    write_fixture_jpeg(&image_path)?;
    let history_path = dir.path().join("classification_history.json");

    let mut session = new_session(HistoryStore::open(&history_path));
    session.load_image(&image_path)?;
    for _ in 0..60 {
        session.classify(|_| {})?;
    }
    let on_disk: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&history_path)?)?;
    assert_eq!(on_disk.len(), 50);
    assert_eq!(session.recent_history().len(), 10);
    Ok(())
}

#[test]
fn classify_before_loading_is_not_a_classification_error() {
    let mut session = new_session(HistoryStore::in_memory());
    match session.classify(|_| {}) {
        Err(ClassifyError::NotReady(state)) => assert_eq!(state, SessionState::Idle),
        other => panic!("expected a precondition rejection, got {other:?}"),
    }
}

#[test]
fn corrupt_history_does_not_block_startup() -> Result<()> {
    let dir = tempdir()?;
    let history_path = dir.path().join("classification_history.json");
    fs::write(&history_path, "[{\"date\": 12")?;
    let session = new_session(HistoryStore::open(&history_path));
    assert!(session.recent_history().is_empty());
    Ok(())
}
