//! Bounded, durably persisted log of past classifications.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{HistoryPersistError, InvalidRecord};
use crate::interpret::ClassificationResult;

/// Maximum number of records kept on disk.
pub const HISTORY_CAPACITY: usize = 50;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted classification outcome.
///
/// Serialized as `{"date": ..., "prediction": ..., "confidence": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct HistoryRecord {
    date: String,
    prediction: String,
    confidence: String,
}

#[derive(Deserialize)]
struct RawRecord {
    date: String,
    prediction: String,
    confidence: String,
}

impl TryFrom<RawRecord> for HistoryRecord {
    type Error = InvalidRecord;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        Self::new(raw.date, raw.prediction, raw.confidence)
    }
}

impl HistoryRecord {
    /// Build a record from already formatted fields, validating each one.
    pub fn new(
        date: impl Into<String>,
        prediction: impl Into<String>,
        confidence: impl Into<String>,
    ) -> Result<Self, InvalidRecord> {
        let (date, prediction, confidence) = (date.into(), prediction.into(), confidence.into());
        if NaiveDateTime::parse_from_str(&date, DATE_FORMAT).is_err() {
            return Err(InvalidRecord::Date(date));
        }
        if prediction.trim().is_empty() {
            return Err(InvalidRecord::EmptyPrediction);
        }
        if !is_confidence_display(&confidence) {
            return Err(InvalidRecord::Confidence(confidence));
        }
        Ok(Self {
            date,
            prediction,
            confidence,
        })
    }

    /// Project a classification made at `at` into a record.
    pub fn from_result(result: &ClassificationResult, at: NaiveDateTime) -> Self {
        Self {
            date: at.format(DATE_FORMAT).to_string(),
            prediction: result.label.clone(),
            confidence: result.confidence_display(),
        }
    }

    /// Record stamped with the local wall clock.
    pub fn now(result: &ClassificationResult) -> Self {
        Self::from_result(result, Local::now().naive_local())
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn prediction(&self) -> &str {
        &self.prediction
    }

    pub fn confidence(&self) -> &str {
        &self.confidence
    }
}

// "NN.NN%": digits, a dot, exactly two digits, percent sign.
fn is_confidence_display(s: &str) -> bool {
    let Some(number) = s.strip_suffix('%') else {
        return false;
    };
    let Some((whole, frac)) = number.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.len() == 2
        && frac.bytes().all(|b| b.is_ascii_digit())
}

/// Append-only history, truncated to `capacity` on every append.
#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    records: Vec<HistoryRecord>,
    capacity: usize,
}

impl HistoryStore {
    /// Load the log at `path`. A missing or unreadable file yields an empty log.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_capacity(path, HISTORY_CAPACITY)
    }

    /// Like [`HistoryStore::open`]; a file holding more than `capacity`
    /// records is cut down to the newest ones.
    pub fn open_with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let mut store = Self {
            records: read_records(&path),
            path: Some(path),
            capacity,
        };
        store.truncate();
        if let Some(path) = &store.path {
            tracing::info!(
                "history loaded from {} ({} records)",
                path.display(),
                store.records.len()
            );
        }
        store
    }

    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Vec::new(),
            capacity: HISTORY_CAPACITY,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Add `record`, drop the oldest entries beyond capacity and persist.
    ///
    /// Persistence failures are logged; the in-memory log is updated either way.
    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
        self.truncate();
        if let Err(e) = self.persist() {
            tracing::warn!("history not saved: {e}");
        }
    }

    fn truncate(&mut self) {
        let excess = self.records.len().saturating_sub(self.capacity);
        self.records.drain(..excess);
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Write the log next to its target and rename it into place.
    pub fn persist(&self) -> Result<(), HistoryPersistError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.records)?;
        let io_err = |source: std::io::Error| HistoryPersistError::Io {
            path: path.clone(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        tracing::debug!("history saved ({} records)", self.records.len());
        Ok(())
    }
}

fn read_records(path: &Path) -> Vec<HistoryRecord> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("cannot read history {}: {e}", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("ignoring corrupt history {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Export records to CSV with headers: date,prediction,confidence
pub fn export_csv(records: &[HistoryRecord], path: impl AsRef<Path>) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["date", "prediction", "confidence"])?;
    for record in records {
        wtr.write_record([
            record.date(),
            record.prediction(),
            record.confidence(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
