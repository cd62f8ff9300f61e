//! Diagnosis history — JSONL append-only persistence with write filtering.
//!
//! Persists one JSON object per diagnosis run. Each line is independent,
//! making the format resilient to partial writes and easy to stream. A
//! write filter keeps trivially small runs out of long-lived history files.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use designlab_core::fingerprint::DiagnosisFingerprint;

use crate::diagnose::Diagnosis;

/// A single history entry: fingerprint plus a summary of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub fingerprint: DiagnosisFingerprint,
    pub timestamp: NaiveDateTime,
    pub n_draws: usize,
    pub bootstrap_replicates: usize,
    pub diagnosand_names: Vec<String>,
    pub group_by: Vec<String>,
}

impl HistoryEntry {
    pub fn from_diagnosis(diagnosis: &Diagnosis, timestamp: NaiveDateTime) -> Self {
        Self {
            fingerprint: diagnosis.fingerprint.clone(),
            timestamp,
            n_draws: diagnosis.fingerprint.n_draws,
            bootstrap_replicates: diagnosis.bootstrap_replicates,
            diagnosand_names: diagnosis.diagnosand_names.clone(),
            group_by: diagnosis.group_by.clone(),
        }
    }
}

/// Criteria for whether a run should be persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFilter {
    /// Minimum number of simulation draws (default 1).
    pub min_draws: usize,
}

impl Default for WriteFilter {
    fn default() -> Self {
        Self { min_draws: 1 }
    }
}

impl WriteFilter {
    pub fn should_write(&self, entry: &HistoryEntry) -> bool {
        entry.n_draws >= self.min_draws
    }
}

/// JSONL history file manager.
pub struct DiagnosisHistory {
    path: PathBuf,
    filter: WriteFilter,
}

impl DiagnosisHistory {
    pub fn new(path: PathBuf, filter: WriteFilter) -> Self {
        Self { path, filter }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append an entry if it passes the write filter.
    ///
    /// Returns `Ok(true)` if written, `Ok(false)` if filtered out.
    pub fn append(&self, entry: &HistoryEntry) -> io::Result<bool> {
        if !self.filter.should_write(entry) {
            return Ok(false);
        }

        let json = serde_json::to_string(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(true)
    }

    /// Load every entry, skipping blank lines.
    pub fn load(&self) -> io::Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut entries = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry = serde_json::from_str(&line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
