//! Diagnosis run fingerprinting.
//!
//! A fingerprint deterministically identifies one diagnosis run: the input
//! table's shape, the grouping key, and the bootstrap settings. Two runs
//! with identical inputs and settings share a run id, which makes the JSONL
//! history deduplicatable and results content-addressable.

use serde::{Deserialize, Serialize};

/// Content-addressable identifier for a diagnosis run (blake3 hex).
pub type RunId = String;

/// Complete fingerprint of a diagnosis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisFingerprint {
    pub run_id: RunId,
    pub seed: u64,
    pub columns: Vec<String>,
    pub n_rows: usize,
    pub n_draws: usize,
    pub group_by: Vec<String>,
    pub bootstrap_replicates: usize,
}

impl DiagnosisFingerprint {
    /// Build a fingerprint; the run id is the blake3 hash of the canonical
    /// JSON of every other field.
    pub fn new(
        columns: &[String],
        n_rows: usize,
        n_draws: usize,
        group_by: &[String],
        bootstrap_replicates: usize,
        seed: u64,
    ) -> Self {
        let mut fp = Self {
            run_id: String::new(),
            seed,
            columns: columns.to_vec(),
            n_rows,
            n_draws,
            group_by: group_by.to_vec(),
            bootstrap_replicates,
        };
        let json = serde_json::to_string(&fp).expect("fingerprint fields must serialize");
        fp.run_id = blake3::hash(json.as_bytes()).to_hex().to_string();
        fp
    }
}
