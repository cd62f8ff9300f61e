//! DesignLab runner — diagnosis orchestration over simulation tables.
//!
//! This crate builds on `designlab-core` to provide:
//! - The aggregation engine (shared and per-design diagnosand dispatch)
//! - The cluster bootstrap engine with injectable executor
//! - The result assembler (merges, counts, canonical ordering)
//! - The `diagnose` entry point and its configuration
//! - CSV/JSON export and JSONL run history

pub mod aggregate;
pub mod assemble;
pub mod bootstrap;
pub mod config;
pub mod diagnose;
pub mod executor;
pub mod export;
pub mod history;

pub use aggregate::{aggregate, Aggregated, AggregationError};
pub use assemble::{assemble, simulation_counts};
pub use bootstrap::{
    bootstrap_diagnosands, se_name, BootstrapConfig, BootstrapOutput, ResamplingError,
};
pub use config::{ConfigError, DiagnosisConfig};
pub use diagnose::{diagnose, Diagnosis, DiagnosisError, SCHEMA_VERSION};
pub use executor::{Executor, RayonExecutor, SequentialExecutor};
pub use export::{
    diagnosis_to_json, read_table_csv, read_table_csv_str, table_to_csv_string, write_table_csv,
    ExportError,
};
pub use history::{DiagnosisHistory, HistoryEntry, WriteFilter};
