//! DesignLab core — domain model for Monte Carlo design diagnosis.
//!
//! This crate defines:
//! - Dynamic values and tables for simulation records
//! - The simulations-table column contract
//! - The group-key partitioner (missing values as their own category)
//! - Diagnosand functions, specs, and the output evaluator
//! - Deterministic RNG seed hierarchy and run fingerprinting
//!
//! Orchestration (aggregation, bootstrap, assembly) lives in
//! `designlab-runner`.

pub mod diagnosand;
pub mod fingerprint;
pub mod group;
pub mod rng;
pub mod schema;
pub mod stats;
pub mod table;
pub mod value;

pub use diagnosand::{
    evaluate, DiagnosandFn, DiagnosandOutput, DiagnosandSpec, Diagnosands, EvaluationError,
};
pub use fingerprint::{DiagnosisFingerprint, RunId};
pub use group::{describe_key, partition_by, GroupKey, Grouping, Partition};
pub use rng::SeedHierarchy;
pub use table::Table;
pub use value::Value;
