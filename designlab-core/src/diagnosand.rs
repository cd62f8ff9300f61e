//! Diagnosand functions and their evaluator.
//!
//! A diagnosand function is a pure function from a partition table to
//! parallel name/value sequences. A run carries either one shared function
//! or an ordered per-design registry (heterogeneous diagnosis). The default
//! policy computes the conventional set: bias, RMSE, power, coverage,
//! mean/SD of the estimate, type-S error rate, and mean estimand.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::schema;
use crate::stats::{mean, proportion, sample_sd};
use crate::table::Table;
use crate::value::Value;

/// Parallel name/value sequences returned by a diagnosand function.
///
/// Name and value counts must match; the evaluator rejects anything else.
#[derive(Debug, Clone, Default)]
pub struct DiagnosandOutput {
    pub names: Vec<String>,
    pub values: Vec<Value>,
}

impl DiagnosandOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a numeric statistic; `None` becomes a missing cell.
    pub fn push(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.names.push(name.into());
        self.values.push(Value::opt_num(value));
    }

    /// Push a raw value (tests use this to produce malformed output).
    pub fn push_value(&mut self, name: impl Into<String>, value: Value) {
        self.names.push(name.into());
        self.values.push(value);
    }
}

/// A diagnosand function over one partition table.
pub type DiagnosandFn = Arc<dyn Fn(&Table) -> DiagnosandOutput + Send + Sync>;

/// A diagnosand function plus an optional alternate grouping-key set.
///
/// When `group_by` is declared, the aggregation engine partitions with it
/// instead of the caller's default key — for the point estimates and for
/// every bootstrap replicate alike.
#[derive(Clone)]
pub struct Diagnosands {
    func: DiagnosandFn,
    group_by: Option<Vec<String>>,
}

impl Diagnosands {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Table) -> DiagnosandOutput + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            group_by: None,
        }
    }

    /// Declare an alternate grouping-key set for this function.
    pub fn with_group_by(mut self, keys: Vec<String>) -> Self {
        self.group_by = Some(keys);
        self
    }

    pub fn group_by(&self) -> Option<&[String]> {
        self.group_by.as_deref()
    }

    /// Apply the function to a partition.
    pub fn compute(&self, partition: &Table) -> DiagnosandOutput {
        (self.func)(partition)
    }

    /// The default diagnosand policy at significance level `alpha`.
    ///
    /// Statistics skip rows where an operand is missing; a statistic with no
    /// usable rows (or whose operand column is absent) comes back missing.
    pub fn default_set(alpha: f64) -> Self {
        Self::new(move |t: &Table| {
            let estimate = t.column_f64(schema::ESTIMATE);
            let estimand = t.column_f64(schema::ESTIMAND_VALUE);
            let p_value = t.column_f64(schema::P_VALUE);
            let conf_low = t.column_f64(schema::CONF_LOW);
            let conf_high = t.column_f64(schema::CONF_HIGH);

            let errors: Vec<f64> = paired(&estimate, &estimand)
                .into_iter()
                .map(|(e, v)| e - v)
                .collect();
            let estimates = present(&estimate);
            let estimands = present(&estimand);
            let p_values = present(&p_value);

            let coverage_hits: Vec<f64> = tripled(&estimand, &conf_low, &conf_high)
                .into_iter()
                .map(|(v, lo, hi)| if lo <= v && v <= hi { 1.0 } else { 0.0 })
                .collect();

            // Sign errors among significant estimates.
            let sign_errors: Vec<f64> = match (&estimate, &estimand, &p_value) {
                (Some(e), Some(v), Some(p)) => e
                    .iter()
                    .zip(v)
                    .zip(p)
                    .filter_map(|((e, v), p)| match (e, v, p) {
                        (Some(e), Some(v), Some(p)) if *p <= alpha => {
                            Some(if e.signum() != v.signum() { 1.0 } else { 0.0 })
                        }
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };

            let mut out = DiagnosandOutput::new();
            out.push("bias", mean(&errors));
            out.push(
                "rmse",
                mean(&errors.iter().map(|e| e * e).collect::<Vec<_>>()).map(f64::sqrt),
            );
            out.push("power", proportion(&p_values, |p| p <= alpha));
            out.push("coverage", mean(&coverage_hits));
            out.push("mean_estimate", mean(&estimates));
            out.push("sd_estimate", sample_sd(&estimates));
            out.push("type_s_rate", mean(&sign_errors));
            out.push("mean_estimand", mean(&estimands));
            out
        })
    }
}

impl fmt::Debug for Diagnosands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnosands")
            .field("group_by", &self.group_by)
            .finish_non_exhaustive()
    }
}

/// Diagnosand specification for a run: one shared function, or an ordered
/// design-identifier → function registry.
#[derive(Debug, Clone)]
pub enum DiagnosandSpec {
    Shared(Diagnosands),
    PerDesign(Vec<(String, Diagnosands)>),
}

impl DiagnosandSpec {
    pub fn shared(diagnosands: Diagnosands) -> Self {
        DiagnosandSpec::Shared(diagnosands)
    }

    pub fn per_design(entries: Vec<(String, Diagnosands)>) -> Self {
        DiagnosandSpec::PerDesign(entries)
    }

    /// The default policy: shared default diagnosand set at α = 0.05.
    pub fn default_policy() -> Self {
        DiagnosandSpec::Shared(Diagnosands::default_set(0.05))
    }

    /// Registry lookup by design identifier (`PerDesign` only).
    pub fn for_design(&self, design: &str) -> Option<&Diagnosands> {
        match self {
            DiagnosandSpec::Shared(_) => None,
            DiagnosandSpec::PerDesign(entries) => entries
                .iter()
                .find(|(name, _)| name == design)
                .map(|(_, d)| d),
        }
    }
}

/// Malformed diagnosand output.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(
        "diagnosand returned {names} names but {values} values for group [{group}]"
    )]
    LengthMismatch {
        names: usize,
        values: usize,
        group: String,
    },
    #[error("diagnosand '{name}' returned a non-numeric value for group [{group}]")]
    NonNumeric { name: String, group: String },
}

/// Apply a diagnosand function to a partition and validate its output.
///
/// Returns ordered (name, value) pairs. Values must be numeric scalars or
/// missing; NaN normalizes to missing. `group` names the partition in errors.
pub fn evaluate(
    diagnosands: &Diagnosands,
    partition: &Table,
    group: &str,
) -> Result<Vec<(String, Value)>, EvaluationError> {
    let out = diagnosands.compute(partition);
    if out.names.len() != out.values.len() {
        return Err(EvaluationError::LengthMismatch {
            names: out.names.len(),
            values: out.values.len(),
            group: group.to_string(),
        });
    }
    let mut pairs = Vec::with_capacity(out.names.len());
    for (name, value) in out.names.into_iter().zip(out.values) {
        let value = match value {
            Value::Num(v) => Value::num(v),
            Value::Int(_) | Value::Missing => value,
            _ => {
                return Err(EvaluationError::NonNumeric {
                    name,
                    group: group.to_string(),
                })
            }
        };
        pairs.push((name, value));
    }
    Ok(pairs)
}

// ─── Column helpers ─────────────────────────────────────────────────

/// Present values of an optional numeric column.
fn present(col: &Option<Vec<Option<f64>>>) -> Vec<f64> {
    col.as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|v| *v)
        .collect()
}

/// Rows where both columns are present.
fn paired(
    a: &Option<Vec<Option<f64>>>,
    b: &Option<Vec<Option<f64>>>,
) -> Vec<(f64, f64)> {
    match (a, b) {
        (Some(a), Some(b)) => a
            .iter()
            .zip(b)
            .filter_map(|(a, b)| Some((((*a)?), ((*b)?))))
            .collect(),
        _ => Vec::new(),
    }
}

/// Rows where all three columns are present.
fn tripled(
    a: &Option<Vec<Option<f64>>>,
    b: &Option<Vec<Option<f64>>>,
    c: &Option<Vec<Option<f64>>>,
) -> Vec<(f64, f64, f64)> {
    match (a, b, c) {
        (Some(a), Some(b), Some(c)) => a
            .iter()
            .zip(b)
            .zip(c)
            .filter_map(|((a, b), c)| Some((((*a)?), ((*b)?), ((*c)?))))
            .collect(),
        _ => Vec::new(),
    }
}
