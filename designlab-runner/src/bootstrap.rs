//! Cluster bootstrap engine — standard errors for diagnosands.
//!
//! Resamples whole simulation draws (clusters of rows sharing a `sim_id`),
//! never individual rows: rows from one draw are statistically dependent and
//! must move together. Each replicate reruns the aggregation engine on its
//! resample; the per-group, per-statistic sample standard deviation across
//! replicates is the diagnosand's standard error.
//!
//! Key design choices:
//! - Per-replicate RNGs come from hash-derived sub-seeds, so results are
//!   identical whether replicates run sequentially or on a thread pool.
//! - Replicates go through an injected executor; results are re-collected
//!   in replicate order and any single failure fails the whole bootstrap.
//! - `se(stat)` columns pair up with their statistics in the assembler.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use designlab_core::diagnosand::DiagnosandSpec;
use designlab_core::group::partition_by;
use designlab_core::rng::SeedHierarchy;
use designlab_core::schema;
use designlab_core::stats::sample_sd;
use designlab_core::table::Table;
use designlab_core::value::Value;

use crate::aggregate::{aggregate, AggregationError, Aggregated};
use crate::executor::Executor;

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration for the cluster bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of bootstrap replicates (default 100; 0 disables).
    pub n_replicates: usize,
    /// Master RNG seed for reproducibility.
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_replicates: 100,
            seed: 42,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Bootstrap output: the concatenated replicate diagnosand tables (tagged
/// with `bootstrap_id`) and the per-group standard-error table.
#[derive(Debug, Clone)]
pub struct BootstrapOutput {
    pub replicates: Table,
    pub standard_errors: Table,
    pub n_replicates: usize,
}

/// Errors from cluster resampling.
#[derive(Debug, Error)]
pub enum ResamplingError {
    #[error("replicate cluster column '{0}' is missing from the simulations table")]
    MissingClusterColumn(String),
    #[error("replicate cluster column '{0}' has no values to resample")]
    EmptyClusterColumn(String),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Standard-error column name for a statistic.
pub fn se_name(stat: &str) -> String {
    format!("se({stat})")
}

// ─── Bootstrap ───────────────────────────────────────────────────────

/// Run the cluster bootstrap and derive standard errors.
///
/// `point` is the point-estimate aggregation of the same simulations with
/// the same spec; it tells the engine which output columns are keys and
/// which are statistics.
pub fn bootstrap_diagnosands<E: Executor>(
    simulations: &Table,
    spec: &DiagnosandSpec,
    group_by: &[String],
    point: &Aggregated,
    config: &BootstrapConfig,
    executor: &E,
) -> Result<BootstrapOutput, ResamplingError> {
    let clusters = cluster_index(simulations)?;
    let n_draws = clusters.len();
    let seeds = SeedHierarchy::new(config.seed);

    let results = executor.map(config.n_replicates, |replicate| {
        let mut rng = seeds.rng_for(replicate as u64);
        let mut indices = Vec::new();
        for _ in 0..n_draws {
            let pick = rng.gen_range(0..n_draws);
            indices.extend_from_slice(&clusters[pick]);
        }
        let resampled = simulations.select_rows(&indices);
        aggregate(&resampled, spec, group_by).map(|agg| {
            let mut table = agg.table;
            let tags = vec![Value::Int(replicate as i64 + 1); table.n_rows()];
            table.add_column(schema::BOOTSTRAP_ID, tags);
            table
        })
    });

    // Fail fast: a sampling distribution with even one draw missing is
    // meaningless, so the first replicate error discards everything.
    let mut replicates: Option<Table> = None;
    for result in results {
        let table = result?;
        match &mut replicates {
            None => replicates = Some(table),
            Some(acc) => acc.vstack_union(&table),
        }
    }
    let replicates = replicates.unwrap_or_else(|| {
        let mut columns: Vec<String> = point.table.columns().to_vec();
        columns.push(schema::BOOTSTRAP_ID.to_string());
        Table::new(columns)
    });

    let standard_errors =
        standard_errors(&replicates, &point.key_columns, &point.stat_columns);

    Ok(BootstrapOutput {
        replicates,
        standard_errors,
        n_replicates: config.n_replicates,
    })
}

/// Row positions per distinct `sim_id` value, in first-encounter order.
fn cluster_index(simulations: &Table) -> Result<Vec<Vec<usize>>, ResamplingError> {
    let col = simulations
        .column_index(schema::SIM_ID)
        .ok_or_else(|| ResamplingError::MissingClusterColumn(schema::SIM_ID.to_string()))?;

    let mut order: Vec<Value> = Vec::new();
    let mut slots: std::collections::HashMap<Value, usize> = std::collections::HashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for r in 0..simulations.n_rows() {
        let id = simulations.row(r)[col].clone();
        let slot = match slots.get(&id) {
            Some(&slot) => slot,
            None => {
                let slot = order.len();
                slots.insert(id.clone(), slot);
                order.push(id);
                clusters.push(Vec::new());
                slot
            }
        };
        clusters[slot].push(r);
    }

    if clusters.is_empty() {
        return Err(ResamplingError::EmptyClusterColumn(
            schema::SIM_ID.to_string(),
        ));
    }
    Ok(clusters)
}

/// Per-group, per-statistic sample SD across replicates. Standard-error
/// computation only needs the set of replicate values per group, so it is
/// independent of replicate completion order.
fn standard_errors(replicates: &Table, key_columns: &[String], stat_columns: &[String]) -> Table {
    let grouping = partition_by(replicates, key_columns);

    let mut columns: Vec<String> = grouping.keys.clone();
    columns.extend(stat_columns.iter().map(|s| se_name(s)));
    let mut out = Table::new(columns);

    for part in &grouping.partitions {
        let mut row = part.key.0.clone();
        for stat in stat_columns {
            let values: Vec<f64> = part
                .rows
                .column_f64(stat)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect();
            row.push(Value::opt_num(sample_sd(&values)));
        }
        out.push_row(row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RayonExecutor, SequentialExecutor};
    use designlab_core::diagnosand::{DiagnosandOutput, Diagnosands};
    use designlab_core::stats::mean;

    /// Two rows per draw so cluster integrity is observable.
    fn clustered_sims(n_draws: usize) -> Table {
        let mut t = Table::new(vec!["design", "estimator", "sim_id", "estimate"]);
        for draw in 1..=n_draws {
            for term in 0..2 {
                t.push_row(vec![
                    "a".into(),
                    "ols".into(),
                    Value::Int(draw as i64),
                    Value::num(draw as f64 + term as f64 * 0.5),
                ]);
            }
        }
        t
    }

    fn mean_estimate_spec() -> DiagnosandSpec {
        DiagnosandSpec::shared(Diagnosands::new(|t: &Table| {
            let est: Vec<f64> = t
                .column_f64("estimate")
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect();
            let mut out = DiagnosandOutput::new();
            out.push("mean_estimate", mean(&est));
            out
        }))
    }

    fn point(t: &Table, spec: &DiagnosandSpec, keys: &[String]) -> Aggregated {
        aggregate(t, spec, keys).unwrap()
    }

    // ── Cluster index ──

    #[test]
    fn cluster_index_groups_rows() {
        let t = clustered_sims(3);
        let clusters = cluster_index(&t).unwrap();
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0], vec![0, 1]);
        assert_eq!(clusters[2], vec![4, 5]);
    }

    #[test]
    fn missing_cluster_column() {
        let t = Table::new(vec!["design", "estimate"]);
        let err = cluster_index(&t).unwrap_err();
        assert!(matches!(err, ResamplingError::MissingClusterColumn(_)));
    }

    #[test]
    fn empty_cluster_column() {
        let t = Table::new(vec!["design", "sim_id", "estimate"]);
        let err = cluster_index(&t).unwrap_err();
        assert!(matches!(err, ResamplingError::EmptyClusterColumn(_)));
    }

    // ── Bootstrap ──

    #[test]
    fn replicates_are_tagged_and_concatenated() {
        let t = clustered_sims(10);
        let spec = mean_estimate_spec();
        let keys = vec!["design".to_string()];
        let agg = point(&t, &spec, &keys);
        let config = BootstrapConfig {
            n_replicates: 5,
            seed: 7,
        };
        let out =
            bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor).unwrap();
        // One group, five replicates: five rows.
        assert_eq!(out.replicates.n_rows(), 5);
        let ids: Vec<_> = out
            .replicates
            .column("bootstrap_id")
            .unwrap()
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(
            ids,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Int(4),
                Value::Int(5)
            ]
        );
    }

    #[test]
    fn standard_errors_non_negative() {
        let t = clustered_sims(20);
        let spec = mean_estimate_spec();
        let keys = vec!["design".to_string()];
        let agg = point(&t, &spec, &keys);
        let config = BootstrapConfig {
            n_replicates: 50,
            seed: 42,
        };
        let out =
            bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor).unwrap();
        let se = out
            .standard_errors
            .cell(0, "se(mean_estimate)")
            .and_then(Value::as_f64)
            .unwrap();
        assert!(se.is_finite());
        assert!(se >= 0.0);
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let t = clustered_sims(15);
        let spec = mean_estimate_spec();
        let keys = vec!["design".to_string()];
        let agg = point(&t, &spec, &keys);
        let config = BootstrapConfig {
            n_replicates: 20,
            seed: 123,
        };
        let a = bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor)
            .unwrap();
        let b = bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor)
            .unwrap();
        assert_eq!(a.standard_errors, b.standard_errors);
    }

    #[test]
    fn parallel_matches_sequential() {
        let t = clustered_sims(15);
        let spec = mean_estimate_spec();
        let keys = vec!["design".to_string()];
        let agg = point(&t, &spec, &keys);
        let config = BootstrapConfig {
            n_replicates: 16,
            seed: 9,
        };
        let seq = bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor)
            .unwrap();
        let par =
            bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &RayonExecutor).unwrap();
        assert_eq!(seq.replicates, par.replicates);
        assert_eq!(seq.standard_errors, par.standard_errors);
    }

    #[test]
    fn cluster_integrity_in_resamples() {
        // Diagnosand that counts rows: every resample must contain whole
        // clusters of 2, so the count is always 2 * n_draws.
        let t = clustered_sims(8);
        let spec = DiagnosandSpec::shared(Diagnosands::new(|t: &Table| {
            let mut out = DiagnosandOutput::new();
            out.push("n_rows", Some(t.n_rows() as f64));
            out
        }));
        let keys = vec!["design".to_string()];
        let agg = point(&t, &spec, &keys);
        let config = BootstrapConfig {
            n_replicates: 30,
            seed: 5,
        };
        let out =
            bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor).unwrap();
        for value in out.replicates.column("n_rows").unwrap() {
            assert_eq!(value, &Value::Num(16.0));
        }
    }

    #[test]
    fn zero_replicates_yield_empty_tables() {
        let t = clustered_sims(5);
        let spec = mean_estimate_spec();
        let keys = vec!["design".to_string()];
        let agg = point(&t, &spec, &keys);
        let config = BootstrapConfig {
            n_replicates: 0,
            seed: 1,
        };
        let out =
            bootstrap_diagnosands(&t, &spec, &keys, &agg, &config, &SequentialExecutor).unwrap();
        assert_eq!(out.replicates.n_rows(), 0);
        assert_eq!(out.standard_errors.n_rows(), 0);
        assert_eq!(out.n_replicates, 0);
    }
}
