//! Aggregation engine — grouped diagnosand evaluation.
//!
//! Two paths:
//! - Shared function: partition by the effective key set (the function's
//!   declared override, else the caller's grouping key) and evaluate every
//!   partition, one output row per partition.
//! - Per-design registry: partition by design only, look up each design's
//!   function in encounter order, aggregate each sub-table recursively, and
//!   concatenate the sub-results disjoint-union style.
//!
//! Output row order follows partition order; the statistic column registry
//! is built incrementally in first-encountered order.

use thiserror::Error;

use designlab_core::diagnosand::{evaluate, DiagnosandSpec, Diagnosands, EvaluationError};
use designlab_core::group::{describe_key, partition_by};
use designlab_core::schema;
use designlab_core::table::Table;
use designlab_core::value::Value;

/// Aggregated diagnosands plus the column roles needed downstream: which
/// output columns are grouping keys and which are statistics.
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub table: Table,
    pub key_columns: Vec<String>,
    pub stat_columns: Vec<String>,
}

/// Errors from grouped aggregation.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("no diagnosands registered for design '{design}'")]
    MissingDesignSpec { design: String },
    #[error("per-design diagnosands require a '{}' column", schema::DESIGN)]
    MissingDesignColumn,
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Reduce a simulations table to one diagnosand row per group.
pub fn aggregate(
    simulations: &Table,
    spec: &DiagnosandSpec,
    group_by: &[String],
) -> Result<Aggregated, AggregationError> {
    match spec {
        DiagnosandSpec::Shared(diagnosands) => {
            aggregate_shared(simulations, diagnosands, group_by)
        }
        DiagnosandSpec::PerDesign(_) => {
            if !simulations.has_column(schema::DESIGN) {
                return Err(AggregationError::MissingDesignColumn);
            }
            let by_design = partition_by(simulations, &[schema::DESIGN.to_string()]);

            let mut table: Option<Table> = None;
            let mut key_columns: Vec<String> = Vec::new();
            let mut stat_columns: Vec<String> = Vec::new();

            for part in &by_design.partitions {
                let design = part.key.0[0].to_string();
                let diagnosands = spec
                    .for_design(&design)
                    .ok_or(AggregationError::MissingDesignSpec {
                        design: design.clone(),
                    })?;
                let sub = aggregate_shared(&part.rows, diagnosands, group_by)?;
                extend_registry(&mut key_columns, &sub.key_columns);
                extend_registry(&mut stat_columns, &sub.stat_columns);
                match &mut table {
                    None => table = Some(sub.table),
                    Some(acc) => acc.vstack_union(&sub.table),
                }
            }

            Ok(Aggregated {
                table: table.unwrap_or_else(|| Table::new(vec![schema::DESIGN])),
                key_columns,
                stat_columns,
            })
        }
    }
}

/// Shared-function path: one row per partition of the effective key set.
fn aggregate_shared(
    simulations: &Table,
    diagnosands: &Diagnosands,
    group_by: &[String],
) -> Result<Aggregated, AggregationError> {
    let requested: Vec<String> = diagnosands
        .group_by()
        .map(<[String]>::to_vec)
        .unwrap_or_else(|| group_by.to_vec());
    let grouping = partition_by(simulations, &requested);

    let mut stat_columns: Vec<String> = Vec::new();
    let mut evaluated: Vec<(Vec<Value>, Vec<(String, Value)>)> =
        Vec::with_capacity(grouping.partitions.len());

    for part in &grouping.partitions {
        let desc = describe_key(&grouping.keys, &part.key);
        let pairs = evaluate(diagnosands, &part.rows, &desc)?;
        extend_registry(
            &mut stat_columns,
            &pairs.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>(),
        );
        evaluated.push((part.key.0.clone(), pairs));
    }

    let mut columns: Vec<String> = grouping.keys.clone();
    columns.extend(stat_columns.iter().cloned());
    let mut table = Table::new(columns);

    for (key_values, pairs) in evaluated {
        let mut row = key_values;
        for stat in &stat_columns {
            let value = pairs
                .iter()
                .find(|(n, _)| n == stat)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Missing);
            row.push(value);
        }
        table.push_row(row);
    }

    Ok(Aggregated {
        table,
        key_columns: grouping.keys,
        stat_columns,
    })
}

/// Append unseen names, preserving first-encountered order.
fn extend_registry(registry: &mut Vec<String>, names: &[String]) {
    for name in names {
        if !registry.contains(name) {
            registry.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use designlab_core::diagnosand::DiagnosandOutput;
    use designlab_core::stats::mean;

    fn sims_two_designs() -> Table {
        let mut t = Table::new(vec!["design", "estimator", "estimate", "estimand_value"]);
        for (design, est) in [("a", 1.0), ("a", 3.0), ("b", 10.0), ("b", 20.0)] {
            t.push_row(vec![
                design.into(),
                "ols".into(),
                Value::num(est),
                Value::num(0.0),
            ]);
        }
        t
    }

    fn mean_estimate() -> Diagnosands {
        Diagnosands::new(|t: &Table| {
            let est: Vec<f64> = t
                .column_f64("estimate")
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect();
            let mut out = DiagnosandOutput::new();
            out.push("mean_estimate", mean(&est));
            out
        })
    }

    // ── Shared function ──

    #[test]
    fn shared_one_row_per_partition() {
        let t = sims_two_designs();
        let agg = aggregate(
            &t,
            &DiagnosandSpec::shared(mean_estimate()),
            &["design".to_string(), "estimator".to_string()],
        )
        .unwrap();
        assert_eq!(agg.table.n_rows(), 2);
        assert_eq!(agg.key_columns, vec!["design", "estimator"]);
        assert_eq!(agg.stat_columns, vec!["mean_estimate"]);
        assert_eq!(agg.table.cell(0, "mean_estimate"), Some(&Value::Num(2.0)));
        assert_eq!(agg.table.cell(1, "mean_estimate"), Some(&Value::Num(15.0)));
    }

    #[test]
    fn shared_idempotent_on_same_input() {
        let t = sims_two_designs();
        let spec = DiagnosandSpec::shared(mean_estimate());
        let keys = vec!["design".to_string()];
        let a = aggregate(&t, &spec, &keys).unwrap();
        let b = aggregate(&t, &spec, &keys).unwrap();
        assert_eq!(a.table, b.table);
    }

    #[test]
    fn declared_group_by_overrides_caller_keys() {
        let t = sims_two_designs();
        let diagnosands = mean_estimate().with_group_by(vec!["estimator".to_string()]);
        let agg = aggregate(
            &t,
            &DiagnosandSpec::shared(diagnosands),
            &["design".to_string()],
        )
        .unwrap();
        // One estimator across both designs: a single partition.
        assert_eq!(agg.table.n_rows(), 1);
        assert_eq!(agg.key_columns, vec!["estimator"]);
    }

    // ── Per-design dispatch ──

    #[test]
    fn per_design_disjoint_union() {
        let t = sims_two_designs();
        let bias_like = Diagnosands::new(|t: &Table| {
            let est: Vec<f64> = t
                .column_f64("estimate")
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect();
            let mut out = DiagnosandOutput::new();
            out.push("bias", mean(&est));
            out.push("power", Some(0.5));
            out
        });
        let coverage_like = Diagnosands::new(|t: &Table| {
            let est: Vec<f64> = t
                .column_f64("estimate")
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect();
            let mut out = DiagnosandOutput::new();
            out.push("bias", mean(&est));
            out.push("coverage", Some(0.9));
            out
        });
        let spec = DiagnosandSpec::per_design(vec![
            ("a".to_string(), bias_like),
            ("b".to_string(), coverage_like),
        ]);

        let agg = aggregate(&t, &spec, &["design".to_string()]).unwrap();
        assert_eq!(agg.stat_columns, vec!["bias", "power", "coverage"]);
        assert_eq!(agg.table.n_rows(), 2);
        // Design a has no coverage; design b has no power.
        assert_eq!(agg.table.cell(0, "coverage"), Some(&Value::Missing));
        assert_eq!(agg.table.cell(1, "power"), Some(&Value::Missing));
        assert_eq!(agg.table.cell(1, "coverage"), Some(&Value::Num(0.9)));
    }

    #[test]
    fn per_design_missing_entry_names_design() {
        let t = sims_two_designs();
        let spec = DiagnosandSpec::per_design(vec![("a".to_string(), mean_estimate())]);
        let err = aggregate(&t, &spec, &["design".to_string()]).unwrap_err();
        match err {
            AggregationError::MissingDesignSpec { design } => assert_eq!(design, "b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn per_design_without_design_column() {
        let t = Table::new(vec!["estimator", "estimate"]);
        let spec = DiagnosandSpec::per_design(vec![("a".to_string(), mean_estimate())]);
        let err = aggregate(&t, &spec, &[]).unwrap_err();
        assert!(matches!(err, AggregationError::MissingDesignColumn));
    }

    // ── Error propagation ──

    #[test]
    fn evaluation_error_carries_group() {
        let t = sims_two_designs();
        let broken = Diagnosands::new(|_t: &Table| {
            let mut out = DiagnosandOutput::new();
            out.names.push("a".into());
            out.names.push("b".into());
            out.values.push(Value::num(1.0));
            out
        });
        let err = aggregate(
            &t,
            &DiagnosandSpec::shared(broken),
            &["design".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("design=a"));
    }
}
