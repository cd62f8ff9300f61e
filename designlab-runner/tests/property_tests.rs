//! Property tests for bootstrap invariants.
//!
//! Uses proptest to verify:
//! 1. Cluster integrity — rows sharing a `sim_id` are resampled together
//! 2. Standard-error non-negativity across seeds and draw counts
//! 3. Seeded determinism of the whole bootstrap

use proptest::prelude::*;

use designlab_core::diagnosand::{DiagnosandOutput, DiagnosandSpec, Diagnosands};
use designlab_core::table::Table;
use designlab_core::value::Value;
use designlab_runner::aggregate::aggregate;
use designlab_runner::bootstrap::{bootstrap_diagnosands, BootstrapConfig};
use designlab_runner::executor::SequentialExecutor;

/// Two rows per draw, so splitting a cluster is observable.
fn clustered_sims(n_draws: usize) -> Table {
    let mut t = Table::new(vec!["design", "estimator", "sim_id", "estimate"]);
    for draw in 1..=n_draws {
        for term in 0..2 {
            t.push_row(vec![
                "a".into(),
                "ols".into(),
                Value::Int(draw as i64),
                Value::num((draw as f64 * 0.37).sin() + term as f64),
            ]);
        }
    }
    t
}

/// Reports the worst per-cluster row-count deviation from 2 inside the
/// partition it sees. Any resample that splits a cluster makes this > 0.
fn cluster_imbalance() -> DiagnosandSpec {
    DiagnosandSpec::shared(Diagnosands::new(|t: &Table| {
        let mut counts: std::collections::HashMap<Value, usize> = std::collections::HashMap::new();
        if let Some(ids) = t.column("sim_id") {
            for id in ids {
                *counts.entry(id.clone()).or_insert(0) += 1;
            }
        }
        let imbalance = counts
            .values()
            .map(|&c| (c % 2) as f64)
            .fold(0.0_f64, f64::max);
        let mut out = DiagnosandOutput::new();
        out.push("cluster_imbalance", Some(imbalance));
        out.push(
            "mean_estimate",
            designlab_core::stats::mean(
                &t.column_f64("estimate")
                    .unwrap_or_default()
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>(),
            ),
        );
        out
    }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // ── 1. Cluster integrity ──

    /// Every cluster appears a whole number of times in every resample: a
    /// cluster of 2 rows contributes row counts divisible by 2.
    #[test]
    fn clusters_never_split(n_draws in 2_usize..15, seed in 0_u64..1000) {
        let sims = clustered_sims(n_draws);
        let spec = cluster_imbalance();
        let keys = vec!["design".to_string()];
        let point = aggregate(&sims, &spec, &keys).unwrap();
        let config = BootstrapConfig { n_replicates: 10, seed };
        let out = bootstrap_diagnosands(&sims, &spec, &keys, &point, &config, &SequentialExecutor)
            .unwrap();
        for value in out.replicates.column("cluster_imbalance").unwrap() {
            prop_assert_eq!(value, &Value::Num(0.0));
        }
    }

    // ── 2. SE non-negativity ──

    /// Every computed standard error is finite and >= 0.
    #[test]
    fn standard_errors_non_negative(n_draws in 3_usize..15, seed in 0_u64..1000) {
        let sims = clustered_sims(n_draws);
        let spec = cluster_imbalance();
        let keys = vec!["design".to_string()];
        let point = aggregate(&sims, &spec, &keys).unwrap();
        let config = BootstrapConfig { n_replicates: 12, seed };
        let out = bootstrap_diagnosands(&sims, &spec, &keys, &point, &config, &SequentialExecutor)
            .unwrap();
        let se = out
            .standard_errors
            .cell(0, "se(mean_estimate)")
            .and_then(Value::as_f64);
        if let Some(se) = se {
            prop_assert!(se.is_finite());
            prop_assert!(se >= 0.0);
        }
    }

    // ── 3. Determinism ──

    /// The same seed yields the same replicate table and standard errors.
    #[test]
    fn seeded_bootstrap_deterministic(seed in 0_u64..1000) {
        let sims = clustered_sims(8);
        let spec = cluster_imbalance();
        let keys = vec!["design".to_string()];
        let point = aggregate(&sims, &spec, &keys).unwrap();
        let config = BootstrapConfig { n_replicates: 8, seed };
        let a = bootstrap_diagnosands(&sims, &spec, &keys, &point, &config, &SequentialExecutor)
            .unwrap();
        let b = bootstrap_diagnosands(&sims, &spec, &keys, &point, &config, &SequentialExecutor)
            .unwrap();
        prop_assert_eq!(a.replicates, b.replicates);
        prop_assert_eq!(a.standard_errors, b.standard_errors);
    }
}
