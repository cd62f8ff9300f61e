//! Simulations-table column contract — the boundary between the (external)
//! simulation engine and the diagnosis pipeline.
//!
//! Defines the canonical column names the pipeline recognizes. Only `design`
//! plus at least one of the `estimand`/`estimator` labels is required; every
//! other column is optional and individual diagnosands simply come back
//! `Missing` when their operands are absent.

use crate::table::Table;

/// Design identifier: one value per declared design.
pub const DESIGN: &str = "design";
/// Replicate cluster key: the id of the Monte Carlo draw a row came from.
/// Rows sharing a `sim_id` are resampled together by the bootstrap.
pub const SIM_ID: &str = "sim_id";
/// Estimand label (the inquiry the row answers).
pub const ESTIMAND: &str = "estimand";
/// Estimator label.
pub const ESTIMATOR: &str = "estimator";
/// Coefficient/term label within an estimator.
pub const TERM: &str = "term";

/// True value of the estimand in this draw.
pub const ESTIMAND_VALUE: &str = "estimand_value";
/// Point estimate.
pub const ESTIMATE: &str = "estimate";
/// Estimated standard error.
pub const STD_ERROR: &str = "std_error";
/// P-value of the estimate.
pub const P_VALUE: &str = "p_value";
/// Confidence interval bounds.
pub const CONF_LOW: &str = "conf_low";
pub const CONF_HIGH: &str = "conf_high";

/// Replicate index column added by the bootstrap engine.
pub const BOOTSTRAP_ID: &str = "bootstrap_id";
/// Simulation count column added by the result assembler.
pub const N_SIMS: &str = "n_sims";

/// Default composite grouping key, in canonical order. The diagnosis entry
/// point restricts this to the columns actually present.
pub const DEFAULT_GROUP_BY: &[&str] = &[DESIGN, ESTIMAND, ESTIMATOR, TERM];

/// Whether the table carries any estimand/estimator labeling at all.
/// A table with neither cannot be diagnosed.
pub fn identifying_columns_present(table: &Table) -> bool {
    table.has_column(ESTIMAND) || table.has_column(ESTIMATOR)
}

/// The default grouping key restricted to columns present in `table`,
/// followed by `extra` columns (also restricted).
pub fn effective_group_by(table: &Table, extra: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = DEFAULT_GROUP_BY
        .iter()
        .filter(|k| table.has_column(k))
        .map(|k| k.to_string())
        .collect();
    for col in extra {
        if table.has_column(col) && !keys.contains(col) {
            keys.push(col.clone());
        }
    }
    keys
}
