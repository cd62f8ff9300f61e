//! Result assembler — the final diagnosis table.
//!
//! Outer-merges the point-estimate table with the bootstrap standard errors,
//! the per-group simulation counts, and the design-parameters table. Merges
//! never drop rows: a group absent from one side gets missing fill. Rows are
//! then sorted lexicographically by the grouping columns and columns are
//! reordered to the canonical layout: design-parameter columns first, then
//! the remaining grouping columns, then `n_sims`, then each statistic
//! followed immediately by its `se(...)` column.

use designlab_core::group::partition_by;
use designlab_core::schema;
use designlab_core::table::Table;
use designlab_core::value::Value;

use crate::aggregate::Aggregated;
use crate::bootstrap::{se_name, BootstrapOutput};

/// Per-group simulation counts: distinct `sim_id` values when the cluster
/// column is present (a draw may produce several rows per group), raw row
/// count otherwise.
pub fn simulation_counts(simulations: &Table, key_columns: &[String]) -> Table {
    let grouping = partition_by(simulations, key_columns);

    let mut columns: Vec<String> = grouping.keys.clone();
    columns.push(schema::N_SIMS.to_string());
    let mut out = Table::new(columns);

    for part in &grouping.partitions {
        let n = match part.rows.column(schema::SIM_ID) {
            Some(ids) => {
                let distinct: std::collections::HashSet<&Value> = ids.into_iter().collect();
                distinct.len()
            }
            None => part.rows.n_rows(),
        };
        let mut row = part.key.0.clone();
        row.push(Value::Int(n as i64));
        out.push_row(row);
    }
    out
}

/// Merge everything into the final diagnosis table.
pub fn assemble(
    point: &Aggregated,
    bootstrap: Option<&BootstrapOutput>,
    counts: &Table,
    parameters: Option<&Table>,
) -> Table {
    let mut merged = point.table.clone();

    if let Some(bootstrap) = bootstrap {
        merged = merged.outer_merge(&bootstrap.standard_errors, &point.key_columns);
    }
    merged = merged.outer_merge(counts, &point.key_columns);

    // Design parameters are optional metadata: absent table, fewer columns.
    if let Some(parameters) = parameters {
        if merged.has_column(schema::DESIGN) && parameters.has_column(schema::DESIGN) {
            merged = merged.outer_merge(parameters, &[schema::DESIGN.to_string()]);
        }
    }

    merged.sort_by(&point.key_columns);
    merged.reorder_columns(&canonical_order(&merged, point, parameters));
    merged
}

/// Canonical column order for the final table.
fn canonical_order(
    merged: &Table,
    point: &Aggregated,
    parameters: Option<&Table>,
) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(merged.n_cols());
    let push = |order: &mut Vec<String>, name: &str| {
        if merged.has_column(name) && !order.iter().any(|c| c == name) {
            order.push(name.to_string());
        }
    };

    push(&mut order, schema::DESIGN);
    if let Some(parameters) = parameters {
        for col in parameters.columns() {
            push(&mut order, col);
        }
    }
    for key in &point.key_columns {
        push(&mut order, key);
    }
    push(&mut order, schema::N_SIMS);
    for stat in &point.stat_columns {
        push(&mut order, stat);
        push(&mut order, &se_name(stat));
    }
    // Anything left over keeps its current relative position.
    for col in merged.columns() {
        push(&mut order, col);
    }
    order
}
