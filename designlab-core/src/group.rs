//! Group-key partitioner.
//!
//! Splits a table into ordered partitions by a composite key. Missing values
//! form their own category, so every row lands in exactly one partition.
//! Partitions come back in first-encounter order, which is deterministic for
//! identical input; the result assembler applies the user-facing sort later.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::table::Table;
use crate::value::Value;

/// Composite tuple of grouping-column values identifying one partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(pub Vec<Value>);

/// One partition: its key, the sub-table of matching rows (original order),
/// and the first matching row as the representative label row.
#[derive(Debug, Clone)]
pub struct Partition {
    pub key: GroupKey,
    pub rows: Table,
    pub label: Vec<Value>,
}

/// Result of partitioning: the key columns actually used (requested keys
/// restricted to present columns) and the ordered partitions.
#[derive(Debug, Clone)]
pub struct Grouping {
    pub keys: Vec<String>,
    pub partitions: Vec<Partition>,
}

/// Partition `table` by `keys` (restricted to columns actually present).
///
/// An empty effective key list puts the whole table into a single partition.
/// Every input row appears in exactly one partition; the union of partitions
/// reconstructs the input row set.
pub fn partition_by(table: &Table, keys: &[String]) -> Grouping {
    let present: Vec<String> = keys
        .iter()
        .filter(|k| table.has_column(k))
        .cloned()
        .collect();
    let idxs: Vec<usize> = present
        .iter()
        .filter_map(|k| table.column_index(k))
        .collect();

    let mut order: Vec<GroupKey> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();

    for r in 0..table.n_rows() {
        let key = GroupKey(idxs.iter().map(|&c| table.row(r)[c].clone()).collect());
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = order.len();
                index.insert(key.clone(), slot);
                order.push(key);
                buckets.push(Vec::new());
                slot
            }
        };
        buckets[slot].push(r);
    }

    let partitions = order
        .into_iter()
        .zip(buckets)
        .map(|(key, rows)| {
            let label = table.row(rows[0]).to_vec();
            Partition {
                key,
                rows: table.select_rows(&rows),
                label,
            }
        })
        .collect();

    Grouping {
        keys: present,
        partitions,
    }
}

/// Human-readable key description for error messages: `design=a, term=NA`.
pub fn describe_key(keys: &[String], key: &GroupKey) -> String {
    if keys.is_empty() {
        return "all rows".to_string();
    }
    let mut out = String::new();
    for (name, value) in keys.iter().zip(&key.0) {
        if !out.is_empty() {
            out.push_str(", ");
        }
        let _ = write!(out, "{name}={value}");
    }
    out
}
