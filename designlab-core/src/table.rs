//! In-memory simulation tables.
//!
//! A [`Table`] is an ordered column registry plus row-major cells. It is the
//! shared currency between the partitioner, the aggregation engine, and the
//! bootstrap engine, so the operations here are exactly the ones those
//! components need: row selection by index, disjoint-union vertical concat,
//! lexicographic sort, and outer merge by key columns.
//!
//! Width invariants (every row as wide as the registry) are programmer
//! contracts and are enforced with assertions, not `Result`s.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A column-ordered, row-major table of dynamic values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table with the given column registry.
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. The row must match the registry width.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width {} does not match {} columns",
            row.len(),
            self.columns.len()
        );
        self.rows.push(row);
    }

    pub fn row(&self, r: usize) -> &[Value] {
        &self.rows[r]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Cell by row index and column name.
    pub fn cell(&self, r: usize, column: &str) -> Option<&Value> {
        let c = self.column_index(column)?;
        self.rows.get(r).map(|row| &row[c])
    }

    /// All values of a column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let c = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[c]).collect())
    }

    /// Numeric view of a column: `None` if the column is absent, per-cell
    /// `None` where the cell is non-numeric or missing.
    pub fn column_f64(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let c = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[c].as_f64()).collect())
    }

    /// New table holding the given rows, in the given order. Indices may
    /// repeat (bootstrap resamples do).
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Append a column with one value per existing row.
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) {
        assert_eq!(
            values.len(),
            self.rows.len(),
            "column '{name}' has {} values for {} rows",
            values.len(),
            self.rows.len()
        );
        assert!(!self.has_column(name), "column '{name}' already exists");
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Append a column filled with `Missing`.
    pub fn add_missing_column(&mut self, name: &str) {
        let fill = vec![Value::Missing; self.rows.len()];
        self.add_column(name, fill);
    }

    /// Disjoint-union vertical concat: `other`'s unseen columns are appended
    /// to the registry in their own order, and rows from either side carry
    /// `Missing` for columns the other side introduced.
    pub fn vstack_union(&mut self, other: &Table) {
        for col in &other.columns {
            if !self.has_column(col) {
                self.add_missing_column(col);
            }
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        for row in &other.rows {
            let aligned: Vec<Value> = mapping
                .iter()
                .map(|m| match m {
                    Some(c) => row[*c].clone(),
                    None => Value::Missing,
                })
                .collect();
            self.rows.push(aligned);
        }
    }

    /// Stable lexicographic sort by the given key columns (absent keys are
    /// skipped). Missing values sort last within each key.
    pub fn sort_by(&mut self, keys: &[String]) {
        let idxs: Vec<usize> = keys
            .iter()
            .filter_map(|k| self.column_index(k))
            .collect();
        if idxs.is_empty() {
            return;
        }
        self.rows.sort_by(|a, b| {
            for &c in &idxs {
                let ord = a[c].cmp(&b[c]);
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    /// Reorder columns to the given permutation of the current registry.
    pub fn reorder_columns(&mut self, order: &[String]) {
        assert_eq!(
            order.len(),
            self.columns.len(),
            "column order lists {} of {} columns",
            order.len(),
            self.columns.len()
        );
        let perm: Vec<usize> = order
            .iter()
            .map(|name| {
                self.column_index(name)
                    .unwrap_or_else(|| panic!("unknown column '{name}' in reorder"))
            })
            .collect();
        for row in &mut self.rows {
            let reordered: Vec<Value> = perm.iter().map(|&c| row[c].clone()).collect();
            *row = reordered;
        }
        self.columns = order.to_vec();
    }

    /// Outer merge on `keys` (present in both sides). Matched left rows gain
    /// the right side's non-key columns; unmatched rows from either side are
    /// kept with `Missing` fill. Keys are assumed unique per side; the first
    /// match wins.
    pub fn outer_merge(&self, right: &Table, keys: &[String]) -> Table {
        let key_idx_l: Vec<usize> = keys
            .iter()
            .filter_map(|k| self.column_index(k))
            .collect();
        let key_idx_r: Vec<usize> = keys
            .iter()
            .filter_map(|k| right.column_index(k))
            .collect();

        let right_extra: Vec<String> = right
            .columns
            .iter()
            .filter(|c| !self.has_column(c))
            .cloned()
            .collect();
        let mut out = Table::new(
            self.columns
                .iter()
                .chain(right_extra.iter())
                .cloned()
                .collect::<Vec<_>>(),
        );

        let mut right_lookup: HashMap<Vec<Value>, usize> = HashMap::new();
        for (i, row) in right.rows.iter().enumerate() {
            let key: Vec<Value> = key_idx_r.iter().map(|&c| row[c].clone()).collect();
            right_lookup.entry(key).or_insert(i);
        }

        let extra_idx: Vec<usize> = right_extra
            .iter()
            .filter_map(|c| right.column_index(c))
            .collect();

        let mut matched = vec![false; right.rows.len()];
        for row in &self.rows {
            let key: Vec<Value> = key_idx_l.iter().map(|&c| row[c].clone()).collect();
            let mut merged = row.clone();
            match right_lookup.get(&key) {
                Some(&ri) => {
                    matched[ri] = true;
                    for &c in &extra_idx {
                        merged.push(right.rows[ri][c].clone());
                    }
                }
                None => {
                    merged.extend(std::iter::repeat(Value::Missing).take(extra_idx.len()));
                }
            }
            out.push_row(merged);
        }

        // Right-only rows: keys and right columns filled, left-only Missing.
        for (ri, row) in right.rows.iter().enumerate() {
            if matched[ri] {
                continue;
            }
            let merged: Vec<Value> = out
                .columns
                .iter()
                .map(|col| match right.column_index(col) {
                    Some(c) => row[c].clone(),
                    None => Value::Missing,
                })
                .collect();
            out.push_row(merged);
        }

        out
    }
}
