//! Dynamic cell values for simulation tables.
//!
//! Simulation tables mix numeric estimates with string labels and absent
//! cells, so cells are dynamically typed. `Missing` is a first-class value:
//! grouping treats it as one more category and summaries skip it, so a row
//! with an absent label is never silently dropped.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single table cell.
///
/// Construct floats through [`Value::num`], which maps NaN to `Missing`.
/// Equality, ordering, and hashing unify `Int` and `Num` numerically and
/// treat a raw NaN the same as `Missing`, so group keys stay consistent
/// however a numeric cell was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Num(f64),
    Bool(bool),
    Str(String),
    Missing,
}

impl Value {
    /// Numeric value; NaN becomes `Missing`.
    pub fn num(v: f64) -> Self {
        if v.is_nan() {
            Value::Missing
        } else {
            Value::Num(v)
        }
    }

    /// Numeric value or `Missing` for `None`.
    pub fn opt_num(v: Option<f64>) -> Self {
        match v {
            Some(v) => Value::num(v),
            None => Value::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing) || matches!(self, Value::Num(v) if v.is_nan())
    }

    /// Numeric view: `Num` and `Int` cells, `None` otherwise (including NaN).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(v) if !v.is_nan() => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Sort rank of the canonical type: numerics, then bools, then strings,
    /// then missing last (missing groups sort after everything, like NA).
    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Num(v) if !v.is_nan() => 0,
            Value::Num(_) => 3,
            Value::Bool(_) => 1,
            Value::Str(_) => 2,
            Value::Missing => 3,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ra, rb) = (self.rank(), other.rank());
        if ra != rb {
            return ra.cmp(&rb);
        }
        match ra {
            0 => {
                // Both numeric and NaN-free; partial_cmp cannot fail.
                let a = self.as_f64().unwrap_or(0.0);
                let b = other.as_f64().unwrap_or(0.0);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            1 => match (self, other) {
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
            2 => match (self, other) {
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
            _ => Ordering::Equal,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let rank = self.rank();
        rank.hash(state);
        match rank {
            0 => {
                // Int and Num hash through the same numeric image so that
                // Int(2) and Num(2.0) land in the same group. Normalize -0.0.
                let v = self.as_f64().unwrap_or(0.0);
                let v = if v == 0.0 { 0.0 } else { v };
                v.to_bits().hash(state);
            }
            1 => {
                if let Value::Bool(b) = self {
                    b.hash(state);
                }
            }
            2 => {
                if let Value::Str(s) = self {
                    s.hash(state);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Num(v) if v.is_nan() => write!(f, "NA"),
            Value::Num(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Missing => write!(f, "NA"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::num(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    // ── Construction ──

    #[test]
    fn nan_becomes_missing() {
        assert!(Value::num(f64::NAN).is_missing());
        assert_eq!(Value::num(f64::NAN), Value::Missing);
    }

    #[test]
    fn opt_num_maps_none_to_missing() {
        assert_eq!(Value::opt_num(None), Value::Missing);
        assert_eq!(Value::opt_num(Some(1.5)), Value::Num(1.5));
    }

    // ── Equality and hashing ──

    #[test]
    fn int_and_num_unify() {
        assert_eq!(Value::Int(2), Value::Num(2.0));
        assert_eq!(hash_of(&Value::Int(2)), hash_of(&Value::Num(2.0)));
    }

    #[test]
    fn raw_nan_equals_missing() {
        assert_eq!(Value::Num(f64::NAN), Value::Missing);
        assert_eq!(hash_of(&Value::Num(f64::NAN)), hash_of(&Value::Missing));
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(Value::Num(-0.0), Value::Num(0.0));
        assert_eq!(hash_of(&Value::Num(-0.0)), hash_of(&Value::Num(0.0)));
    }

    #[test]
    fn distinct_types_are_unequal() {
        assert_ne!(Value::Str("1".into()), Value::Int(1));
        assert_ne!(Value::Bool(true), Value::Int(1));
    }

    // ── Ordering ──

    #[test]
    fn numeric_order() {
        assert!(Value::Num(1.0) < Value::Num(2.0));
        assert!(Value::Int(1) < Value::Num(1.5));
    }

    #[test]
    fn missing_sorts_last() {
        assert!(Value::Num(1e18) < Value::Missing);
        assert!(Value::Str("z".into()) < Value::Missing);
        assert!(Value::Bool(true) < Value::Str("a".into()));
    }

    // ── Numeric view ──

    #[test]
    fn as_f64_views() {
        assert_eq!(Value::Num(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Int(-3).as_f64(), Some(-3.0));
        assert_eq!(Value::Str("2.5".into()).as_f64(), None);
        assert_eq!(Value::Missing.as_f64(), None);
    }

    // ── Serde ──

    #[test]
    fn serde_round_trip() {
        let values = vec![
            Value::Int(3),
            Value::Num(1.25),
            Value::Bool(true),
            Value::Str("ols".into()),
            Value::Missing,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[3,1.25,true,"ols",null]"#);
        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn display_missing_as_na() {
        assert_eq!(Value::Missing.to_string(), "NA");
        assert_eq!(Value::Num(2.0).to_string(), "2");
        assert_eq!(Value::Str("ate".into()).to_string(), "ate");
    }
}
