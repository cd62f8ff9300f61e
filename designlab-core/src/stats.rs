//! Summary-statistic helpers shared by diagnosand functions.
//!
//! Unlike a metrics pipeline that can report 0.0 for "nothing to compute",
//! a diagnosand must distinguish "zero" from "not computable", so these
//! return `Option` and the caller maps `None` to a missing cell.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator); `None` below 2 values.
pub fn sample_sd(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Share of values for which `pred` holds; `None` for an empty slice.
pub fn proportion<F: Fn(f64) -> bool>(values: &[f64], pred: F) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let hits = values.iter().filter(|&&v| pred(v)).count();
    Some(hits as f64 / values.len() as f64)
}
