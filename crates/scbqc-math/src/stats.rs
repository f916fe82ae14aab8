//! Error statistics over a delta series.
//!
//! Conventions match numpy: `std` is the population deviation (ddof = 0),
//! RMSE is `sqrt(mean(x²))`.

use ndarray::Array1;

/// Summary statistics of a non-empty error series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    pub count: usize,
    pub mean: f64,
    pub mean_abs: f64,
    pub max_abs: f64,
    pub std_pop: f64,
    pub rmse: f64,
}

/// Compute [`ErrorStats`]; `None` for an empty series.
pub fn error_stats(values: &[f64]) -> Option<ErrorStats> {
    if values.is_empty() {
        return None;
    }
    let x = Array1::from(values.to_vec());
    let abs = x.mapv(f64::abs);

    let mean = x.mean()?;
    let mean_abs = abs.mean()?;
    let max_abs = abs.fold(0.0_f64, |acc, &v| acc.max(v));
    let std_pop = x.std(0.0);
    let rmse = x.mapv(|v| v * v).mean()?.sqrt();

    Some(ErrorStats {
        count: x.len(),
        mean,
        mean_abs,
        max_abs,
        std_pop,
        rmse,
    })
}
