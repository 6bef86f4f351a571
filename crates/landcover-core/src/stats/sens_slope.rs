//! Theil-Sen slope estimator over an evenly spaced series.
use super::median;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensSlope {
    /// Change per step of the series index.
    pub slope: f64,
    pub intercept: f64,
}

/// Median of the pairwise slopes `(x[j] - x[i]) / (j - i)`, `i < j`.
///
/// Slopes are in units per position, so a yearly series with gaps is treated
/// as if its samples were consecutive. The intercept is
/// `median(x) - median(0..n) * slope`. Returns `None` below two values.
pub fn sens_slope(x: &[f64]) -> Option<SensSlope> {
    let n = x.len();
    if n < 2 {
        return None;
    }

    let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in i + 1..n {
            slopes.push((x[j] - x[i]) / (j - i) as f64);
        }
    }
    let slope = median(&slopes)?;
    let positions: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let intercept = median(x)? - median(&positions)? * slope;
    Some(SensSlope { slope, intercept })
}
