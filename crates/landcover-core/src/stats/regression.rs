//! Least-squares line fit and Pearson correlation.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation of the fitted pairs; 0 when `y` is constant.
    pub r: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

fn means(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    (x.iter().sum::<f64>() / n, y.iter().sum::<f64>() / n)
}

/// Ordinary least squares `y = slope * x + intercept`.
///
/// `None` when the slices differ in length, hold fewer than two points, or
/// `x` has no spread.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let (mx, my) = means(x, y);
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
        sxy += (a - mx) * (b - my);
    }
    if sxx < 1e-14 {
        return None;
    }
    let slope = sxy / sxx;
    let r = if syy < 1e-14 { 0.0 } else { (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0) };
    Some(LinearFit { slope, intercept: my - slope * mx, r })
}

/// Pearson correlation coefficient.
///
/// `None` when the slices differ in length, hold fewer than two points, or
/// either side is constant.
pub fn pearson_r(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let (mx, my) = means(x, y);
    let num: f64 = x.iter().zip(y).map(|(&a, &b)| (a - mx) * (b - my)).sum();
    let vx = x.iter().map(|&a| (a - mx).powi(2)).sum::<f64>().sqrt();
    let vy = y.iter().map(|&b| (b - my).powi(2)).sum::<f64>().sqrt();
    if vx < 1e-12 || vy < 1e-12 {
        return None;
    }
    Some((num / (vx * vy)).clamp(-1.0, 1.0))
}
