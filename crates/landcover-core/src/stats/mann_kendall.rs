//! Original (non-seasonal, uncorrected) Mann-Kendall trend test.
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{normal_ppf, two_sided_p};

/// Significance level of the two-sided test.
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "increasing")]
    Increasing,
    #[serde(rename = "decreasing")]
    Decreasing,
    #[serde(rename = "no trend")]
    NoTrend,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::NoTrend => "no trend",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannKendall {
    pub trend: Trend,
    /// Whether the null hypothesis of no trend is rejected at `alpha`.
    pub h: bool,
    pub p: f64,
    pub z: f64,
    /// Kendall's tau, `S / (n(n-1)/2)`.
    pub tau: f64,
    pub s: f64,
    pub var_s: f64,
}

/// Sum of `sign(x[j] - x[i])` over all pairs `i < j`.
fn mk_score(x: &[f64]) -> f64 {
    let mut s = 0i64;
    for i in 0..x.len() {
        for j in i + 1..x.len() {
            let d = x[j] - x[i];
            if d > 0.0 {
                s += 1;
            } else if d < 0.0 {
                s -= 1;
            }
        }
    }
    s as f64
}

/// Variance of S with the correction for tied groups.
fn mk_variance(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mut sorted = x.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut ties = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let t = (j - i) as f64;
        ties += t * (t - 1.0) * (2.0 * t + 5.0);
        i = j;
    }
    (n * (n - 1.0) * (2.0 * n + 5.0) - ties) / 18.0
}

/// Run the test at significance level `alpha`.
///
/// Series shorter than two values carry no information and report
/// `no trend` with `p = 1`.
pub fn mann_kendall_with_alpha(x: &[f64], alpha: f64) -> MannKendall {
    let n = x.len();
    if n < 2 {
        return MannKendall { trend: Trend::NoTrend, h: false, p: 1.0, z: 0.0, tau: 0.0, s: 0.0, var_s: 0.0 };
    }

    let s = mk_score(x);
    let var_s = mk_variance(x);
    let z = if var_s <= 0.0 || s == 0.0 {
        0.0
    } else if s > 0.0 {
        (s - 1.0) / var_s.sqrt()
    } else {
        (s + 1.0) / var_s.sqrt()
    };

    let p = two_sided_p(z);
    let h = z.abs() > normal_ppf(1.0 - alpha / 2.0);
    let trend = match (h, z > 0.0) {
        (true, true) => Trend::Increasing,
        (true, false) => Trend::Decreasing,
        (false, _) => Trend::NoTrend,
    };
    let tau = s / (0.5 * n as f64 * (n as f64 - 1.0));

    MannKendall { trend, h, p, z, tau, s, var_s }
}

/// Run the test at the conventional 5 % level.
pub fn mann_kendall(x: &[f64]) -> MannKendall {
    mann_kendall_with_alpha(x, DEFAULT_ALPHA)
}
