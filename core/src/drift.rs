//! The three independent drift signals.
//!
//! Each detector is a pure function over summary statistics or raw samples;
//! orchestration (schema intersection, skip handling, the quorum vote) lives
//! in `monitor` and `decision`.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Score-distribution drift: the current mean has wandered more than
/// `n_std` baseline standard deviations from the baseline mean.
///
/// When `baseline_std` is 0 the right-hand side collapses to 0, so any
/// nonzero deviation drifts and an exact match does not. That is the
/// intended comparison semantics; do not guard it away.
pub fn score_drift(baseline_mean: f64, baseline_std: f64, current_mean: f64, n_std: f64) -> bool {
    (current_mean - baseline_mean).abs() > n_std * baseline_std
}

/// Alert-rate drift: absolute deviation from the operating rate beyond
/// `tolerance`. Boundary equality is not drift.
pub fn alert_rate_drift(baseline_rate: f64, current_rate: f64, tolerance: f64) -> bool {
    (current_rate - baseline_rate).abs() > tolerance
}

/// Outcome of one two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
    pub drifted: bool,
}

/// Two-sample Kolmogorov–Smirnov test for distributional equality.
///
/// The statistic is the supremum distance between the two empirical CDFs;
/// the p-value uses the asymptotic Kolmogorov distribution with the
/// small-sample correction from Numerical Recipes. Drift iff `p < alpha`.
///
/// Empty or single-point samples are a DegenerateSample error — callers
/// skip the feature rather than counting it as "no drift".
pub fn ks_drift(reference: &[f64], current: &[f64], alpha: f64) -> PipelineResult<KsResult> {
    if reference.len() < 2 || current.len() < 2 {
        return Err(PipelineError::DegenerateSample {
            name: "ks".into(),
            detail: format!(
                "need at least 2 points per side (reference n={}, current n={})",
                reference.len(),
                current.len()
            ),
        });
    }

    let statistic = ks_statistic(reference, current);

    let n = reference.len() as f64;
    let m = current.len() as f64;
    let en = (n * m / (n + m)).sqrt();
    let p_value = ks_p_value((en + 0.12 + 0.11 / en) * statistic);

    Ok(KsResult {
        statistic,
        p_value,
        drifted: p_value < alpha,
    })
}

/// Supremum distance between the empirical CDFs of two samples,
/// computed with a single merge walk over the sorted copies.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let mut xs = a.to_vec();
    let mut ys = b.to_vec();
    xs.sort_by(|u, v| u.total_cmp(v));
    ys.sort_by(|u, v| u.total_cmp(v));

    let (n, m) = (xs.len(), ys.len());
    let (mut i, mut j) = (0usize, 0usize);
    let mut d = 0.0f64;

    while i < n && j < m {
        let step = xs[i].min(ys[j]);
        while i < n && xs[i] <= step {
            i += 1;
        }
        while j < m && ys[j] <= step {
            j += 1;
        }
        let gap = (i as f64 / n as f64 - j as f64 / m as f64).abs();
        if gap > d {
            d = gap;
        }
    }
    d
}

/// Complementary CDF of the Kolmogorov distribution,
/// `Q(lambda) = 2 * sum_{k>=1} (-1)^{k-1} exp(-2 k^2 lambda^2)`.
fn ks_p_value(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut sum = 0.0f64;
    let mut sign = 1.0f64;
    for k in 1..=100 {
        let term = sign * (-2.0 * (k as f64).powi(2) * lambda * lambda).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}
