//! Score-distribution summary statistics.

use serde::{Deserialize, Serialize};

/// Summary of a score population, one per monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetrics {
    pub mean: f64,
    pub std: f64,
    pub p95: f64,
    pub p99: f64,
}

pub fn compute_score_metrics(scores: &[f64]) -> ScoreMetrics {
    ScoreMetrics {
        mean: mean(scores),
        std: sample_std(scores),
        p95: percentile(scores, 95.0),
        p99: percentile(scores, 99.0),
    }
}

/// Fraction of scores at or above the operating threshold.
pub fn alert_rate(scores: &[f64], threshold: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let hits = scores.iter().filter(|&&s| s >= threshold).count();
    hits as f64 / scores.len() as f64
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator); 0 below 2 observations.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Linear-interpolation percentile, `q` in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}
