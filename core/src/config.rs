//! Pipeline and monitoring configuration.
//!
//! Every operating assumption lives here rather than as a constant buried in
//! a detector: the rolling window, the reference-window fraction, the static
//! alert-rate baseline, drift sensitivities, and the quorum size. Loaded from
//! a JSON file or constructed with defaults.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Trailing window size W for per-card rolling statistics.
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// Leading fraction of the normalized feature matrix frozen as the
    /// drift reference window.
    #[serde(default = "default_reference_fraction")]
    pub reference_fraction: f64,

    /// Score-drift sensitivity: drift when |current_mean - baseline_mean|
    /// exceeds this many baseline standard deviations.
    #[serde(default = "default_score_n_std")]
    pub score_n_std: f64,

    /// Significance level for the per-feature KS tests.
    #[serde(default = "default_ks_alpha")]
    pub ks_alpha: f64,

    /// Assumed-stable operating alert rate (the design operating point).
    #[serde(default = "default_baseline_alert_rate")]
    pub baseline_alert_rate: f64,

    /// Absolute tolerance on the alert rate before flagging drift.
    #[serde(default = "default_alert_rate_tolerance")]
    pub alert_rate_tolerance: f64,

    /// Quorum: how many of the three signal families must agree.
    #[serde(default = "default_min_signals")]
    pub min_signals: usize,

    /// Percentile of the reference score population used as the fixed
    /// anomaly threshold. Not the same thing as `ks_alpha`.
    #[serde(default = "default_threshold_percentile")]
    pub threshold_percentile: f64,

    /// Feature whose KS statistic is written to every metrics-log row.
    #[serde(default = "default_designated_feature")]
    pub designated_feature: String,
}

fn default_rolling_window() -> usize {
    10
}
fn default_reference_fraction() -> f64 {
    0.2
}
fn default_score_n_std() -> f64 {
    3.0
}
fn default_ks_alpha() -> f64 {
    0.05
}
fn default_baseline_alert_rate() -> f64 {
    0.01
}
fn default_alert_rate_tolerance() -> f64 {
    0.002
}
fn default_min_signals() -> usize {
    2
}
fn default_threshold_percentile() -> f64 {
    99.0
}
fn default_designated_feature() -> String {
    "log_amt".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            reference_fraction: default_reference_fraction(),
            score_n_std: default_score_n_std(),
            ks_alpha: default_ks_alpha(),
            baseline_alert_rate: default_baseline_alert_rate(),
            alert_rate_tolerance: default_alert_rate_tolerance(),
            min_signals: default_min_signals(),
            threshold_percentile: default_threshold_percentile(),
            designated_feature: default_designated_feature(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file. Absent keys fall back to
    /// their defaults; a missing file is a fatal MissingArtifact.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::missing("config", format!("{}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}
