//! Quorum drift decision.
//!
//! The per-feature drift map is collapsed to one "any feature drifted"
//! boolean before voting, so a single noisy feature cannot outvote the other
//! signal families. Granularity is kept in the report for diagnosis.

use std::collections::BTreeMap;

/// Count how many of {score drift, alert-rate drift, any feature drift}
/// fired; overall drift iff the count reaches the quorum `min_signals`.
pub fn overall_drift(
    score_drift: bool,
    feature_drifts: &BTreeMap<String, bool>,
    alert_drift: bool,
    min_signals: usize,
) -> bool {
    let any_feature_drift = feature_drifts.values().any(|&d| d);
    let fired = [score_drift, alert_drift, any_feature_drift]
        .iter()
        .filter(|&&s| s)
        .count();
    fired >= min_signals
}
