//! Monitoring run orchestration.
//!
//! A `MonitorContext` is the explicit, immutable bundle of everything one
//! run needs: config, fitted scaler, frozen reference window, and score
//! baseline. It is constructed once (typically loaded from the store at
//! process start) and never mutated; a refreshed baseline is a new context,
//! swapped in wholesale, so concurrent readers never observe a half-updated
//! artifact set.

use crate::{
    config::PipelineConfig,
    decision,
    drift::{self, KsResult},
    error::PipelineResult,
    metrics::{self, ScoreMetrics},
    normalizer::Scaler,
    reference::ScoreBaseline,
    schema::FeatureFrame,
    store::{MetricsLogEntry, PipelineStore, SET_CURRENT, SET_REFERENCE},
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Result of one monitoring run. Ephemeral — callers log or print it; only
/// the metrics-log row is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub run_id: String,
    pub score_drift: bool,
    pub alert_drift: bool,
    /// Per-feature verdicts, intersection columns only. Kept at full
    /// granularity even though the quorum vote collapses it to one signal.
    pub feature_drifts: BTreeMap<String, bool>,
    /// Features present on both sides but skipped (degenerate sample).
    /// Never counted as "no drift".
    pub skipped_features: Vec<String>,
    pub drift_detected: bool,
    pub current_metrics: ScoreMetrics,
    pub current_alert_rate: f64,
}

#[derive(Debug)]
pub struct MonitorContext {
    config: PipelineConfig,
    scaler: Scaler,
    reference: FeatureFrame,
    baseline: ScoreBaseline,
}

impl MonitorContext {
    pub fn new(
        config: PipelineConfig,
        scaler: Scaler,
        reference: FeatureFrame,
        baseline: ScoreBaseline,
    ) -> Self {
        Self {
            config,
            scaler,
            reference,
            baseline,
        }
    }

    /// Load all frozen artifacts from the store. Any missing artifact is
    /// fatal here — a run must never start against a partial baseline.
    pub fn load(store: &PipelineStore, config: PipelineConfig) -> PipelineResult<Self> {
        let scaler = store.load_scaler()?;
        let reference = store.load_feature_frame(SET_REFERENCE)?;
        let baseline = store.load_baseline()?;
        Ok(Self::new(config, scaler, reference, baseline))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn baseline(&self) -> &ScoreBaseline {
        &self.baseline
    }

    /// Execute one monitoring run against the current feature set and score
    /// set in the store, append a metrics-log row, and return the report.
    ///
    /// Missing scores or features abort before any signal is computed; no
    /// partial report is emitted.
    pub fn run(&self, store: &PipelineStore) -> PipelineResult<DriftReport> {
        let scores = store.load_scores(SET_CURRENT)?;
        let current = store.load_feature_frame(SET_CURRENT)?;
        let report = self.evaluate(&current, &scores);

        let designated = self.designated_ks(&current);
        if designated.is_none() {
            log::warn!(
                "designated feature '{}' could not be measured this run; \
                 logging null instead of a fake zero statistic",
                self.config.designated_feature
            );
        }
        store.append_metrics(&MetricsLogEntry {
            run_id: report.run_id.clone(),
            logged_at: Utc::now(),
            metrics: report.current_metrics,
            alert_rate: report.current_alert_rate,
            feature_name: self.config.designated_feature.clone(),
            feature_ks_stat: designated.map(|k| k.statistic),
            feature_drift: designated.map(|k| k.drifted),
            drift_detected: report.drift_detected,
        })?;

        Ok(report)
    }

    /// Pure evaluation of the three signal families plus the quorum vote.
    pub fn evaluate(&self, current: &FeatureFrame, scores: &[f64]) -> DriftReport {
        let run_id = Uuid::new_v4().to_string();

        let current_metrics = metrics::compute_score_metrics(scores);
        let current_alert_rate = metrics::alert_rate(scores, self.baseline.threshold);

        let score_drift = drift::score_drift(
            self.baseline.mean,
            self.baseline.std,
            current_metrics.mean,
            self.config.score_n_std,
        );

        let alert_drift = drift::alert_rate_drift(
            self.baseline.alert_rate,
            current_alert_rate,
            self.config.alert_rate_tolerance,
        );

        let (feature_drifts, skipped_features) = self.feature_drift_map(current);

        let drift_detected = decision::overall_drift(
            score_drift,
            &feature_drifts,
            alert_drift,
            self.config.min_signals,
        );

        if drift_detected {
            log::warn!(
                "run={run_id} DRIFT DETECTED (score={score_drift}, alert={alert_drift}, \
                 features_drifted={})",
                feature_drifts.values().filter(|&&d| d).count()
            );
        } else {
            log::info!("run={run_id} no drift (quorum {} not met)", self.config.min_signals);
        }

        DriftReport {
            run_id,
            score_drift,
            alert_drift,
            feature_drifts,
            skipped_features,
            drift_detected,
            current_metrics,
            current_alert_rate,
        }
    }

    /// KS verdict per feature column present in BOTH schemas. Columns on
    /// one side only are compared by nobody; columns left with fewer than
    /// two finite values after dropping non-finite ones are degenerate —
    /// skipped with a warning and excluded from the vote.
    fn feature_drift_map(
        &self,
        current: &FeatureFrame,
    ) -> (BTreeMap<String, bool>, Vec<String>) {
        let mut drifts = BTreeMap::new();
        let mut skipped = Vec::new();

        let common = self.reference.schema().intersection(current.schema());
        if common.is_empty() {
            log::warn!("no common features between reference and current data");
            return (drifts, skipped);
        }

        for name in common {
            let ref_col = self.reference.finite_column(&name).unwrap_or_default();
            let cur_col = current.finite_column(&name).unwrap_or_default();

            if ref_col.len() < 2 || cur_col.len() < 2 {
                log::warn!(
                    "skipping '{name}' (degenerate sample after dropping non-finite values: \
                     reference n={}, current n={})",
                    ref_col.len(),
                    cur_col.len()
                );
                skipped.push(name);
                continue;
            }

            match drift::ks_drift(&ref_col, &cur_col, self.config.ks_alpha) {
                Ok(result) => {
                    drifts.insert(name, result.drifted);
                }
                Err(e) => {
                    log::warn!("drift check failed for '{name}': {e}");
                    skipped.push(name);
                }
            }
        }
        (drifts, skipped)
    }

    /// KS result for the designated metrics-log feature, if it can be
    /// computed on this batch.
    fn designated_ks(&self, current: &FeatureFrame) -> Option<KsResult> {
        let name = &self.config.designated_feature;
        let ref_col = self.reference.finite_column(name)?;
        let cur_col = current.finite_column(name)?;
        drift::ks_drift(&ref_col, &cur_col, self.config.ks_alpha).ok()
    }
}
