//! Behavioral feature extraction.
//!
//! For every transaction we derive rolling per-card statistics under a strict
//! causal contract: the window for record k is built from the card's amounts
//! shifted by one position, so a record never contributes to its own rolling
//! mean/std/count and never sees the future. Missing rolling values (too few
//! prior transactions) are filled with 0 after computation — this conflates
//! "new card" with "stable behavior" and is a deliberate, known trade-off.

use crate::{
    schema::{FeatureFrame, FeatureSchema},
    timeline::entity_runs,
    types::TransactionRecord,
};
use chrono::{Datelike, Timelike};

/// Epsilon in the z-score denominator; keeps the fill-then-divide
/// interaction from producing infinities.
const ZSCORE_EPS: f64 = 1e-6;

/// Canonical feature column order. This is the schema contract consumed by
/// the normalizer, the scoring side, and the drift detectors.
pub const FEATURE_COLUMNS: [&str; 13] = [
    "log_amt",
    "time_since_last",
    "hour",
    "day_of_week",
    "rolling_mean_amt",
    "rolling_std_amt",
    "rolling_txn_count",
    "amt_zscore",
    "city_pop",
    "lat",
    "long",
    "merch_lat",
    "merch_long",
];

pub fn feature_schema() -> FeatureSchema {
    FeatureSchema::from_names(&FEATURE_COLUMNS)
}

pub struct FeatureBuilder {
    window: usize,
}

impl FeatureBuilder {
    /// `window` is the trailing window size W for rolling statistics.
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "rolling window must be positive");
        Self { window }
    }

    /// Build one feature row per record.
    ///
    /// Precondition: `records` is sorted by (card_id, timestamp) — see
    /// `timeline::sort_by_entity_time`. Output rows are aligned 1:1 with the
    /// input order.
    pub fn build(&self, records: &[TransactionRecord]) -> FeatureFrame {
        let mut frame = FeatureFrame::new(feature_schema());
        for run in entity_runs(records) {
            self.push_timeline_rows(run, &mut frame);
        }
        frame
    }

    fn push_timeline_rows(&self, timeline: &[TransactionRecord], frame: &mut FeatureFrame) {
        let amounts: Vec<f64> = timeline.iter().map(|t| t.amount).collect();

        for (k, txn) in timeline.iter().enumerate() {
            // Trailing window of prior amounts, current record excluded.
            let lo = k.saturating_sub(self.window);
            let priors = &amounts[lo..k];

            let rolling_count = priors.len() as f64;
            let rolling_mean = if priors.is_empty() {
                0.0 // fill for missing
            } else {
                priors.iter().sum::<f64>() / priors.len() as f64
            };
            // Sample std is undefined below 2 observations; filled with 0.
            let rolling_std = if priors.len() < 2 {
                0.0
            } else {
                let mean = priors.iter().sum::<f64>() / priors.len() as f64;
                let var = priors.iter().map(|a| (a - mean).powi(2)).sum::<f64>()
                    / (priors.len() - 1) as f64;
                var.sqrt()
            };

            let mut amt_zscore = (txn.amount - rolling_mean) / (rolling_std + ZSCORE_EPS);
            if !amt_zscore.is_finite() {
                amt_zscore = 0.0;
            }

            let time_since_last = if k == 0 {
                0.0
            } else {
                let gap = txn.timestamp - timeline[k - 1].timestamp;
                gap.num_milliseconds() as f64 / 1000.0
            };

            frame.push_row(vec![
                txn.amount.ln_1p(),
                time_since_last,
                txn.timestamp.hour() as f64,
                txn.timestamp.weekday().num_days_from_monday() as f64,
                rolling_mean,
                rolling_std,
                rolling_count,
                amt_zscore,
                txn.city_pop,
                txn.lat,
                txn.long,
                txn.merch_lat,
                txn.merch_long,
            ]);
        }
    }
}
