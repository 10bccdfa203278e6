//! Reference window selection and score baseline freezing.

use crate::{
    error::{PipelineError, PipelineResult},
    metrics::{self, percentile},
    schema::FeatureFrame,
};
use serde::{Deserialize, Serialize};

/// Contiguous leading slice of an already time-ordered feature matrix:
/// the first `floor(fraction * N)` rows, order preserved. The selector
/// never re-sorts; ordering is the sorter's job.
pub fn select_reference(frame: &FeatureFrame, fraction: f64) -> FeatureFrame {
    let n = (fraction * frame.n_rows() as f64).floor() as usize;
    frame.head(n)
}

/// Frozen summary of the reference score population: the drift baseline.
/// Computed once per monitoring epoch; read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBaseline {
    pub mean: f64,
    pub std: f64,
    /// Assumed-stable operating alert rate (config, not derived).
    pub alert_rate: f64,
    /// Fixed anomaly threshold: a percentile of the reference scores.
    pub threshold: f64,
}

impl ScoreBaseline {
    pub fn freeze(
        reference_scores: &[f64],
        operating_alert_rate: f64,
        threshold_percentile: f64,
    ) -> PipelineResult<Self> {
        if reference_scores.is_empty() {
            return Err(PipelineError::EmptyInput(
                "cannot freeze a baseline from zero reference scores".into(),
            ));
        }
        Ok(Self {
            mean: metrics::mean(reference_scores),
            std: metrics::sample_std(reference_scores),
            alert_rate: operating_alert_rate,
            threshold: percentile(reference_scores, threshold_percentile),
        })
    }
}
