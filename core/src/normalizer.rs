//! Global feature normalization.
//!
//! A `Scaler` is fitted once over the full feature matrix (per-column mean
//! and standard deviation) and applied identically to any future matrix with
//! the exact same column schema. It is immutable after fitting; a model
//! upgrade replaces the whole artifact rather than mutating it in place.

use crate::{
    error::{PipelineError, PipelineResult},
    schema::{FeatureFrame, FeatureSchema},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    schema: FeatureSchema,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Scaler {
    /// Fit per-column mean and population standard deviation.
    /// A zero-variance column gets scale 1.0 so transform is well defined.
    pub fn fit(frame: &FeatureFrame) -> PipelineResult<Self> {
        let n = frame.n_rows();
        if n == 0 {
            return Err(PipelineError::EmptyInput(
                "cannot fit scaler on an empty feature matrix".into(),
            ));
        }
        let cols = frame.schema().len();
        let mut means = vec![0.0; cols];
        let mut stds = vec![0.0; cols];

        for row in frame.rows() {
            for (j, v) in row.iter().enumerate() {
                means[j] += v;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }
        for row in frame.rows() {
            for (j, v) in row.iter().enumerate() {
                stds[j] += (v - means[j]).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n as f64).sqrt();
            if *s == 0.0 {
                *s = 1.0; // constant column, benign scale
            }
        }

        Ok(Self {
            schema: frame.schema().clone(),
            means,
            stds,
        })
    }

    /// Apply `(x - mean) / std` elementwise. The frame's schema must match
    /// the fitted schema exactly (names AND order); anything else is a fatal
    /// SchemaMismatch, never a silent positional misalignment.
    pub fn transform(&self, frame: &FeatureFrame) -> PipelineResult<FeatureFrame> {
        self.schema.require_exact(frame.schema())?;

        let rows = frame
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| (v - self.means[j]) / self.stds[j])
                    .collect()
            })
            .collect();
        FeatureFrame::with_rows(self.schema.clone(), rows)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}
