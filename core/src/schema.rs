//! Explicit feature-matrix schema.
//!
//! RULE: column names and order are a contract. Every boundary crossing
//! (feature build, normalization, drift comparison, persistence) checks the
//! schema explicitly instead of trusting positional alignment.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Ordered list of feature column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn from_names(names: &[&str]) -> Self {
        Self {
            columns: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Symmetric intersection with another schema, sorted by name.
    /// Used by the feature drift detector: columns on one side only are
    /// compared by nobody.
    pub fn intersection(&self, other: &FeatureSchema) -> Vec<String> {
        let mut common: Vec<String> = self
            .columns
            .iter()
            .filter(|c| other.index_of(c).is_some())
            .cloned()
            .collect();
        common.sort();
        common
    }

    /// Fail fast unless `other` matches exactly — same names, same order.
    pub fn require_exact(&self, other: &FeatureSchema) -> PipelineResult<()> {
        if self != other {
            return Err(PipelineError::SchemaMismatch {
                expected: self.columns.clone(),
                actual: other.columns.clone(),
            });
        }
        Ok(())
    }
}

/// Row-major feature matrix with an explicit schema. One row per
/// transaction, aligned to the sorted transaction order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    schema: FeatureSchema,
    rows: Vec<Vec<f64>>,
}

impl FeatureFrame {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(schema: FeatureSchema, rows: Vec<Vec<f64>>) -> PipelineResult<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(anyhow::anyhow!(
                    "row {i} has {} values, schema has {} columns",
                    row.len(),
                    schema.len()
                )
                .into());
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn push_row(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.schema.len());
        self.rows.push(row);
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Copy out one named column, or None if the schema lacks it.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Copy out one named column with non-finite values dropped.
    /// This is the "dropna" step before a statistical test.
    pub fn finite_column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.column(name)?;
        Some(col.into_iter().filter(|v| v.is_finite()).collect())
    }

    /// First `n` rows, order preserved.
    pub fn head(&self, n: usize) -> FeatureFrame {
        FeatureFrame {
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}
