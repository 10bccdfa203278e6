use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing artifact '{name}': {detail}")]
    MissingArtifact { name: String, detail: String },

    #[error("Schema mismatch: expected columns {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Degenerate sample for '{name}': {detail}")]
    DegenerateSample { name: String, detail: String },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Shorthand for the fatal missing-input case.
    pub fn missing(name: &str, detail: impl Into<String>) -> Self {
        PipelineError::MissingArtifact {
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
