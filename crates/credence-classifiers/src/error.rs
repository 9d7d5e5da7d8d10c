use thiserror::Error;

use crate::schema::Decision;

/// Failures raised by the training pipeline and the inference service.
#[derive(Debug, Error)]
pub enum CreditError {
    /// A training row has the wrong shape, an unknown label, or an
    /// out-of-domain value. `line` is 1-based.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A class is missing from a split, or there is nothing to train on.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The feature vector does not agree with the artifact's schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no model artifact has been loaded")]
    ModelNotLoaded,

    #[error("a model artifact is already loaded")]
    AlreadyLoaded,

    /// The classifier blob and the schema blob of an artifact disagree.
    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("classifier produced unknown class code {0}")]
    UnknownClassCode(u8),

    #[error("test accuracy {accuracy:.4} does not exceed the floor {floor:.4}")]
    AccuracyBelowFloor { accuracy: f64, floor: f64 },

    #[error("fixture '{name}' expected {expected} but the model predicted {actual}")]
    FixtureMismatch {
        name: String,
        expected: Decision,
        actual: Decision,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CreditError>;

impl CreditError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        CreditError::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}
