//! Error types for the dfcache data model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DfcError {
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("Invalid value for header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    #[error("Unknown {kind}: '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
