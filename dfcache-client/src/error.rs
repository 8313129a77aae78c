//! Client error types

use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// A required argument was missing or malformed; raised before any request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing the required parameter `{parameter}` when calling `{operation}`")]
    Missing {
        operation: &'static str,
        parameter: &'static str,
    },

    #[error("Invalid parameter `{parameter}` when calling `{operation}`: {reason}")]
    Invalid {
        operation: &'static str,
        parameter: &'static str,
        reason: String,
    },

    #[error("Unexpected argument to `{operation}`: {reason}")]
    UnknownArgument {
        operation: &'static str,
        reason: String,
    },
}

/// Failure surfaced from the HTTP layer
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request build error: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("Connection error: {0}")]
    Connection(#[from] hyper_util::client::legacy::Error),

    #[error("Body error: {0}")]
    Body(#[from] hyper::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Dispatched call failed: {0}")]
    Dispatch(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// HTTP status of a non-success response, if that is what failed
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
