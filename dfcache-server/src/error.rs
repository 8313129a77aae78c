//! Error types for the reference bucket service

use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Bucket already exists: {0}")]
    BucketExists(String),

    #[error("Bucket {0} is not a local bucket")]
    NotLocal(String),

    #[error("Bucket {0} is not a cloud bucket")]
    NotCloud(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found")]
    RouteNotFound,

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Core error: {0}")]
    Core(#[from] dfcache_core::DfcError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BucketNotFound(_) | ServerError::RouteNotFound => StatusCode::NOT_FOUND,
            ServerError::BucketExists(_) => StatusCode::CONFLICT,
            ServerError::NotLocal(_)
            | ServerError::NotCloud(_)
            | ServerError::BadRequest(_)
            | ServerError::Body(_)
            | ServerError::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Core(dfcache_core::DfcError::Serialization(e))
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
