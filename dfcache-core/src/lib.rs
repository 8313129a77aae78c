//! Wire data model for the dfcache bucket API

pub mod error;
pub mod headers;
pub mod listing;
pub mod types;

pub use error::*;
pub use headers::*;
pub use listing::*;
pub use types::*;

/// Result type alias for dfcache data model operations
pub type Result<T> = std::result::Result<T, DfcError>;

/// Path of the bucket collection, relative to the API base URL
pub const BUCKETS_PATH: &str = "/buckets";

/// Path segment addressing every bucket at once
pub const ALL_BUCKETS: &str = "*";
