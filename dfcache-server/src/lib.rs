//! Reference in-memory implementation of the dfcache bucket API

pub mod error;
pub mod handlers;
pub mod registry;
pub mod server;

pub use error::{Result, ServerError};
pub use handlers::{handle_request, API_PREFIX};
pub use registry::BucketRegistry;
pub use server::BucketServer;
