//! dfcache Rust client SDK
//!
//! [`BucketClient`] talks to the bucket API of a dfcache proxy. The async
//! client is the primary interface; [`blocking::BucketClient`] offers the same
//! calls synchronously.

pub mod blocking;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod params;

pub use client::BucketClient;
pub use config::ClientConfig;
pub use dispatch::CallHandle;
pub use error::{ClientError, TransportError, ValidationError};
pub use params::{params_from_json, ListNamesParams, SetPropertiesParams};

pub use dfcache_core as core;

pub type Result<T> = std::result::Result<T, ClientError>;
