//! Argument validation and optional call parameters

use dfcache_core::{BucketName, BucketProperties};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Optional query parameters of `set_properties`
pub type SetPropertiesParams = BucketProperties;

/// Optional query parameters of `list_bucket_names`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListNamesParams {
    /// Restrict the result to buckets hosted by the cache itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
}

/// Check a required bucket name argument; empty means absent
pub(crate) fn require_bucket(
    operation: &'static str,
    parameter: &'static str,
    name: &str,
) -> Result<BucketName, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Missing {
            operation,
            parameter,
        });
    }
    BucketName::new(name).map_err(|e| ValidationError::Invalid {
        operation,
        parameter,
        reason: e.to_string(),
    })
}

/// Decode loosely-typed call parameters, rejecting keys the call does not take
pub fn params_from_json<T: DeserializeOwned>(
    operation: &'static str,
    value: serde_json::Value,
) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::UnknownArgument {
        operation,
        reason: e.to_string(),
    })
}
