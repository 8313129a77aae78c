//! Core data types for the bucket API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DfcError, Result};

/// Name of a bucket, safe to use as a single URL path segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Create a new bucket name with validation
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(DfcError::InvalidBucketName("empty name".to_string()));
        }

        if name == "." || name == ".." {
            return Err(DfcError::InvalidBucketName(format!(
                "'{name}' is reserved"
            )));
        }

        // Alphanumerics, hyphens, underscores and dots only
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(DfcError::InvalidBucketName(format!(
                "invalid characters in '{name}'"
            )));
        }

        Ok(BucketName(name.to_string()))
    }

    /// Get the bucket name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BucketName {
    type Error = DfcError;

    fn try_from(value: String) -> Result<Self> {
        BucketName::new(&value)
    }
}

impl From<BucketName> for String {
    fn from(name: BucketName) -> Self {
        name.0
    }
}

/// Action carried by an [`OperationRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(rename = "createlb")]
    CreateLocalBucket,
    #[serde(rename = "destroylb")]
    DestroyLocalBucket,
    #[serde(rename = "renamelb")]
    RenameLocalBucket,
    #[serde(rename = "evictcb")]
    EvictCloudBucket,
    #[serde(rename = "evictobj")]
    EvictObjects,
    Delete,
    Prefetch,
    #[serde(rename = "setprops")]
    SetProperties,
    #[serde(rename = "resetprops")]
    ResetProperties,
    #[serde(rename = "listobjects")]
    ListObjects,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateLocalBucket => "createlb",
            Action::DestroyLocalBucket => "destroylb",
            Action::RenameLocalBucket => "renamelb",
            Action::EvictCloudBucket => "evictcb",
            Action::EvictObjects => "evictobj",
            Action::Delete => "delete",
            Action::Prefetch => "prefetch",
            Action::SetProperties => "setprops",
            Action::ResetProperties => "resetprops",
            Action::ListObjects => "listobjects",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-defined description of an action to perform on a bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl OperationRequest {
    pub fn new(action: Action) -> Self {
        OperationRequest {
            action,
            name: None,
            value: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach an object selection as the request value
    pub fn with_selection(self, selection: &ObjectSelection) -> Result<Self> {
        let value = serde_json::to_value(selection)?;
        Ok(self.with_value(value))
    }

    /// Decode the request value as an object selection, if there is one
    pub fn selection(&self) -> Result<Option<ObjectSelection>> {
        match &self.value {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }
}

/// Objects an action applies to, by explicit name or by name prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSelection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl ObjectSelection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectSelection {
            objnames: names.into_iter().map(Into::into).collect(),
            prefix: None,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        ObjectSelection {
            objnames: Vec::new(),
            prefix: Some(prefix.into()),
        }
    }

    /// Check whether the named object is selected
    pub fn matches(&self, name: &str) -> bool {
        if self.objnames.iter().any(|n| n == name) {
            return true;
        }
        match &self.prefix {
            Some(prefix) => name.starts_with(prefix.as_str()),
            None => false,
        }
    }
}

pub const PROP_SIZE: &str = "size";
pub const PROP_CTIME: &str = "ctime";
pub const PROP_CHECKSUM: &str = "checksum";
pub const PROP_ATIME: &str = "atime";
pub const PROP_VERSION: &str = "version";
pub const PROP_IS_CACHED: &str = "iscached";
pub const PROP_STATUS: &str = "status";
pub const PROP_COPIES: &str = "copies";

/// Filter and pagination parameters for listing a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketListOptions {
    /// Comma-separated object properties to return besides the name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub props: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time_format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    /// Name of the last object of the previous page
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pagemarker: String,
    /// Zero means the service default
    #[serde(default, skip_serializing_if = "is_zero")]
    pub pagesize: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl BucketListOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_props(mut self, props: &[&str]) -> Self {
        self.props = props.join(",");
        self
    }

    pub fn with_page_size(mut self, pagesize: usize) -> Self {
        self.pagesize = pagesize;
        self
    }

    pub fn with_page_marker(mut self, pagemarker: impl Into<String>) -> Self {
        self.pagemarker = pagemarker.into();
        self
    }

    /// Requested properties, trimmed, without empty items
    pub fn requested_props(&self) -> Vec<&str> {
        self.props
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// A single listed object and the properties that were asked for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iscached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectEntry {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Copy of this entry carrying only the name and the requested properties
    pub fn project(&self, props: &[&str]) -> ObjectEntry {
        let wants = |p: &str| props.contains(&p);
        ObjectEntry {
            name: self.name.clone(),
            size: self.size.filter(|_| wants(PROP_SIZE)),
            ctime: self.ctime.clone().filter(|_| wants(PROP_CTIME)),
            checksum: self.checksum.clone().filter(|_| wants(PROP_CHECKSUM)),
            atime: self.atime.clone().filter(|_| wants(PROP_ATIME)),
            version: self.version.clone().filter(|_| wants(PROP_VERSION)),
            iscached: self.iscached.filter(|_| wants(PROP_IS_CACHED)),
            status: self.status.clone().filter(|_| wants(PROP_STATUS)),
            copies: self.copies.filter(|_| wants(PROP_COPIES)),
        }
    }
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperties {
    #[serde(default)]
    pub entries: Vec<ObjectEntry>,
    /// Empty when there is nothing left to list
    #[serde(default)]
    pub pagemarker: String,
}

impl ObjectProperties {
    pub fn is_complete(&self) -> bool {
        self.pagemarker.is_empty()
    }
}

/// Known bucket names, split by where they are hosted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketNames {
    #[serde(default)]
    pub cloud: Vec<String>,
    #[serde(default)]
    pub local: Vec<String>,
}

impl BucketNames {
    pub fn contains(&self, name: &str) -> bool {
        self.local.iter().chain(self.cloud.iter()).any(|n| n == name)
    }
}

/// Cloud provider backing a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    /// Hosted by the cache itself
    Dfc,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Dfc => "dfc",
        }
    }
}

impl FromStr for CloudProvider {
    type Err = DfcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aws" => Ok(CloudProvider::Aws),
            "gcp" => Ok(CloudProvider::Gcp),
            "dfc" => Ok(CloudProvider::Dfc),
            other => Err(DfcError::UnknownValue {
                kind: "cloud provider",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where reads or writes go when a bucket has more tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RwPolicy {
    Cloud,
    NextTier,
}

impl RwPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RwPolicy::Cloud => "cloud",
            RwPolicy::NextTier => "next_tier",
        }
    }
}

impl FromStr for RwPolicy {
    type Err = DfcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloud" => Ok(RwPolicy::Cloud),
            "next_tier" => Ok(RwPolicy::NextTier),
            other => Err(DfcError::UnknownValue {
                kind: "read/write policy",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RwPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable configuration attached to a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<CloudProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_tier_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_policy: Option<RwPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_policy: Option<RwPolicy>,
}

impl BucketProperties {
    pub fn is_empty(&self) -> bool {
        *self == BucketProperties::default()
    }

    /// Overwrite every field that is set in `other`
    pub fn merge(&mut self, other: &BucketProperties) {
        if other.cloud_provider.is_some() {
            self.cloud_provider = other.cloud_provider;
        }
        if other.next_tier_url.is_some() {
            self.next_tier_url = other.next_tier_url.clone();
        }
        if other.read_policy.is_some() {
            self.read_policy = other.read_policy;
        }
        if other.write_policy.is_some() {
            self.write_policy = other.write_policy;
        }
    }

    /// Query pairs in the order the PUT endpoint documents them
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(provider) = self.cloud_provider {
            pairs.push(("cloud_provider", provider.to_string()));
        }
        if let Some(url) = &self.next_tier_url {
            pairs.push(("next_tier_url", url.clone()));
        }
        if let Some(policy) = self.read_policy {
            pairs.push(("read_policy", policy.to_string()));
        }
        if let Some(policy) = self.write_policy {
            pairs.push(("write_policy", policy.to_string()));
        }
        pairs
    }
}
