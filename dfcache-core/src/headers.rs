//! Bucket properties carried in HTTP response headers

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{BucketProperties, DfcError, Result};

pub const HEADER_CLOUD_PROVIDER: &str = "cloudprovider";
pub const HEADER_NEXT_TIER_URL: &str = "nexttierurl";
pub const HEADER_READ_POLICY: &str = "readpolicy";
pub const HEADER_WRITE_POLICY: &str = "writepolicy";

/// Header values are read as UTF-8, not just visible ASCII, so URLs with
/// non-ASCII paths survive the trip.
fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => std::str::from_utf8(value.as_bytes())
            .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
            .map_err(|e| DfcError::InvalidHeader {
                name,
                reason: e.to_string(),
            }),
    }
}

/// Reject values a header cannot carry unchanged: control characters are
/// not allowed and surrounding whitespace is stripped by HTTP parsers.
fn to_header_value(name: &'static str, value: &str) -> Result<HeaderValue> {
    if value.chars().any(char::is_control) {
        return Err(DfcError::InvalidHeader {
            name,
            reason: "value contains control characters".to_string(),
        });
    }
    if value.trim() != value {
        return Err(DfcError::InvalidHeader {
            name,
            reason: "value has leading or trailing whitespace".to_string(),
        });
    }
    HeaderValue::from_str(value).map_err(|e| DfcError::InvalidHeader {
        name,
        reason: e.to_string(),
    })
}

impl BucketProperties {
    /// Decode properties from HEAD response headers; absent headers stay unset
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        Ok(BucketProperties {
            cloud_provider: header_str(headers, HEADER_CLOUD_PROVIDER)?
                .map(str::parse)
                .transpose()?,
            next_tier_url: header_str(headers, HEADER_NEXT_TIER_URL)?.map(str::to_string),
            read_policy: header_str(headers, HEADER_READ_POLICY)?
                .map(str::parse)
                .transpose()?,
            write_policy: header_str(headers, HEADER_WRITE_POLICY)?
                .map(str::parse)
                .transpose()?,
        })
    }

    /// Check that every set property can be carried in response headers
    pub fn check_headers(&self) -> Result<()> {
        self.write_headers(&mut HeaderMap::new())
    }

    /// Write the set properties into `headers`, replacing earlier values
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        if let Some(provider) = self.cloud_provider {
            headers.insert(
                HeaderName::from_static(HEADER_CLOUD_PROVIDER),
                HeaderValue::from_static(provider.as_str()),
            );
        }
        if let Some(url) = &self.next_tier_url {
            headers.insert(
                HeaderName::from_static(HEADER_NEXT_TIER_URL),
                to_header_value(HEADER_NEXT_TIER_URL, url)?,
            );
        }
        if let Some(policy) = self.read_policy {
            headers.insert(
                HeaderName::from_static(HEADER_READ_POLICY),
                HeaderValue::from_static(policy.as_str()),
            );
        }
        if let Some(policy) = self.write_policy {
            headers.insert(
                HeaderName::from_static(HEADER_WRITE_POLICY),
                HeaderValue::from_static(policy.as_str()),
            );
        }
        Ok(())
    }
}
