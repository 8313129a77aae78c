//! Main client implementation

use bytes::Bytes;
use dfcache_core::*;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use hyper::{Method, Request};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::params::require_bucket;
use crate::{CallHandle, ClientConfig, ListNamesParams, Result, TransportError, ValidationError};

const TEXT_PLAIN: &str = "text/plain";
const APPLICATION_JSON: &str = "application/json";

type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Headers and collected body of a successful exchange
struct Reply {
    headers: HeaderMap,
    body: Bytes,
}

/// Typed client for the dfcache bucket API
#[derive(Clone)]
pub struct BucketClient {
    http: HttpClient,
    base_url: Arc<str>,
    user_agent: HeaderValue,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for BucketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BucketClient {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let base_url = config.normalized_base_url()?;
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| crate::ClientError::Config(format!("Invalid user agent: {e}")))?;
        let http = Client::builder(TokioExecutor::new()).build_http();

        Ok(BucketClient {
            http,
            base_url: base_url.into(),
            user_agent,
            timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a call on the Tokio runtime and return a handle to await later.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn dispatch<F, Fut, T>(&self, call: F) -> CallHandle<T>
    where
        F: FnOnce(BucketClient) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        CallHandle::new(tokio::spawn(call(self.clone())))
    }

    /// Delete a bucket or objects in it, as described by `request`
    pub async fn delete_bucket(&self, bucket_name: &str, request: &OperationRequest) -> Result<()> {
        let bucket = require_bucket("delete_bucket", "bucket_name", bucket_name)?;
        let body = encode(request)?;
        self.send(Method::DELETE, &bucket_path(&bucket), None, Some(body), TEXT_PLAIN)
            .await?;
        Ok(())
    }

    /// Read bucket properties from the headers of a HEAD response
    pub async fn get_properties(&self, bucket_name: &str) -> Result<BucketProperties> {
        let bucket = require_bucket("get_properties", "bucket_name", bucket_name)?;
        let reply = self
            .send(Method::HEAD, &bucket_path(&bucket), None, None, TEXT_PLAIN)
            .await?;
        let props = BucketProperties::from_headers(&reply.headers)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        Ok(props)
    }

    /// List one page of objects in a bucket
    pub async fn list_objects(
        &self,
        bucket_name: &str,
        options: &BucketListOptions,
    ) -> Result<ObjectProperties> {
        let bucket = require_bucket("list_objects", "bucket_name", bucket_name)?;
        let body = encode(options)?;
        let reply = self
            .send(Method::GET, &bucket_path(&bucket), None, Some(body), APPLICATION_JSON)
            .await?;
        decode(&reply.body)
    }

    /// List every object matching `options`, following page markers to the end
    pub async fn list_all_objects(
        &self,
        bucket_name: &str,
        options: &BucketListOptions,
    ) -> Result<Vec<ObjectEntry>> {
        let mut options = options.clone();
        let mut entries = Vec::new();
        loop {
            let page = self.list_objects(bucket_name, &options).await?;
            entries.extend(page.entries);
            if page.pagemarker.is_empty() || page.pagemarker == options.pagemarker {
                break;
            }
            options.pagemarker = page.pagemarker;
        }
        Ok(entries)
    }

    /// List known bucket names, optionally only the locally hosted ones
    pub async fn list_bucket_names(&self, local: Option<bool>) -> Result<BucketNames> {
        self.list_bucket_names_with(&ListNamesParams { local }).await
    }

    pub async fn list_bucket_names_with(&self, params: &ListNamesParams) -> Result<BucketNames> {
        let mut query = Vec::new();
        if let Some(local) = params.local {
            query.push(("local", local.to_string()));
        }
        let path = format!("{BUCKETS_PATH}/{ALL_BUCKETS}");
        let reply = self
            .send(Method::GET, &path, query_string(&query), None, APPLICATION_JSON)
            .await?;
        decode(&reply.body)
    }

    /// Perform a bucket-level action
    pub async fn perform_operation(
        &self,
        bucket_name: &str,
        request: &OperationRequest,
    ) -> Result<()> {
        let bucket = require_bucket("perform_operation", "bucket_name", bucket_name)?;
        let body = encode(request)?;
        self.send(Method::POST, &bucket_path(&bucket), None, Some(body), TEXT_PLAIN)
            .await?;
        Ok(())
    }

    /// Update bucket properties; only the set fields of `props` are sent.
    ///
    /// A `next_tier_url` that the HEAD response headers could not carry back
    /// unchanged is rejected before anything is sent.
    pub async fn set_properties(
        &self,
        bucket_name: &str,
        request: &OperationRequest,
        props: &BucketProperties,
    ) -> Result<()> {
        let bucket = require_bucket("set_properties", "bucket_name", bucket_name)?;
        props
            .check_headers()
            .map_err(|e| ValidationError::Invalid {
                operation: "set_properties",
                parameter: "next_tier_url",
                reason: e.to_string(),
            })?;
        let body = encode(request)?;
        let query = props.to_query_pairs();
        self.send(
            Method::PUT,
            &bucket_path(&bucket),
            query_string(&query),
            Some(body),
            TEXT_PLAIN,
        )
        .await?;
        Ok(())
    }

    pub async fn create_local_bucket(&self, bucket_name: &str) -> Result<()> {
        self.perform_operation(bucket_name, &OperationRequest::new(Action::CreateLocalBucket))
            .await
    }

    pub async fn destroy_local_bucket(&self, bucket_name: &str) -> Result<()> {
        self.delete_bucket(bucket_name, &OperationRequest::new(Action::DestroyLocalBucket))
            .await
    }

    pub async fn rename_local_bucket(&self, bucket_name: &str, new_name: &str) -> Result<()> {
        let new_name = require_bucket("rename_local_bucket", "new_name", new_name)?;
        let request = OperationRequest::new(Action::RenameLocalBucket).with_name(new_name);
        self.perform_operation(bucket_name, &request).await
    }

    /// Drop every cached object of a cloud bucket
    pub async fn evict_cloud_bucket(&self, bucket_name: &str) -> Result<()> {
        self.delete_bucket(bucket_name, &OperationRequest::new(Action::EvictCloudBucket))
            .await
    }

    pub async fn evict_objects(
        &self,
        bucket_name: &str,
        selection: &ObjectSelection,
    ) -> Result<()> {
        let request = selection_request(Action::EvictObjects, "evict_objects", selection)?;
        self.delete_bucket(bucket_name, &request).await
    }

    pub async fn delete_objects(
        &self,
        bucket_name: &str,
        selection: &ObjectSelection,
    ) -> Result<()> {
        let request = selection_request(Action::Delete, "delete_objects", selection)?;
        self.delete_bucket(bucket_name, &request).await
    }

    pub async fn prefetch_objects(
        &self,
        bucket_name: &str,
        selection: &ObjectSelection,
    ) -> Result<()> {
        let request = selection_request(Action::Prefetch, "prefetch_objects", selection)?;
        self.perform_operation(bucket_name, &request).await
    }

    /// Build, send and collect one request; non-2xx statuses become errors
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<String>,
        body: Option<Bytes>,
        accept: &'static str,
    ) -> std::result::Result<Reply, TransportError> {
        let uri = match &query {
            Some(query) => format!("{}{}?{}", self.base_url, path, query),
            None => format!("{}{}", self.base_url, path),
        };

        debug!("Dispatching {} {}", method, uri);

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&uri)
            .header(ACCEPT, accept)
            .header(USER_AGENT, self.user_agent.clone());
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, APPLICATION_JSON);
        }
        let request = builder.body(Full::new(body.unwrap_or_default()))?;

        let exchange = async {
            let response = self.http.request(request).await?;
            let (parts, incoming) = response.into_parts();
            let body = incoming.collect().await?.to_bytes();
            Ok::<_, TransportError>((parts.status, parts.headers, body))
        };

        let (status, headers, body) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => exchange.await?,
        };

        debug!("{} {} -> {}", method, uri, status);

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        Ok(Reply { headers, body })
    }
}

fn bucket_path(bucket: &BucketName) -> String {
    format!("{}/{}", BUCKETS_PATH, bucket.as_str())
}

fn query_string<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Option<String> {
    if pairs.is_empty() {
        return None;
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key.as_ref(), value.as_ref());
    }
    Some(serializer.finish())
}

fn encode<T: Serialize>(value: &T) -> std::result::Result<Bytes, TransportError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body).map_err(TransportError::from)?)
}

fn selection_request(
    action: Action,
    operation: &'static str,
    selection: &ObjectSelection,
) -> Result<OperationRequest> {
    if selection.objnames.is_empty() && selection.prefix.is_none() {
        return Err(ValidationError::Missing {
            operation,
            parameter: "selection",
        }
        .into());
    }
    let value = serde_json::to_value(selection).map_err(TransportError::from)?;
    Ok(OperationRequest::new(action).with_value(value))
}
