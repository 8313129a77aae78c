//! HTTP request handlers for the bucket API

use bytes::Bytes;
use dfcache_core::*;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, info, warn};

use crate::{BucketRegistry, Result, ServerError};

type BoxBody = Full<Bytes>;

/// Path prefix the API is mounted under
pub const API_PREFIX: &str = "/v1";

/// Target of a request under `/v1/buckets/`
#[derive(Debug, PartialEq, Eq)]
enum Target {
    AllBuckets,
    Bucket(BucketName),
}

/// Main request handler
pub async fn handle_request<B>(
    req: Request<B>,
    registry: BucketRegistry,
) -> std::result::Result<Response<BoxBody>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Handling {} {}", method, path);

    let result = route(req, &registry).await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!("Request {} {} failed: {}", method, path, e);
            json_response(e.status(), json!({"error": e.to_string()}).to_string())
        }
    };

    info!("{} {} -> {}", method, path, response.status());
    Ok(response)
}

async fn route<B>(req: Request<B>, registry: &BucketRegistry) -> Result<Response<BoxBody>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let target = parse_bucket_path(req.uri().path())?;
    let query = parse_query(req.uri().query());

    match (req.method().clone(), target) {
        (Method::GET, Target::AllBuckets) => handle_list_names(registry, &query),
        (Method::GET, Target::Bucket(bucket)) => {
            let opts: BucketListOptions = read_json_or_default(req).await?;
            handle_list_objects(registry, &bucket, &opts)
        }
        (Method::HEAD, Target::Bucket(bucket)) => handle_head(registry, &bucket),
        (Method::POST, Target::Bucket(bucket)) => {
            let msg: OperationRequest = read_json(req).await?;
            handle_post(registry, &bucket, &msg)
        }
        (Method::PUT, Target::Bucket(bucket)) => {
            let msg: OperationRequest = read_json(req).await?;
            handle_put(registry, &bucket, &msg, &query)
        }
        (Method::DELETE, Target::Bucket(bucket)) => {
            let msg: OperationRequest = read_json(req).await?;
            handle_delete(registry, &bucket, &msg)
        }
        _ => Err(ServerError::RouteNotFound),
    }
}

fn handle_list_names(
    registry: &BucketRegistry,
    query: &[(String, String)],
) -> Result<Response<BoxBody>> {
    let mut local = false;
    for (key, value) in query {
        match key.as_str() {
            "local" => {
                local = value.parse().map_err(|_| {
                    ServerError::BadRequest(format!("local must be true or false, got '{value}'"))
                })?
            }
            other => return Err(ServerError::BadRequest(format!("unknown parameter '{other}'"))),
        }
    }

    let names = registry.names(local);
    Ok(json_response(StatusCode::OK, serde_json::to_string(&names)?))
}

fn handle_list_objects(
    registry: &BucketRegistry,
    bucket: &BucketName,
    opts: &BucketListOptions,
) -> Result<Response<BoxBody>> {
    let page = registry.list(bucket, opts)?;
    debug!(
        "Listed {} objects from {} (marker '{}')",
        page.entries.len(),
        bucket,
        page.pagemarker
    );
    Ok(json_response(StatusCode::OK, serde_json::to_string(&page)?))
}

fn handle_head(registry: &BucketRegistry, bucket: &BucketName) -> Result<Response<BoxBody>> {
    let props = registry.properties(bucket)?;
    let mut response = empty_response();
    props.write_headers(response.headers_mut())?;
    Ok(response)
}

fn handle_post(
    registry: &BucketRegistry,
    bucket: &BucketName,
    msg: &OperationRequest,
) -> Result<Response<BoxBody>> {
    match msg.action {
        Action::CreateLocalBucket => registry.create_local(bucket)?,
        Action::RenameLocalBucket => {
            let new_name = msg
                .name
                .as_deref()
                .ok_or_else(|| ServerError::BadRequest("renamelb requires a name".to_string()))?;
            registry.rename_local(bucket, &BucketName::new(new_name)?)?;
        }
        Action::Prefetch => {
            let cached = registry.set_cached(bucket, &require_selection(msg)?, true)?;
            debug!("Prefetched {} objects into {}", cached, bucket);
        }
        Action::EvictObjects | Action::EvictCloudBucket => evict(registry, bucket, msg)?,
        other => return Err(unsupported(other, "POST")),
    }
    Ok(empty_response())
}

fn handle_put(
    registry: &BucketRegistry,
    bucket: &BucketName,
    msg: &OperationRequest,
    query: &[(String, String)],
) -> Result<Response<BoxBody>> {
    match msg.action {
        Action::SetProperties => {
            let mut update = match &msg.value {
                Some(value) if !value.is_null() => {
                    serde_json::from_value::<BucketProperties>(value.clone())
                        .map_err(|e| ServerError::BadRequest(e.to_string()))?
                }
                _ => BucketProperties::default(),
            };
            update.merge(&props_from_query(query)?);
            // HEAD must be able to report whatever is stored
            update.check_headers()?;
            registry.set_properties(bucket, &update)?;
        }
        Action::ResetProperties => registry.reset_properties(bucket)?,
        other => return Err(unsupported(other, "PUT")),
    }
    Ok(empty_response())
}

fn handle_delete(
    registry: &BucketRegistry,
    bucket: &BucketName,
    msg: &OperationRequest,
) -> Result<Response<BoxBody>> {
    match msg.action {
        Action::DestroyLocalBucket => registry.destroy_local(bucket)?,
        Action::Delete => {
            let removed = registry.delete_objects(bucket, &require_selection(msg)?)?;
            debug!("Deleted {} objects from {}", removed, bucket);
        }
        Action::EvictObjects | Action::EvictCloudBucket => evict(registry, bucket, msg)?,
        other => return Err(unsupported(other, "DELETE")),
    }
    Ok(empty_response())
}

fn evict(registry: &BucketRegistry, bucket: &BucketName, msg: &OperationRequest) -> Result<()> {
    let evicted = match msg.action {
        Action::EvictCloudBucket => registry.evict_bucket(bucket)?,
        _ => registry.set_cached(bucket, &require_selection(msg)?, false)?,
    };
    debug!("Evicted {} objects from {}", evicted, bucket);
    Ok(())
}

fn require_selection(msg: &OperationRequest) -> Result<ObjectSelection> {
    msg.selection()?
        .filter(|s| !s.objnames.is_empty() || s.prefix.is_some())
        .ok_or_else(|| {
            ServerError::BadRequest(format!("{} requires objnames or prefix", msg.action))
        })
}

fn unsupported(action: Action, method: &str) -> ServerError {
    ServerError::BadRequest(format!("action '{action}' is not supported with {method}"))
}

fn props_from_query(query: &[(String, String)]) -> Result<BucketProperties> {
    let mut props = BucketProperties::default();
    for (key, value) in query {
        match key.as_str() {
            "cloud_provider" => props.cloud_provider = Some(value.parse()?),
            "next_tier_url" => props.next_tier_url = Some(value.clone()),
            "read_policy" => props.read_policy = Some(value.parse()?),
            "write_policy" => props.write_policy = Some(value.parse()?),
            other => return Err(ServerError::BadRequest(format!("unknown parameter '{other}'"))),
        }
    }
    Ok(props)
}

/// Parse "/v1/buckets/{bucket-name}" or "/v1/buckets/*"
fn parse_bucket_path(path: &str) -> Result<Target> {
    let rest = path
        .strip_prefix(API_PREFIX)
        .and_then(|p| p.strip_prefix(BUCKETS_PATH))
        .and_then(|p| p.strip_prefix('/'))
        .ok_or(ServerError::RouteNotFound)?;

    if rest == ALL_BUCKETS {
        return Ok(Target::AllBuckets);
    }
    if rest.is_empty() || rest.contains('/') {
        return Err(ServerError::RouteNotFound);
    }
    Ok(Target::Bucket(BucketName::new(rest)?))
}

fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

async fn read_body<B>(req: Request<B>) -> Result<Bytes>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    req.into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| ServerError::Body(e.to_string()))
}

async fn read_json<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = read_body(req).await?;
    if body.is_empty() {
        return Err(ServerError::BadRequest("missing request body".to_string()));
    }
    serde_json::from_slice(&body).map_err(|e| ServerError::BadRequest(e.to_string()))
}

async fn read_json_or_default<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned + Default,
    B: Body,
    B::Error: std::fmt::Display,
{
    let body = read_body(req).await?;
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(&body).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn json_response(status: StatusCode, body: String) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty_response() -> Response<BoxBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
