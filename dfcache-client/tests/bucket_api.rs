//! End-to-end tests for the bucket client against the reference service

use dfcache_client::core::*;
use dfcache_client::{
    blocking, params_from_json, BucketClient, ClientConfig, ClientError, ListNamesParams,
    TransportError,
};
use dfcache_server::{BucketRegistry, BucketServer, API_PREFIX};
use hyper::StatusCode;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const USER_AGENT: &str = concat!("dfcache-client/", env!("CARGO_PKG_VERSION"));

async fn start_service() -> (SocketAddr, BucketRegistry) {
    let registry = BucketRegistry::new();
    let server = BucketServer::bind("127.0.0.1:0".parse().unwrap(), registry.clone())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    (addr, registry)
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}{API_PREFIX}")
}

async fn connect() -> (BucketClient, BucketRegistry) {
    let (addr, registry) = start_service().await;
    let client = BucketClient::new(base_url(addr)).unwrap();
    (client, registry)
}

fn bucket(name: &str) -> BucketName {
    BucketName::new(name).unwrap()
}

fn seed_objects(registry: &BucketRegistry, bucket_name: &str, names: &[&str]) {
    let bucket = bucket(bucket_name);
    for (i, name) in names.iter().enumerate() {
        let entry = ObjectEntry {
            size: Some(1024 * (i as u64 + 1)),
            checksum: Some(format!("{:016x}", i)),
            iscached: Some(true),
            version: Some("1".to_string()),
            ..ObjectEntry::new(*name)
        };
        registry.put_object(&bucket, entry).unwrap();
    }
}

#[tokio::test]
async fn set_properties_are_visible_to_get_properties() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("imagenet"), CloudProvider::Aws);

    let before = client.get_properties("imagenet").await.unwrap();
    assert_eq!(before.cloud_provider, Some(CloudProvider::Aws));
    assert_eq!(before.next_tier_url, None);

    let update = BucketProperties {
        next_tier_url: Some("http://tier2:8080/v1?region=eu&x=1".to_string()),
        read_policy: Some(RwPolicy::NextTier),
        write_policy: Some(RwPolicy::Cloud),
        ..Default::default()
    };
    client
        .set_properties(
            "imagenet",
            &OperationRequest::new(Action::SetProperties),
            &update,
        )
        .await
        .unwrap();

    let after = client.get_properties("imagenet").await.unwrap();
    assert_eq!(after.cloud_provider, Some(CloudProvider::Aws));
    assert_eq!(after.next_tier_url, update.next_tier_url);
    assert_eq!(after.read_policy, Some(RwPolicy::NextTier));
    assert_eq!(after.write_policy, Some(RwPolicy::Cloud));

    client
        .set_properties(
            "imagenet",
            &OperationRequest::new(Action::ResetProperties),
            &BucketProperties::default(),
        )
        .await
        .unwrap();
    let reset = client.get_properties("imagenet").await.unwrap();
    assert_eq!(reset.next_tier_url, None);
    assert_eq!(reset.read_policy, None);
}

#[tokio::test]
async fn non_ascii_next_tier_url_round_trips() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("archive"), CloudProvider::Aws);

    let update = BucketProperties {
        next_tier_url: Some("http://tier2/dätä/档案".to_string()),
        ..Default::default()
    };
    client
        .set_properties(
            "archive",
            &OperationRequest::new(Action::SetProperties),
            &update,
        )
        .await
        .unwrap();

    for _ in 0..2 {
        let props = client.get_properties("archive").await.unwrap();
        assert_eq!(props.next_tier_url, update.next_tier_url);
        assert_eq!(props.cloud_provider, Some(CloudProvider::Aws));
    }
}

#[tokio::test]
async fn header_unsafe_next_tier_url_is_refused() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("archive"), CloudProvider::Aws);

    for url in ["http://tier2/a\nb", "http://tier2/ "] {
        let update = BucketProperties {
            next_tier_url: Some(url.to_string()),
            ..Default::default()
        };
        let err = client
            .set_properties(
                "archive",
                &OperationRequest::new(Action::SetProperties),
                &update,
            )
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{url:?}: {err:?}");
    }

    let props = client.get_properties("archive").await.unwrap();
    assert_eq!(props.next_tier_url, None);
}

#[tokio::test]
async fn list_bucket_names_without_filter_matches_local_false() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("cloud-a"), CloudProvider::Gcp);
    registry.add_cloud_bucket(&bucket("cloud-b"), CloudProvider::Gcp);
    client.create_local_bucket("scratch").await.unwrap();

    let unfiltered = client.list_bucket_names(None).await.unwrap();
    let not_local = client.list_bucket_names(Some(false)).await.unwrap();
    assert_eq!(unfiltered, not_local);
    assert_eq!(unfiltered.cloud, vec!["cloud-a", "cloud-b"]);
    assert_eq!(unfiltered.local, vec!["scratch"]);

    let local_only = client.list_bucket_names(Some(true)).await.unwrap();
    assert!(local_only.cloud.is_empty());
    assert_eq!(local_only.local, vec!["scratch"]);
}

#[tokio::test]
async fn local_bucket_lifecycle() {
    let (client, _registry) = connect().await;

    client.create_local_bucket("tmp1").await.unwrap();
    let err = client.create_local_bucket("tmp1").await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));

    let props = client.get_properties("tmp1").await.unwrap();
    assert_eq!(props.cloud_provider, Some(CloudProvider::Dfc));

    client.rename_local_bucket("tmp1", "tmp2").await.unwrap();
    let names = client.list_bucket_names(Some(true)).await.unwrap();
    assert!(names.contains("tmp2"));
    assert!(!names.contains("tmp1"));

    client.destroy_local_bucket("tmp2").await.unwrap();
    let err = client.get_properties("tmp2").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn list_objects_pages_and_projects_properties() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("data"), CloudProvider::Aws);
    seed_objects(
        &registry,
        "data",
        &["filter/e", "filter/a", "filter/c", "other/x", "filter/b", "filter/d"],
    );

    let opts = BucketListOptions::default()
        .with_prefix("filter/")
        .with_props(&[PROP_SIZE])
        .with_page_size(2);

    let first = client.list_objects("data", &opts).await.unwrap();
    let names: Vec<_> = first.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["filter/a", "filter/b"]);
    assert_eq!(first.pagemarker, "filter/b");
    assert!(first.entries.iter().all(|e| e.size.is_some()));
    assert!(first.entries.iter().all(|e| e.checksum.is_none()));

    let all = client.list_all_objects("data", &opts).await.unwrap();
    let names: Vec<_> = all.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["filter/a", "filter/b", "filter/c", "filter/d", "filter/e"]
    );

    let err = client
        .list_objects("missing", &BucketListOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn object_actions_change_listing() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("cache"), CloudProvider::Aws);
    seed_objects(&registry, "cache", &["img/1", "img/2", "log/1", "log/2"]);
    let cached_opts = BucketListOptions::default().with_props(&[PROP_IS_CACHED]);

    client
        .evict_objects("cache", &ObjectSelection::prefix("img/"))
        .await
        .unwrap();
    let page = client.list_objects("cache", &cached_opts).await.unwrap();
    let cached: Vec<_> = page
        .entries
        .iter()
        .filter(|e| e.iscached == Some(true))
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(cached, vec!["log/1", "log/2"]);

    client
        .prefetch_objects("cache", &ObjectSelection::names(["img/2"]))
        .await
        .unwrap();
    client
        .delete_objects("cache", &ObjectSelection::names(["log/1"]))
        .await
        .unwrap();

    let page = client.list_objects("cache", &cached_opts).await.unwrap();
    let listed: Vec<_> = page
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.iscached))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("img/1", Some(false)),
            ("img/2", Some(true)),
            ("log/2", Some(true)),
        ]
    );

    client.evict_cloud_bucket("cache").await.unwrap();
    let page = client.list_objects("cache", &cached_opts).await.unwrap();
    assert!(page.entries.iter().all(|e| e.iscached == Some(false)));
}

#[tokio::test]
async fn unsupported_action_surfaces_status() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("cloud1"), CloudProvider::Aws);

    let err = client
        .perform_operation("cloud1", &OperationRequest::new(Action::SetProperties))
        .await
        .unwrap_err();
    match err {
        ClientError::Transport(TransportError::Status { status, body }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains("setprops"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_arguments_are_rejected() {
    let (client, registry) = connect().await;
    registry.create_local(&bucket("l1")).unwrap();

    let err = params_from_json::<ListNamesParams>(
        "list_bucket_names",
        json!({"local": true, "limit": 10}),
    )
    .map_err(ClientError::from)
    .unwrap_err();
    assert!(err.is_validation());

    let params: ListNamesParams =
        params_from_json("list_bucket_names", json!({"local": true})).unwrap();
    let names = client.list_bucket_names_with(&params).await.unwrap();
    assert_eq!(names.local, vec!["l1"]);
}

#[tokio::test]
async fn dispatched_calls_resolve_later() {
    let (client, registry) = connect().await;
    registry.add_cloud_bucket(&bucket("c1"), CloudProvider::Aws);

    let names = client.dispatch(|c| async move { c.list_bucket_names(None).await });
    let props = client.dispatch(|c| async move { c.get_properties("c1").await });
    let invalid = client.dispatch(|c| async move { c.get_properties("").await });

    assert_eq!(names.await.unwrap().cloud, vec!["c1"]);
    assert_eq!(
        props.await.unwrap().cloud_provider,
        Some(CloudProvider::Aws)
    );
    assert!(invalid.await.unwrap_err().is_validation());
}

#[tokio::test]
async fn slow_service_hits_timeout() {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let config = ClientConfig::new(base_url(addr)).with_timeout(Duration::from_millis(200));
    let client = BucketClient::with_config(config).unwrap();

    let err = client.list_bucket_names(None).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Timeout(_))
    ));
}

/// A request as it arrived on the wire
#[derive(Debug)]
struct RecordedRequest {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn assert_headers(&self, accept: &str, with_body: bool) {
        assert_eq!(self.header("accept"), Some(accept), "{self:?}");
        assert_eq!(self.header("user-agent"), Some(USER_AGENT), "{self:?}");
        if with_body {
            assert_eq!(self.header("content-type"), Some("application/json"), "{self:?}");
        } else {
            assert_eq!(self.header("content-type"), None, "{self:?}");
            assert!(self.body.is_empty(), "{self:?}");
        }
    }

    fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

async fn read_request(stream: &mut BufReader<TcpStream>) -> std::io::Result<RecordedRequest> {
    let mut line = String::new();
    stream.read_line(&mut line).await?;
    let mut request_line = line.split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        line.clear();
        stream.read_line(&mut line).await?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    stream.read_exact(&mut body).await?;

    Ok(RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Answers every request with a minimal 200 and reports what it received
async fn start_recorder() -> (SocketAddr, mpsc::UnboundedReceiver<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut stream = BufReader::new(stream);
                let Ok(request) = read_request(&mut stream).await else {
                    return;
                };
                let body = match (request.method.as_str(), request.target.as_str()) {
                    ("GET", target) if target.starts_with("/v1/buckets/*") => {
                        r#"{"cloud":[],"local":[]}"#
                    }
                    ("GET", _) => r#"{"entries":[],"pagemarker":""}"#,
                    _ => "",
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = tx.send(request);
                let _ = stream.get_mut().write_all(response.as_bytes()).await;
            });
        }
    });

    (addr, rx)
}

#[tokio::test]
async fn requests_carry_method_path_and_headers() {
    let (addr, mut recorded) = start_recorder().await;
    let client = BucketClient::new(base_url(addr)).unwrap();

    client
        .delete_bucket("b1", &OperationRequest::new(Action::DestroyLocalBucket))
        .await
        .unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.method, "DELETE");
    assert_eq!(seen.target, "/v1/buckets/b1");
    seen.assert_headers("text/plain", true);
    assert_eq!(seen.json_body(), json!({"action": "destroylb"}));

    client.get_properties("b1").await.unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.method, "HEAD");
    assert_eq!(seen.target, "/v1/buckets/b1");
    seen.assert_headers("text/plain", false);

    let opts = BucketListOptions::default()
        .with_prefix("logs/")
        .with_page_size(10);
    client.list_objects("b1", &opts).await.unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.target, "/v1/buckets/b1");
    seen.assert_headers("application/json", true);
    assert_eq!(
        serde_json::from_str::<BucketListOptions>(&seen.body).unwrap(),
        opts
    );

    client.list_bucket_names(Some(false)).await.unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.target, "/v1/buckets/*?local=false");
    seen.assert_headers("application/json", false);

    client.list_bucket_names(None).await.unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.target, "/v1/buckets/*");
    seen.assert_headers("application/json", false);

    client
        .perform_operation("b1", &OperationRequest::new(Action::CreateLocalBucket))
        .await
        .unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/v1/buckets/b1");
    seen.assert_headers("text/plain", true);
    assert_eq!(seen.json_body(), json!({"action": "createlb"}));

    let props = BucketProperties {
        cloud_provider: Some(CloudProvider::Gcp),
        next_tier_url: Some("http://tier2".to_string()),
        read_policy: Some(RwPolicy::Cloud),
        write_policy: Some(RwPolicy::NextTier),
    };
    client
        .set_properties("b1", &OperationRequest::new(Action::SetProperties), &props)
        .await
        .unwrap();
    let seen = recorded.recv().await.unwrap();
    assert_eq!(seen.method, "PUT");
    assert_eq!(
        seen.target,
        concat!(
            "/v1/buckets/b1?cloud_provider=gcp",
            "&next_tier_url=http%3A%2F%2Ftier2",
            "&read_policy=cloud&write_policy=next_tier",
        )
    );
    seen.assert_headers("text/plain", true);
    assert_eq!(seen.json_body(), json!({"action": "setprops"}));
}

#[test]
fn blocking_client_round_trip() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (addr, registry) = runtime.block_on(start_service());
    registry.add_cloud_bucket(&bucket("cloud1"), CloudProvider::Gcp);

    let client = blocking::BucketClient::new(base_url(addr)).unwrap();

    client.create_local_bucket("sync1").unwrap();
    client
        .set_properties(
            "sync1",
            &OperationRequest::new(Action::SetProperties),
            &BucketProperties {
                write_policy: Some(RwPolicy::NextTier),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(
        client.get_properties("sync1").unwrap().write_policy,
        Some(RwPolicy::NextTier)
    );

    let handle = client.dispatch(|c| async move { c.list_bucket_names(None).await });
    let names = handle.join().unwrap();
    assert_eq!(names.cloud, vec!["cloud1"]);
    assert_eq!(names.local, vec!["sync1"]);

    assert!(client.get_properties("").unwrap_err().is_validation());

    let params: ListNamesParams =
        params_from_json("list_bucket_names", json!({"local": true})).unwrap();
    let local_only = client.list_bucket_names_with(&params).unwrap();
    assert!(local_only.cloud.is_empty());
    assert_eq!(local_only.local, vec!["sync1"]);

    drop(client);
    drop(runtime);
}
