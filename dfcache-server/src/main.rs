//! dfcache reference bucket service

use anyhow::Context;
use clap::Parser;
use dfcache_core::{BucketName, CloudProvider};
use dfcache_server::{BucketRegistry, BucketServer};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dfcache-server", version, about = "In-memory dfcache bucket API")]
struct Args {
    /// Bind address
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Cloud bucket to register at startup (repeatable)
    #[arg(long = "cloud-bucket", value_name = "NAME")]
    cloud_buckets: Vec<String>,

    /// Provider reported for the registered cloud buckets
    #[arg(long, value_name = "PROVIDER", default_value = "aws")]
    cloud_provider: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let provider: CloudProvider = args
        .cloud_provider
        .parse()
        .context("invalid --cloud-provider")?;

    let registry = BucketRegistry::new();
    for name in &args.cloud_buckets {
        let bucket = BucketName::new(name).with_context(|| format!("invalid bucket '{name}'"))?;
        registry.add_cloud_bucket(&bucket, provider);
        info!("Registered cloud bucket {} ({})", bucket, provider);
    }

    let server = BucketServer::bind(args.bind, registry)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    if let Err(e) = server.serve().await {
        warn!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
