//! HTTP/1.1 server implementation

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::handlers::handle_request;
use crate::BucketRegistry;

/// Bucket service bound to a listening socket
pub struct BucketServer {
    listener: TcpListener,
    registry: BucketRegistry,
}

impl BucketServer {
    /// Bind to `addr`; port 0 picks a free port, see [`BucketServer::local_addr`]
    pub async fn bind(addr: SocketAddr, registry: BucketRegistry) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    /// Accept connections until the task is dropped or accepting fails
    pub async fn serve(self) -> io::Result<()> {
        info!("dfcache server listening on {}", self.local_addr()?);

        loop {
            let (stream, remote_addr) = self.listener.accept().await?;
            debug!("New connection from {}", remote_addr);

            let registry = self.registry.clone();
            tokio::spawn(async move {
                if let Err(err) = Self::handle_connection(stream, registry).await {
                    error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_connection(stream: TcpStream, registry: BucketRegistry) -> hyper::Result<()> {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let registry = registry.clone();
            async move { handle_request(req, registry).await }
        });

        http1::Builder::new().serve_connection(io, service).await
    }
}
