//! Synchronous client.
//!
//! Wraps the async [`crate::BucketClient`] with its own Tokio runtime. Calls
//! block the current thread; [`BucketClient::dispatch`] runs a call in the
//! background instead and hands back a [`CallHandle`] to join later.
//!
//! Do not use this client from inside an async context.

use dfcache_core::{
    BucketListOptions, BucketNames, BucketProperties, ObjectEntry, ObjectProperties,
    ObjectSelection, OperationRequest,
};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

use crate::{CallHandle, ClientConfig, ListNamesParams, Result, TransportError};

#[derive(Clone, Debug)]
pub struct BucketClient {
    inner: crate::BucketClient,
    runtime: Arc<Runtime>,
}

impl BucketClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("dfcache-client")
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;
        let inner = crate::BucketClient::with_config(config)?;

        Ok(BucketClient {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    /// The async client sharing this client's connection pool
    pub fn async_client(&self) -> &crate::BucketClient {
        &self.inner
    }

    /// Run a call on the background runtime and return without waiting for it
    pub fn dispatch<F, Fut, T>(&self, call: F) -> CallHandle<T>
    where
        F: FnOnce(crate::BucketClient) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        CallHandle::new(self.runtime.spawn(call(self.inner.clone())))
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn delete_bucket(&self, bucket_name: &str, request: &OperationRequest) -> Result<()> {
        self.block_on(self.inner.delete_bucket(bucket_name, request))
    }

    pub fn get_properties(&self, bucket_name: &str) -> Result<BucketProperties> {
        self.block_on(self.inner.get_properties(bucket_name))
    }

    pub fn list_objects(
        &self,
        bucket_name: &str,
        options: &BucketListOptions,
    ) -> Result<ObjectProperties> {
        self.block_on(self.inner.list_objects(bucket_name, options))
    }

    pub fn list_all_objects(
        &self,
        bucket_name: &str,
        options: &BucketListOptions,
    ) -> Result<Vec<ObjectEntry>> {
        self.block_on(self.inner.list_all_objects(bucket_name, options))
    }

    pub fn list_bucket_names(&self, local: Option<bool>) -> Result<BucketNames> {
        self.block_on(self.inner.list_bucket_names(local))
    }

    pub fn list_bucket_names_with(&self, params: &ListNamesParams) -> Result<BucketNames> {
        self.block_on(self.inner.list_bucket_names_with(params))
    }

    pub fn perform_operation(&self, bucket_name: &str, request: &OperationRequest) -> Result<()> {
        self.block_on(self.inner.perform_operation(bucket_name, request))
    }

    pub fn set_properties(
        &self,
        bucket_name: &str,
        request: &OperationRequest,
        props: &BucketProperties,
    ) -> Result<()> {
        self.block_on(self.inner.set_properties(bucket_name, request, props))
    }

    pub fn create_local_bucket(&self, bucket_name: &str) -> Result<()> {
        self.block_on(self.inner.create_local_bucket(bucket_name))
    }

    pub fn destroy_local_bucket(&self, bucket_name: &str) -> Result<()> {
        self.block_on(self.inner.destroy_local_bucket(bucket_name))
    }

    pub fn rename_local_bucket(&self, bucket_name: &str, new_name: &str) -> Result<()> {
        self.block_on(self.inner.rename_local_bucket(bucket_name, new_name))
    }

    pub fn evict_cloud_bucket(&self, bucket_name: &str) -> Result<()> {
        self.block_on(self.inner.evict_cloud_bucket(bucket_name))
    }

    pub fn evict_objects(&self, bucket_name: &str, selection: &ObjectSelection) -> Result<()> {
        self.block_on(self.inner.evict_objects(bucket_name, selection))
    }

    pub fn delete_objects(&self, bucket_name: &str, selection: &ObjectSelection) -> Result<()> {
        self.block_on(self.inner.delete_objects(bucket_name, selection))
    }

    pub fn prefetch_objects(&self, bucket_name: &str, selection: &ObjectSelection) -> Result<()> {
        self.block_on(self.inner.prefetch_objects(bucket_name, selection))
    }
}
