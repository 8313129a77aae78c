//! Deferred results for calls dispatched in the background

use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

use crate::{Result, TransportError};

/// Handle to a call running in the background.
///
/// Await it from async code, or [`CallHandle::join`] it from synchronous code.
#[derive(Debug)]
pub struct CallHandle<T> {
    inner: JoinHandle<Result<T>>,
}

impl<T> CallHandle<T> {
    pub(crate) fn new(inner: JoinHandle<Result<T>>) -> Self {
        CallHandle { inner }
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Stop the call; awaiting the handle afterwards yields a dispatch error
    pub fn abort(&self) {
        self.inner.abort();
    }

    /// Block the current thread until the call completes.
    ///
    /// Must not be used from inside an async task.
    pub fn join(self) -> Result<T> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for CallHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.inner.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) => {
                Poll::Ready(Err(TransportError::Dispatch(join_error).into()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
