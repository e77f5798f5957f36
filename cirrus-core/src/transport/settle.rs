//! Single-resolution result handle.
//!
//! [`pending`] splits a result slot into a [`Settle`] half and a
//! [`ResponseFuture`] half. `Settle::resolve` and `Settle::fail` consume
//! the settling half, so a result can be delivered at most once. If the
//! settling half is dropped unresolved, the future fails with
//! `ConnectionClosed`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::CirrusError;
use crate::response::Response;

/// Create a linked settle/future pair.
pub fn pending<T>() -> (Settle<T>, ResultFuture<T>) {
    let (tx, rx) = oneshot::channel();
    (Settle { tx }, ResultFuture { rx })
}

/// Settling half. Consumed on use.
#[derive(Debug)]
pub struct Settle<T> {
    tx: oneshot::Sender<Result<T, CirrusError>>,
}

impl<T> Settle<T> {
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    pub fn fail(self, error: CirrusError) {
        self.settle(Err(error));
    }

    pub fn settle(self, result: Result<T, CirrusError>) {
        // The receiver may already be gone; nobody is waiting then.
        let _ = self.tx.send(result);
    }

    /// Returns `true` if the waiting half was dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Waiting half of a [`pending`] pair.
#[derive(Debug)]
pub struct ResultFuture<T> {
    rx: oneshot::Receiver<Result<T, CirrusError>>,
}

/// Pending result of one `connect` call.
pub type ResponseFuture = ResultFuture<Response>;

impl<T> ResultFuture<T> {
    /// A future that is already failed.
    pub fn failed(error: CirrusError) -> Self {
        let (settle, fut) = pending();
        settle.fail(error);
        fut
    }
}

impl<T> Future for ResultFuture<T> {
    type Output = Result<T, CirrusError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CirrusError::ConnectionClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_once() {
        let (settle, fut) = pending::<u32>();
        settle.resolve(7);
        assert_eq!(fut.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn failure_is_delivered() {
        let (settle, fut) = pending::<u32>();
        settle.fail(CirrusError::MalformedHead);
        assert!(matches!(fut.await, Err(CirrusError::MalformedHead)));
    }

    #[tokio::test]
    async fn dropped_settle_reports_closed() {
        let (settle, fut) = pending::<u32>();
        drop(settle);
        assert!(matches!(fut.await, Err(CirrusError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn abandoned_when_future_dropped() {
        let (settle, fut) = pending::<u32>();
        assert!(!settle.is_abandoned());
        drop(fut);
        assert!(settle.is_abandoned());
        settle.resolve(1);
    }

    #[tokio::test]
    async fn pre_failed_future() {
        let fut = ResponseFuture::failed(CirrusError::PoolClosed);
        assert!(matches!(fut.await, Err(CirrusError::PoolClosed)));
    }
}
