//! Completion futures for queued tasks.

use liveset_core::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Resolves with the result of one queued task.
///
/// The task runs whether or not this future is polled. Dropping it hands
/// any error the task produces to the queue's fallback handler.
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Completion<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T>>) -> Self {
        Self { rx }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without running: the queue was destroyed.
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::QueueDestroyed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
