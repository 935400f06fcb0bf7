//! Request catalog.
use std::{
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::sync::oneshot;

use super::{Exception, Handler, ProtocolChannel};
use crate::Result;

mod query;
mod lazy;
mod prepare;
mod execute;
mod close;
mod sync;

pub use query::QueryRequest;
pub use lazy::LazyQueryRequest;
pub use prepare::PrepareRequest;
pub use execute::ExecuteRequest;
pub use close::CloseRequest;
pub use sync::SyncRequest;

/// An operation submitted to a [`Pipeline`][super::Pipeline].
pub trait Request {
    /// Value delivered to the submitter.
    type Output: Send + 'static;

    /// Create the handler receiving this request responses.
    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler>;

    /// Write the request messages.
    fn execute<C: ProtocolChannel>(&self, channel: &mut C);

    /// Returns `false` if the request does not end with `Sync`.
    ///
    /// Such request is answered without `ReadyForQuery`, and an error in it
    /// leaves the server discarding messages until the next `Sync`.
    fn synchronizes(&self) -> bool {
        true
    }

    /// Returns `true` if the request must not directly follow one that does
    /// not synchronize.
    ///
    /// The pipeline writes a `Sync` in between. Otherwise a failed preceding
    /// request makes the server discard this one without ever answering
    /// with `ReadyForQuery`.
    fn needs_sync_before(&self) -> bool {
        false
    }
}

/// Create a connected [`Responder`] and [`Pending`] pair.
pub fn responder<T>() -> (Responder<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    (Responder { tx: Some(tx) }, Pending { rx })
}

/// Sending half of a request outcome, owned by its handler.
pub struct Responder<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
}

impl<T> Responder<T> {
    /// Deliver the outcome, only the first call takes effect.
    pub fn send(&mut self, result: Result<T>) {
        if let Some(tx) = self.tx.take() {
            // submitter may no longer wait
            let _ = tx.send(result);
        }
    }

    /// Deliver the connection failure.
    pub fn fail(&mut self, exception: &Exception) {
        self.send(Err(exception.clone().into()));
    }

    pub fn is_sent(&self) -> bool {
        self.tx.is_none()
    }
}

impl<T> std::fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder").field("sent", &self.is_sent()).finish()
    }
}

/// Future of a submitted request outcome.
///
/// Resolves to [`Exception::Closed`] if the handler is dropped without
/// responding.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(_) => Poll::Ready(Err(Exception::Closed.into())),
        }
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn responder_first_send_wins() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (mut tx, rx) = responder::<u8>();
        tx.send(Ok(1));
        tx.send(Ok(2));
        assert!(tx.is_sent());
        assert_eq!(rt.block_on(rx).unwrap(), 1);
    }

    #[test]
    fn dropped_responder_is_closed() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (tx, rx) = responder::<u8>();
        drop(tx);
        let err = rt.block_on(rx).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(Exception::Closed)));
    }
}
