use crate::{
    notice::Notice,
    postgres::backend::{ReadyForQuery, TransactionStatus},
    protocol::{Action, Exception, Handler, ProtocolChannel, Request, Responder},
};

/// A bare `Sync`.
///
/// Ends the implicit transaction of preceding unsynchronized requests, and
/// reports an error passed on by them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncRequest;

impl Request for SyncRequest {
    type Output = TransactionStatus;

    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler> {
        Box::new(SyncHandler { responder, error: None })
    }

    fn execute<C: ProtocolChannel>(&self, channel: &mut C) {
        channel.write_sync();
    }
}

struct SyncHandler {
    responder: Responder<TransactionStatus>,
    error: Option<Notice>,
}

impl Handler for SyncHandler {
    fn error(&mut self, notice: &Notice) -> Option<Action> {
        if self.error.is_none() {
            self.error = Some(notice.clone());
        }
        Some(Action::Resume)
    }

    fn ready_for_query(&mut self, ready: &ReadyForQuery) -> Option<Action> {
        match self.error.take() {
            Some(notice) => self.responder.send(Err(notice.into())),
            None => self.responder.send(Ok(ready.tx_status)),
        }
        Some(Action::Complete)
    }

    fn exception(&mut self, exception: &Exception) {
        self.responder.fail(exception);
    }
}
