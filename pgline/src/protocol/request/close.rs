use crate::{
    notice::Notice,
    protocol::{Action, Exception, Handler, ProtocolChannel, Request, Responder},
    statement::StatementName,
};

/// Close a prepared statement, without `Sync`.
#[derive(Debug, Clone)]
pub struct CloseRequest {
    name: StatementName,
}

impl CloseRequest {
    pub fn new(name: StatementName) -> CloseRequest {
        Self { name }
    }
}

impl Request for CloseRequest {
    type Output = ();

    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler> {
        Box::new(CloseHandler { responder })
    }

    fn execute<C: ProtocolChannel>(&self, channel: &mut C) {
        channel.write_close(b'S', self.name.as_str());
        channel.write_flush();
    }

    fn synchronizes(&self) -> bool {
        false
    }
}

struct CloseHandler {
    responder: Responder<()>,
}

impl Handler for CloseHandler {
    fn close_complete(&mut self) -> Option<Action> {
        self.responder.send(Ok(()));
        Some(Action::Complete)
    }

    fn error(&mut self, notice: &Notice) -> Option<Action> {
        self.responder.send(Err(notice.clone().into()));
        Some(Action::CompletePassing)
    }

    fn notice(&mut self, _: &Notice) -> Option<Action> {
        Some(Action::ResumePassing)
    }

    fn exception(&mut self, exception: &Exception) {
        self.responder.fail(exception);
    }
}
