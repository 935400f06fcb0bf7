use std::sync::Arc;

use crate::{
    notice::Notice,
    postgres::{
        Oid,
        backend::{ParameterDescription, ReadyForQuery, RowDescription},
    },
    protocol::{Action, Exception, Handler, ProtocolChannel, Request, Responder},
    row::Field,
    statement::{Statement, StatementName},
};

/// Prepare a named statement and describe it.
#[derive(Debug, Clone)]
pub struct PrepareRequest {
    name: StatementName,
    sql: String,
    oids: Vec<Oid>,
}

impl PrepareRequest {
    /// `oids` prespecify parameter types, zero or missing entries are
    /// inferred by the server.
    pub fn new(sql: impl Into<String>, oids: Vec<Oid>) -> PrepareRequest {
        Self {
            name: StatementName::next(),
            sql: sql.into(),
            oids,
        }
    }

    pub fn name(&self) -> &StatementName {
        &self.name
    }
}

impl Request for PrepareRequest {
    type Output = Statement;

    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler> {
        Box::new(PrepareHandler {
            responder,
            statement: Statement {
                name: self.name.clone(),
                params: Vec::new(),
                fields: Arc::new([]),
            },
            error: None,
        })
    }

    fn execute<C: ProtocolChannel>(&self, channel: &mut C) {
        channel.write_parse(self.name.as_str(), &self.sql, &self.oids);
        channel.write_describe(b'S', self.name.as_str());
        channel.write_sync();
    }
}

struct PrepareHandler {
    responder: Responder<Statement>,
    statement: Statement,
    error: Option<Notice>,
}

impl Handler for PrepareHandler {
    fn parse_complete(&mut self) -> Option<Action> {
        Some(Action::Resume)
    }

    fn parameter_description(&mut self, params: &ParameterDescription) -> Option<Action> {
        self.statement.params = params.oids.clone();
        Some(Action::Resume)
    }

    fn row_description(&mut self, desc: &RowDescription) -> Option<Action> {
        self.statement.fields = desc.fields.clone();
        Some(Action::Resume)
    }

    fn no_data(&mut self) -> Option<Action> {
        self.statement.fields = Arc::<[Field]>::from([]);
        Some(Action::Resume)
    }

    fn error(&mut self, notice: &Notice) -> Option<Action> {
        if self.error.is_none() {
            self.error = Some(notice.clone());
        }
        Some(Action::Resume)
    }

    fn notice(&mut self, _notice: &Notice) -> Option<Action> {
        #[cfg(feature = "log")]
        log::info!("{_notice}");
        Some(Action::Resume)
    }

    fn ready_for_query(&mut self, _: &ReadyForQuery) -> Option<Action> {
        match self.error.take() {
            Some(notice) => self.responder.send(Err(notice.into())),
            None => self.responder.send(Ok(self.statement.clone())),
        }
        Some(Action::Complete)
    }

    fn exception(&mut self, exception: &Exception) {
        self.responder.fail(exception);
    }
}
