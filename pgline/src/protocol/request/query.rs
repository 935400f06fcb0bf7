use crate::{
    notice::Notice,
    postgres::backend::{CommandComplete, DataRow, ReadyForQuery, RowDescription},
    protocol::{Action, Exception, Handler, ProtocolChannel, Request, Responder},
    row::{QueryResult, Row},
};

/// Simple query.
///
/// The sql may contain multiple statements, one [`QueryResult`] is collected
/// per statement. Values are returned in text format.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    sql: String,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> QueryRequest {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Request for QueryRequest {
    type Output = Vec<QueryResult>;

    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler> {
        Box::new(QueryHandler {
            responder,
            current: QueryResult::empty(),
            results: Vec::new(),
            error: None,
        })
    }

    fn execute<C: ProtocolChannel>(&self, channel: &mut C) {
        channel.write_query(&self.sql);
    }

    fn needs_sync_before(&self) -> bool {
        true
    }
}

struct QueryHandler {
    responder: Responder<Vec<QueryResult>>,
    current: QueryResult,
    results: Vec<QueryResult>,
    error: Option<Notice>,
}

impl QueryHandler {
    fn finish_statement(&mut self) {
        let result = std::mem::replace(&mut self.current, QueryResult::empty());
        self.results.push(result);
    }
}

impl Handler for QueryHandler {
    fn row_description(&mut self, desc: &RowDescription) -> Option<Action> {
        self.current.fields = desc.fields.clone();
        Some(Action::Resume)
    }

    fn data_row(&mut self, row: &DataRow) -> Option<Action> {
        let row = Row::new(self.current.fields.clone(), row.body.clone());
        self.current.rows.push(row);
        Some(Action::Resume)
    }

    fn command_complete(&mut self, complete: &CommandComplete) -> Option<Action> {
        self.current.tag = Some(complete.tag.clone());
        self.finish_statement();
        Some(Action::Resume)
    }

    fn empty_query(&mut self) -> Option<Action> {
        self.finish_statement();
        Some(Action::Resume)
    }

    fn error(&mut self, notice: &Notice) -> Option<Action> {
        // remaining statements are skipped by the server
        if self.error.is_none() {
            self.error = Some(notice.clone());
        }
        Some(Action::Resume)
    }

    fn notice(&mut self, notice: &Notice) -> Option<Action> {
        self.current.notices.push(notice.clone());
        Some(Action::Resume)
    }

    fn ready_for_query(&mut self, _: &ReadyForQuery) -> Option<Action> {
        match self.error.take() {
            Some(notice) => self.responder.send(Err(notice.into())),
            None => self.responder.send(Ok(std::mem::take(&mut self.results))),
        }
        Some(Action::Complete)
    }

    fn exception(&mut self, exception: &Exception) {
        self.responder.fail(exception);
    }
}
