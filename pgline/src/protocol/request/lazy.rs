use crate::{
    notice::Notice,
    postgres::backend::{CommandComplete, DataRow, RowDescription},
    protocol::{Action, Exception, Handler, ProtocolChannel, Request, Responder},
    row::{QueryResult, Row},
};

/// Single statement without `Sync`.
///
/// Written as unnamed `Parse`, `Bind`, `Describe`, `Execute` followed by
/// `Flush`, so the server answers right away but no transaction boundary is
/// placed. A command like `BEGIN` can then prefix the request that actually
/// needs it without a round trip.
///
/// On error the server discards everything until the next `Sync`, so the
/// error is passed on to the request after it.
#[derive(Debug, Clone)]
pub struct LazyQueryRequest {
    sql: String,
}

impl LazyQueryRequest {
    pub fn new(sql: impl Into<String>) -> LazyQueryRequest {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Request for LazyQueryRequest {
    type Output = QueryResult;

    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler> {
        Box::new(LazyHandler { responder, result: QueryResult::empty() })
    }

    fn execute<C: ProtocolChannel>(&self, channel: &mut C) {
        channel.write_parse("", &self.sql, &[]);
        channel.write_bind("", "", &[], 0, &[], &[]);
        channel.write_describe(b'P', "");
        channel.write_execute("", 0);
        channel.write_flush();
    }

    fn synchronizes(&self) -> bool {
        false
    }
}

struct LazyHandler {
    responder: Responder<QueryResult>,
    result: QueryResult,
}

impl LazyHandler {
    fn finish(&mut self) -> Option<Action> {
        let result = std::mem::replace(&mut self.result, QueryResult::empty());
        self.responder.send(Ok(result));
        Some(Action::Complete)
    }
}

impl Handler for LazyHandler {
    fn parse_complete(&mut self) -> Option<Action> {
        Some(Action::Resume)
    }

    fn bind_complete(&mut self) -> Option<Action> {
        Some(Action::Resume)
    }

    fn row_description(&mut self, desc: &RowDescription) -> Option<Action> {
        self.result.fields = desc.fields.clone();
        Some(Action::Resume)
    }

    fn no_data(&mut self) -> Option<Action> {
        Some(Action::Resume)
    }

    fn data_row(&mut self, row: &DataRow) -> Option<Action> {
        self.result.rows.push(Row::new(self.result.fields.clone(), row.body.clone()));
        Some(Action::Resume)
    }

    fn command_complete(&mut self, complete: &CommandComplete) -> Option<Action> {
        self.result.tag = Some(complete.tag.clone());
        self.finish()
    }

    fn empty_query(&mut self) -> Option<Action> {
        self.finish()
    }

    fn error(&mut self, notice: &Notice) -> Option<Action> {
        self.responder.send(Err(notice.clone().into()));
        Some(Action::CompletePassing)
    }

    fn notice(&mut self, notice: &Notice) -> Option<Action> {
        self.result.notices.push(notice.clone());
        Some(Action::ResumePassing)
    }

    fn exception(&mut self, exception: &Exception) {
        self.responder.fail(exception);
    }
}
