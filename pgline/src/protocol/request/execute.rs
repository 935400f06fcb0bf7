use bytes::{Bytes, BytesMut};
use std::sync::Arc;

use crate::{
    Result,
    notice::Notice,
    postgres::{
        PgFormat,
        backend::{CommandComplete, DataRow, ReadyForQuery},
    },
    protocol::{Action, Exception, Handler, ProtocolChannel, Request, Responder},
    row::{Field, QueryResult, Row},
    statement::{Statement, StatementName},
    types::{Context, EncodeError, Value},
};

/// Execute a prepared statement.
///
/// Parameters are encoded in binary format when the request is created, with
/// the encoder registered for the parameter type the server inferred.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    stmt: StatementName,
    params: Bytes,
    params_len: u16,
    result_formats: Vec<PgFormat>,
    fields: Arc<[Field]>,
}

impl ExecuteRequest {
    /// # Errors
    ///
    /// Returns error if the number of `params` does not match the statement,
    /// or a parameter cannot be encoded.
    pub fn new(stmt: &Statement, params: &[Value], cx: &dyn Context) -> Result<ExecuteRequest> {
        if params.len() != stmt.params.len() {
            return Err(EncodeError::ParamCount {
                expected: stmt.params.len(),
                found: params.len(),
            }.into());
        }

        let params_len = u16::try_from(params.len()).map_err(|_|EncodeError::ParamCount {
            expected: u16::MAX as usize,
            found: params.len(),
        })?;

        let mut buf = BytesMut::new();
        for (&oid, value) in stmt.params.iter().zip(params) {
            let codec = cx.registry().lookup_by_type(oid)?;
            codec.binary_encoder.encode(&codec.ty, value, &mut buf, cx)?;
        }

        let result_formats = stmt.result_formats(cx.registry());
        let fields = stmt
            .fields
            .iter()
            .zip(&result_formats)
            .map(|(field, &format)|Field { format, ..field.clone() })
            .collect();

        Ok(Self {
            stmt: stmt.name.clone(),
            params: buf.freeze(),
            params_len,
            result_formats,
            fields,
        })
    }
}

impl Request for ExecuteRequest {
    type Output = QueryResult;

    fn create_handler(&self, responder: Responder<Self::Output>) -> Box<dyn Handler> {
        let mut result = QueryResult::empty();
        result.fields = self.fields.clone();
        Box::new(ExecuteHandler { responder, result, error: None })
    }

    fn execute<C: ProtocolChannel>(&self, channel: &mut C) {
        let param_formats: &[PgFormat] = match self.params_len {
            0 => &[],
            _ => &[PgFormat::Binary],
        };
        channel.write_bind(
            "",
            self.stmt.as_str(),
            param_formats,
            self.params_len,
            &self.params,
            &self.result_formats,
        );
        channel.write_execute("", 0);
        channel.write_sync();
    }
}

struct ExecuteHandler {
    responder: Responder<QueryResult>,
    result: QueryResult,
    error: Option<Notice>,
}

impl Handler for ExecuteHandler {
    fn bind_complete(&mut self) -> Option<Action> {
        Some(Action::Resume)
    }

    fn data_row(&mut self, row: &DataRow) -> Option<Action> {
        self.result.rows.push(Row::new(self.result.fields.clone(), row.body.clone()));
        Some(Action::Resume)
    }

    fn command_complete(&mut self, complete: &CommandComplete) -> Option<Action> {
        self.result.tag = Some(complete.tag.clone());
        Some(Action::Resume)
    }

    fn empty_query(&mut self) -> Option<Action> {
        Some(Action::Resume)
    }

    fn error(&mut self, notice: &Notice) -> Option<Action> {
        if self.error.is_none() {
            self.error = Some(notice.clone());
        }
        Some(Action::Resume)
    }

    fn notice(&mut self, notice: &Notice) -> Option<Action> {
        self.result.notices.push(notice.clone());
        Some(Action::Resume)
    }

    fn ready_for_query(&mut self, _: &ReadyForQuery) -> Option<Action> {
        match self.error.take() {
            Some(notice) => self.responder.send(Err(notice.into())),
            None => {
                let result = std::mem::replace(&mut self.result, QueryResult::empty());
                self.responder.send(Ok(result));
            },
        }
        Some(Action::Complete)
    }

    fn exception(&mut self, exception: &Exception) {
        self.responder.fail(exception);
    }
}
