use std::{fmt, io, sync::Arc};

use super::Action;
use crate::{
    notice::Notice,
    postgres::{
        BackendMessage, ProtocolError,
        backend::{
            CommandComplete, DataRow, ParameterDescription, ReadyForQuery, RowDescription,
        },
    },
};

/// Receiver of the responses of a single request.
///
/// Every capability defaults to `None`, which means the handler is not
/// interested in the event and dispatch stops there. Handlers run on the
/// connection reader task, they must not block.
#[allow(unused_variables)]
pub trait Handler: Send {
    fn parse_complete(&mut self) -> Option<Action> {
        None
    }

    fn bind_complete(&mut self) -> Option<Action> {
        None
    }

    fn close_complete(&mut self) -> Option<Action> {
        None
    }

    fn parameter_description(&mut self, params: &ParameterDescription) -> Option<Action> {
        None
    }

    fn row_description(&mut self, desc: &RowDescription) -> Option<Action> {
        None
    }

    fn no_data(&mut self) -> Option<Action> {
        None
    }

    fn data_row(&mut self, row: &DataRow) -> Option<Action> {
        None
    }

    fn command_complete(&mut self, complete: &CommandComplete) -> Option<Action> {
        None
    }

    fn empty_query(&mut self) -> Option<Action> {
        None
    }

    fn portal_suspended(&mut self) -> Option<Action> {
        None
    }

    fn ready_for_query(&mut self, ready: &ReadyForQuery) -> Option<Action> {
        None
    }

    /// Server reported a command error.
    fn error(&mut self, notice: &Notice) -> Option<Action> {
        None
    }

    /// Server sent an informational notice.
    fn notice(&mut self, notice: &Notice) -> Option<Action> {
        None
    }

    /// The connection failed, no further event will arrive.
    fn exception(&mut self, exception: &Exception) { }
}

/// A backend message which belongs to a request.
#[derive(Debug)]
pub enum Event {
    ParseComplete,
    BindComplete,
    CloseComplete,
    ParameterDescription(ParameterDescription),
    RowDescription(RowDescription),
    NoData,
    DataRow(DataRow),
    CommandComplete(CommandComplete),
    EmptyQuery,
    PortalSuspended,
    ReadyForQuery(ReadyForQuery),
    Error(Notice),
    Notice(Notice),
}

impl Event {
    /// Convert backend message into event.
    ///
    /// Messages which belong to no request are returned back.
    pub fn from_backend(message: BackendMessage) -> Result<Event, BackendMessage> {
        use BackendMessage as B;
        let event = match message {
            B::ParseComplete(_) => Self::ParseComplete,
            B::BindComplete(_) => Self::BindComplete,
            B::CloseComplete(_) => Self::CloseComplete,
            B::ParameterDescription(p) => Self::ParameterDescription(p),
            B::RowDescription(r) => Self::RowDescription(r),
            B::NoData(_) => Self::NoData,
            B::DataRow(r) => Self::DataRow(r),
            B::CommandComplete(c) => Self::CommandComplete(c),
            B::EmptyQueryResponse(_) => Self::EmptyQuery,
            B::PortalSuspended(_) => Self::PortalSuspended,
            B::ReadyForQuery(r) => Self::ReadyForQuery(r),
            B::ErrorResponse(e) => Self::Error(e.notice),
            B::NoticeResponse(n) => Self::Notice(n.notice),
            message => return Err(message),
        };
        Ok(event)
    }

    /// Deliver event to the matching handler capability.
    pub fn deliver(&self, handler: &mut dyn Handler) -> Option<Action> {
        match self {
            Self::ParseComplete => handler.parse_complete(),
            Self::BindComplete => handler.bind_complete(),
            Self::CloseComplete => handler.close_complete(),
            Self::ParameterDescription(p) => handler.parameter_description(p),
            Self::RowDescription(r) => handler.row_description(r),
            Self::NoData => handler.no_data(),
            Self::DataRow(r) => handler.data_row(r),
            Self::CommandComplete(c) => handler.command_complete(c),
            Self::EmptyQuery => handler.empty_query(),
            Self::PortalSuspended => handler.portal_suspended(),
            Self::ReadyForQuery(r) => handler.ready_for_query(r),
            Self::Error(n) => handler.error(n),
            Self::Notice(n) => handler.notice(n),
        }
    }

    /// Event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParseComplete => "ParseComplete",
            Self::BindComplete => "BindComplete",
            Self::CloseComplete => "CloseComplete",
            Self::ParameterDescription(_) => "ParameterDescription",
            Self::RowDescription(_) => "RowDescription",
            Self::NoData => "NoData",
            Self::DataRow(_) => "DataRow",
            Self::CommandComplete(_) => "CommandComplete",
            Self::EmptyQuery => "EmptyQuery",
            Self::PortalSuspended => "PortalSuspended",
            Self::ReadyForQuery(_) => "ReadyForQuery",
            Self::Error(_) => "Error",
            Self::Notice(_) => "Notice",
        }
    }
}

/// Fatal connection failure, broadcast to every queued handler.
#[derive(Clone)]
pub enum Exception {
    /// Reading from or writing to the socket failed.
    Io(Arc<io::Error>),
    /// Server sent a message that could not be decoded or does not belong
    /// to the current state.
    Protocol(Arc<ProtocolError>),
    /// Connection closed by the client.
    Closed,
}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

impl From<ProtocolError> for Exception {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(Arc::new(e))
    }
}

impl std::error::Error for Exception { }

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "connection failed: {e}"),
            Self::Protocol(e) => write!(f, "connection failed: {e}"),
            Self::Closed => f.write_str("connection closed"),
        }
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
