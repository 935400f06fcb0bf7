//! `pgline` error types.
use std::{backtrace::Backtrace, fmt, io};

use crate::{
    connection::{ParseError, UnsupportedAuth},
    notice::Notice,
    postgres::ProtocolError,
    protocol::Exception,
    types::{DecodeError, EncodeError, TypeNotSupported},
};

/// A specialized [`Result`] type for `pgline` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `pgline` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns the server notice if this is a command error.
    pub fn as_database(&self) -> Option<&Notice> {
        match &self.kind {
            ErrorKind::Database(notice) => Some(notice),
            _ => None,
        }
    }

    /// Add context to the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// All possible error kind from `pgline` library.
pub enum ErrorKind {
    Config(ParseError),
    Protocol(ProtocolError),
    Io(io::Error),
    /// Command error, carrying the originating notice.
    Database(Notice),
    Decode(DecodeError),
    Encode(EncodeError),
    TypeNotSupported(TypeNotSupported),
    UnsupportedAuth(UnsupportedAuth),
    /// Connection was torn down.
    Closed(Exception),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<io::Error>e => ErrorKind::Io(e));
from!(<Notice>e => ErrorKind::Database(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<EncodeError>e => ErrorKind::Encode(e));
from!(<TypeNotSupported>e => ErrorKind::TypeNotSupported(e));
from!(<UnsupportedAuth>e => ErrorKind::UnsupportedAuth(e));
from!(<Exception>e => ErrorKind::Closed(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Encode(e) => e.fmt(f),
            Self::TypeNotSupported(e) => e.fmt(f),
            Self::UnsupportedAuth(e) => e.fmt(f),
            Self::Closed(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
