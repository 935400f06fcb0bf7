//! Server notices and errors.
//!
//! Both `ErrorResponse` and `NoticeResponse` carry the same body: a list of
//! fields identified by a single byte code, terminated by a zero byte.
//!
//! <https://www.postgresql.org/docs/current/protocol-error-fields.html>
use bytes::{Buf, Bytes};
use std::fmt;

use crate::{common::ByteStr, ext::BytesExt, postgres::ProtocolError};

/// Severity tag of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Fatal,
    Panic,
    Warning,
    Notice,
    Debug,
    Info,
    Log,
}

impl Severity {
    fn parse(value: &str) -> Option<Severity> {
        let severity = match value {
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            "PANIC" => Self::Panic,
            "WARNING" => Self::Warning,
            "NOTICE" => Self::Notice,
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "LOG" => Self::Log,
            _ => return None,
        };
        Some(severity)
    }

    /// Returns `true` for severities that abort the current command.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::Fatal | Self::Panic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Panic => "PANIC",
            Self::Warning => "WARNING",
            Self::Notice => "NOTICE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Log => "LOG",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An informational or error payload from the server.
///
/// Immutable once parsed. Fields the server did not send are `None`.
#[derive(Clone)]
pub struct Notice {
    severity: Severity,
    code: ByteStr,
    message: ByteStr,
    detail: Option<ByteStr>,
    hint: Option<ByteStr>,
    position: Option<ByteStr>,
    where_: Option<ByteStr>,
    schema: Option<ByteStr>,
    table: Option<ByteStr>,
    column: Option<ByteStr>,
    constraint: Option<ByteStr>,
    routine: Option<ByteStr>,
}

impl Notice {
    /// Parse `ErrorResponse` or `NoticeResponse` body.
    pub fn parse(mut body: Bytes) -> Result<Notice, ProtocolError> {
        let mut severity = None;
        let mut localized = None;
        let mut code = None;
        let mut message = None;
        let mut me = Notice {
            severity: Severity::Error,
            code: ByteStr::default(),
            message: ByteStr::default(),
            detail: None,
            hint: None,
            position: None,
            where_: None,
            schema: None,
            table: None,
            column: None,
            constraint: None,
            routine: None,
        };

        loop {
            body.ensure(1)?;
            let field = body.get_u8();
            if field == b'\0' {
                break;
            }
            let value = body.get_nul_bytestr()?;
            match field {
                // `V` is never localized, prefer it over `S`
                b'V' => severity = Severity::parse(&value),
                b'S' => localized = Some(value),
                b'C' => code = Some(value),
                b'M' => message = Some(value),
                b'D' => me.detail = Some(value),
                b'H' => me.hint = Some(value),
                b'P' => me.position = Some(value),
                b'W' => me.where_ = Some(value),
                b's' => me.schema = Some(value),
                b't' => me.table = Some(value),
                b'c' => me.column = Some(value),
                b'n' => me.constraint = Some(value),
                b'R' => me.routine = Some(value),
                _ => { }
            }
        }

        me.severity = match (severity, localized.as_deref().and_then(Severity::parse)) {
            (Some(s), _) | (None, Some(s)) => s,
            (None, None) => return Err(ProtocolError::malformed("notice without severity")),
        };
        me.code = code.ok_or(ProtocolError::malformed("notice without code"))?;
        me.message = message.ok_or(ProtocolError::malformed("notice without message"))?;

        Ok(me)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns `true` if severity is `ERROR`, `FATAL` or `PANIC`.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// The SQLSTATE code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The primary human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Cursor position into the original query string, 1-based in characters.
    pub fn position(&self) -> Option<&str> {
        self.position.as_deref()
    }

    /// Call stack traceback of active procedural language functions.
    pub fn where_(&self) -> Option<&str> {
        self.where_.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    /// Name of the source-code routine reporting the notice.
    pub fn routine(&self) -> Option<&str> {
        self.routine.as_deref()
    }
}

impl std::error::Error for Notice { }

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.severity, self.code, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, ", {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, ", hint: {hint}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Build an `ErrorResponse`/`NoticeResponse` body.
    pub(crate) fn body(severity: &str, code: &str, message: &str) -> Bytes {
        let mut b = Vec::new();
        for (k, v) in [(b'S', severity), (b'V', severity), (b'C', code), (b'M', message)] {
            b.push(k);
            b.extend_from_slice(v.as_bytes());
            b.push(0);
        }
        b.push(0);
        b.into()
    }

    #[test]
    fn parse_error() {
        let notice = Notice::parse(body("ERROR", "42P01", "relation \"foo\" does not exist")).unwrap();
        assert_eq!(notice.severity(), Severity::Error);
        assert!(notice.is_error());
        assert_eq!(notice.code(), "42P01");
        assert_eq!(notice.message(), "relation \"foo\" does not exist");
        assert_eq!(notice.detail(), None);
    }

    #[test]
    fn localized_severity_fallback() {
        let raw = b"SWARNUNG\0CXX000\0Mhallo\0Dmore\0\0";
        let err = Notice::parse(Bytes::from_static(raw)).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));

        let raw = b"SWARNING\0C01000\0Mcareful\0Dmore\0\0";
        let notice = Notice::parse(Bytes::from_static(raw)).unwrap();
        assert_eq!(notice.severity(), Severity::Warning);
        assert!(!notice.is_error());
        assert_eq!(notice.detail(), Some("more"));
    }

    #[test]
    fn unknown_fields_ignored() {
        let raw = b"VNOTICE\0C00000\0Mhi\0Zwhatever\0\0";
        let notice = Notice::parse(Bytes::from_static(raw)).unwrap();
        assert_eq!(notice.to_string(), "NOTICE (00000): hi");
    }

    #[test]
    fn missing_terminator() {
        assert!(Notice::parse(Bytes::from_static(b"VNOTICE\0")).is_err());
    }
}
