use bytes::BytesMut;

use crate::postgres::{
    FrontendProtocol, Oid, PgFormat,
    frontend::{self, Bind, Close, Describe, Execute, Flush, Parse, Query, Sync, Terminate},
};

/// Ordered sink of frontend messages.
///
/// Messages are written in call order. A [`Request`][super::Request]
/// serializes itself only through this trait.
pub trait ProtocolChannel {
    /// Write any frontend message.
    fn send<F: FrontendProtocol>(&mut self, message: F);

    fn write_query(&mut self, sql: &str) {
        self.send(Query { sql });
    }

    fn write_parse(&mut self, prepare_name: &str, sql: &str, oids: &[Oid]) {
        self.send(Parse { prepare_name, sql, oids });
    }

    /// `params` must already be framed, see [`Bind::params`].
    fn write_bind(
        &mut self,
        portal_name: &str,
        stmt_name: &str,
        param_formats: &[PgFormat],
        params_len: u16,
        params: &[u8],
        result_formats: &[PgFormat],
    ) {
        self.send(Bind {
            portal_name,
            stmt_name,
            param_formats,
            params_len,
            params,
            result_formats,
        });
    }

    /// `kind` is `b'S'` for a statement or `b'P'` for a portal.
    fn write_describe(&mut self, kind: u8, name: &str) {
        self.send(Describe { kind, name });
    }

    fn write_execute(&mut self, portal_name: &str, max_row: u32) {
        self.send(Execute { portal_name, max_row });
    }

    /// `variant` is `b'S'` for a statement or `b'P'` for a portal.
    fn write_close(&mut self, variant: u8, name: &str) {
        self.send(Close { variant, name });
    }

    fn write_sync(&mut self) {
        self.send(Sync);
    }

    fn write_flush(&mut self) {
        self.send(Flush);
    }

    fn write_terminate(&mut self) {
        self.send(Terminate);
    }
}

impl ProtocolChannel for BytesMut {
    fn send<F: FrontendProtocol>(&mut self, message: F) {
        frontend::write(message, self);
    }
}
