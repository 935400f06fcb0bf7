use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWriteExt, DuplexStream};

use pgline::{
    ErrorKind, Pipeline, read_message,
    postgres::{Oid, backend::TransactionStatus, oid},
    protocol::{
        Exception, ExecuteRequest, LazyQueryRequest, PrepareRequest, QueryRequest, SyncRequest,
    },
    types::{SessionContext, Value},
};

fn block_on<F: Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

/// Scripted server side of an in-memory connection.
struct Server {
    io: DuplexStream,
    buf: BytesMut,
}

impl Server {
    async fn recv(&mut self) -> (u8, Bytes) {
        read_message(&mut self.io, &mut self.buf).await.unwrap()
    }

    /// Read messages and assert their types.
    async fn expect(&mut self, msgtypes: &[u8]) -> Vec<Bytes> {
        let mut bodies = vec![];
        for &expected in msgtypes {
            let (msgtype, body) = self.recv().await;
            assert_eq!(msgtype as char, expected as char);
            bodies.push(body);
        }
        bodies
    }

    async fn send(&mut self, messages: &[Vec<u8>]) {
        for message in messages {
            self.io.write_all(message).await.unwrap();
        }
    }
}

fn connect() -> (Pipeline, Server) {
    let (client, server) = tokio::io::duplex(8 * 1024);
    let (read, write) = tokio::io::split(client);
    let pipeline = Pipeline::new(read, write);
    (pipeline, Server { io: server, buf: BytesMut::new() })
}

fn msg(msgtype: u8, body: &[u8]) -> Vec<u8> {
    let mut buf = vec![msgtype];
    buf.extend_from_slice(&(body.len() as u32 + 4).to_be_bytes());
    buf.extend_from_slice(body);
    buf
}

fn nul(s: &str) -> Vec<u8> {
    let mut buf = s.as_bytes().to_vec();
    buf.push(0);
    buf
}

fn ready() -> Vec<u8> {
    msg(b'Z', b"I")
}

fn complete(tag: &str) -> Vec<u8> {
    msg(b'C', &nul(tag))
}

fn notice_fields(msgtype: u8, severity: &str, code: &str, message: &str) -> Vec<u8> {
    let mut body = vec![];
    for (field, value) in [(b'S', severity), (b'V', severity), (b'C', code), (b'M', message)] {
        body.push(field);
        body.extend_from_slice(&nul(value));
    }
    body.push(0);
    msg(msgtype, &body)
}

fn error(code: &str, message: &str) -> Vec<u8> {
    notice_fields(b'E', "ERROR", code, message)
}

fn notice(message: &str) -> Vec<u8> {
    notice_fields(b'N', "WARNING", "01000", message)
}

fn row_description(fields: &[(&str, Oid, u16)]) -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_u16(fields.len() as u16);
    for &(name, type_oid, format) in fields {
        body.put_slice(&nul(name));
        body.put_u32(0);
        body.put_i16(0);
        body.put_u32(type_oid);
        body.put_i16(-1);
        body.put_i32(-1);
        body.put_u16(format);
    }
    msg(b'T', &body)
}

fn data_row(values: &[Option<&[u8]>]) -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_u16(values.len() as u16);
    for value in values {
        match value {
            Some(value) => {
                body.put_i32(value.len() as i32);
                body.put_slice(value);
            },
            None => body.put_i32(-1),
        }
    }
    msg(b'D', &body)
}

#[test]
fn simple_query() {
    block_on(async {
        let (pipeline, mut server) = connect();
        let cx = SessionContext::default();

        let pending = pipeline.submit(QueryRequest::new("SELECT 420; SELECT 1 WHERE false")).await.unwrap();

        let body = server.expect(b"Q").await;
        assert_eq!(&body[0][..], b"SELECT 420; SELECT 1 WHERE false\0");
        server.send(&[
            row_description(&[("id", oid::INT4, 0)]),
            data_row(&[Some(&b"420"[..])]),
            complete("SELECT 1"),
            row_description(&[("id", oid::INT4, 0)]),
            complete("SELECT 0"),
            ready(),
        ]).await;

        let results = pending.await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rows_affected(), 1);
        assert_eq!(results[0].rows[0].get::<i32, _>("id", &cx).unwrap(), 420);
        assert!(results[1].rows.is_empty());
        assert_eq!(results[1].tag.as_ref().unwrap().as_str(), "SELECT 0");
    });
}

#[test]
fn pipelined_requests_complete_in_order() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let first = pipeline.submit(QueryRequest::new("INSERT INTO t VALUES (1)")).await.unwrap();
        let second = pipeline.submit(QueryRequest::new("DELETE FROM t")).await.unwrap();
        assert_eq!(pipeline.pending(), 2);

        server.expect(b"QQ").await;
        server.send(&[complete("INSERT 0 1"), ready()]).await;
        server.send(&[complete("DELETE 2"), ready()]).await;

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert_eq!(first[0].tag.as_ref().unwrap().command(), "INSERT");
        assert_eq!(second[0].rows_affected(), 2);
        assert_eq!(pipeline.pending(), 0);
    });
}

#[test]
fn query_error_is_reported_on_ready() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let pending = pipeline.submit(QueryRequest::new("SELECT nope")).await.unwrap();
        server.expect(b"Q").await;
        server.send(&[error("42703", "column \"nope\" does not exist"), ready()]).await;

        let err = pending.await.unwrap_err();
        let notice = err.as_database().unwrap();
        assert_eq!(notice.code(), "42703");
        assert!(!pipeline.is_closed());
    });
}

#[test]
fn lazy_error_passes_to_next_request() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let begin = pipeline.submit(LazyQueryRequest::new("BEGIN")).await.unwrap();
        assert!(!pipeline.is_synced().await);
        let sync = pipeline.submit(SyncRequest).await.unwrap();
        assert!(pipeline.is_synced().await);

        server.expect(b"PBDEHS").await;
        server.send(&[error("25001", "already in transaction"), ready()]).await;

        assert_eq!(begin.await.unwrap_err().as_database().unwrap().code(), "25001");
        assert_eq!(sync.await.unwrap_err().as_database().unwrap().code(), "25001");
    });
}

#[test]
fn lazy_error_before_next_request_is_submitted() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let begin = pipeline.submit(LazyQueryRequest::new("BEGIN")).await.unwrap();
        server.expect(b"PBDEH").await;
        server.send(&[error("25001", "already in transaction")]).await;

        // the error arrives while nothing else is queued
        assert!(begin.await.is_err());

        let sync = pipeline.submit(SyncRequest).await.unwrap();
        server.expect(b"S").await;
        server.send(&[ready()]).await;

        assert_eq!(sync.await.unwrap_err().as_database().unwrap().code(), "25001");
    });
}

#[test]
fn simple_query_after_failed_lazy_request() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let begin = pipeline.submit(LazyQueryRequest::new("BEGIN")).await.unwrap();
        let query = pipeline.submit(QueryRequest::new("SELECT 1")).await.unwrap();
        assert!(pipeline.is_synced().await);

        // `Sync` is written before the simple query
        server.expect(b"PBDEHSQ").await;
        server.send(&[error("25001", "already in transaction"), ready()]).await;
        server.send(&[
            row_description(&[("n", oid::INT4, 0)]),
            data_row(&[Some(&b"1"[..])]),
            complete("SELECT 1"),
            ready(),
        ]).await;

        assert_eq!(begin.await.unwrap_err().as_database().unwrap().code(), "25001");
        let results = query.await.unwrap();
        assert_eq!(results[0].rows.len(), 1);
        assert_eq!(pipeline.pending(), 0);
    });
}

#[test]
fn simple_query_after_synced_request_is_written_alone() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let sync = pipeline.submit(SyncRequest).await.unwrap();
        let query = pipeline.submit(QueryRequest::new("SELECT 1")).await.unwrap();

        server.expect(b"SQ").await;
        server.send(&[ready(), complete("SELECT 0"), ready()]).await;

        sync.await.unwrap();
        assert_eq!(query.await.unwrap().len(), 1);
    });
}

#[test]
fn lazy_success_then_sync() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let begin = pipeline.submit(LazyQueryRequest::new("BEGIN")).await.unwrap();
        server.expect(b"PBDEH").await;
        server.send(&[msg(b'1', b""), msg(b'2', b""), msg(b'n', b""), complete("BEGIN")]).await;

        let begin = begin.await.unwrap();
        assert_eq!(begin.tag.unwrap().as_str(), "BEGIN");

        let sync = pipeline.submit(SyncRequest).await.unwrap();
        server.expect(b"S").await;
        server.send(&[msg(b'Z', b"T")]).await;
        assert_eq!(sync.await.unwrap(), TransactionStatus::Transaction);
    });
}

#[test]
fn prepare_and_execute() {
    block_on(async {
        let (pipeline, mut server) = connect();
        let cx = SessionContext::default();

        let pending = pipeline.submit(PrepareRequest::new("SELECT $1::int4 AS n, 'x' AS s", vec![])).await.unwrap();
        let bodies = server.expect(b"PDS").await;
        assert!(bodies[0].starts_with(b"s"));

        let mut params = BytesMut::new();
        params.put_u16(1);
        params.put_u32(oid::INT4);
        server.send(&[
            msg(b'1', b""),
            msg(b't', &params),
            row_description(&[("n", oid::INT4, 0), ("s", 705, 0)]),
            ready(),
        ]).await;

        let stmt = pending.await.unwrap();
        assert_eq!(stmt.params(), [oid::INT4]);
        assert_eq!(stmt.fields().len(), 2);

        let request = ExecuteRequest::new(&stmt, &[Value::Int32(7)], &cx).unwrap();
        let pending = pipeline.submit(request).await.unwrap();

        let bodies = server.expect(b"BES").await;
        // one binary int4 parameter, then result formats binary and text
        assert!(bodies[0].ends_with(&[0, 1, 0, 0, 0, 4, 0, 0, 0, 7, 0, 2, 0, 1, 0, 0]));

        server.send(&[
            msg(b'2', b""),
            data_row(&[Some(&7i32.to_be_bytes()[..]), Some(&b"x"[..])]),
            complete("SELECT 1"),
            ready(),
        ]).await;

        let result = pending.await.unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get::<i32, _>("n", &cx).unwrap(), 7);
        assert_eq!(result.rows[0].raw(1).unwrap().as_deref(), Some(&b"x"[..]));
    });
}

#[test]
fn execute_param_count_mismatch() {
    block_on(async {
        let (pipeline, mut server) = connect();
        let cx = SessionContext::default();

        let pending = pipeline.submit(PrepareRequest::new("SELECT $1::int4", vec![])).await.unwrap();
        server.expect(b"PDS").await;
        let mut params = BytesMut::new();
        params.put_u16(1);
        params.put_u32(oid::INT4);
        server.send(&[msg(b'1', b""), msg(b't', &params), msg(b'n', b""), ready()]).await;

        let stmt = pending.await.unwrap();
        assert!(stmt.fields().is_empty());

        let err = ExecuteRequest::new(&stmt, &[], &cx).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Encode(_)));
        let err = ExecuteRequest::new(&stmt, &[Value::from("7")], &cx).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Encode(_)));
    });
}

#[test]
fn notices_and_parameter_status() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let pending = pipeline.submit(QueryRequest::new("DROP TABLE IF EXISTS t")).await.unwrap();
        server.expect(b"Q").await;

        let mut status = nul("TimeZone");
        status.extend_from_slice(&nul("UTC"));
        server.send(&[
            notice("table \"t\" does not exist, skipping"),
            msg(b'S', &status),
            complete("DROP TABLE"),
            ready(),
        ]).await;

        let results = pending.await.unwrap();
        assert_eq!(results[0].notices.len(), 1);
        assert_eq!(results[0].notices[0].message(), "table \"t\" does not exist, skipping");
        assert_eq!(pipeline.parameter("TimeZone").unwrap(), "UTC");
    });
}

fn notification(payload: &str) -> Vec<u8> {
    let mut body = 42u32.to_be_bytes().to_vec();
    body.extend_from_slice(&nul("jobs"));
    body.extend_from_slice(&nul(payload));
    msg(b'A', &body)
}

#[test]
fn notifications_keep_the_newest() {
    block_on(async {
        let (pipeline, mut server) = connect();
        let total = Pipeline::NOTIFICATION_CAPACITY + 2;

        let notifications: Vec<_> = (0..total).map(|i|notification(&i.to_string())).collect();
        server.send(&notifications).await;

        // ordered after every notification
        let sync = pipeline.submit(SyncRequest).await.unwrap();
        server.expect(b"S").await;
        server.send(&[ready()]).await;
        sync.await.unwrap();

        let received = pipeline.take_notifications();
        assert_eq!(received.len(), Pipeline::NOTIFICATION_CAPACITY);
        assert_eq!(&*received[0].payload, "2");
        assert_eq!(&*received[received.len() - 1].channel, "jobs");
        assert_eq!(&*received[received.len() - 1].payload, (total - 1).to_string());
        assert!(pipeline.take_notifications().is_empty());
    });
}

#[test]
fn connection_failure_reaches_every_request() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let first = pipeline.submit(QueryRequest::new("SELECT 1")).await.unwrap();
        let second = pipeline.submit(SyncRequest).await.unwrap();
        server.expect(b"QS").await;
        drop(server);

        for err in [first.await.unwrap_err(), second.await.unwrap_err()] {
            assert!(matches!(err.kind(), ErrorKind::Closed(Exception::Io(_))));
        }

        assert!(pipeline.is_closed());
        assert!(pipeline.submit(SyncRequest).await.is_err());
    });
}

#[test]
fn close_fails_pending_and_terminates() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let pending = pipeline.submit(QueryRequest::new("SELECT pg_sleep(10)")).await.unwrap();
        server.expect(b"Q").await;

        pipeline.close().await.unwrap();
        server.expect(b"X").await;

        let err = pending.await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(Exception::Closed)));
    });
}

#[test]
fn unexpected_message_closes_pipeline() {
    block_on(async {
        let (pipeline, mut server) = connect();

        let pending = pipeline.submit(SyncRequest).await.unwrap();
        server.expect(b"S").await;
        // BackendKeyData only belongs to startup
        server.send(&[msg(b'K', &[0, 0, 0, 1, 0, 0, 0, 2])]).await;

        let err = pending.await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(Exception::Protocol(_))));
    });
}
