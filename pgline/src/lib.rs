//! Pipelined Postgres Driver
//!
//! Requests are written without waiting for the previous response. Each
//! request queues a handler, and responses are attributed to handlers by
//! queue order, see [`protocol`].
//!
//! # Examples
//!
//! ```no_run
//! use pgline::{Connection, types::Value};
//!
//! # async fn app() -> pgline::Result<()> {
//! let mut conn = Connection::connect_env().await?;
//!
//! // sent along with the next request
//! let _begin = conn.begin().await?;
//!
//! let res = conn.execute("SELECT 420, $1::bytea", &[Value::from(&b"Foo"[..])]).await?;
//! let row = &res.rows[0];
//!
//! assert_eq!(row.get::<i32, _>(0, conn.context())?, 420);
//! assert_eq!(row.get::<Vec<u8>, _>(1, conn.context())?, b"Foo");
//!
//! conn.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
mod net;
mod ext;

// Protocol
pub mod postgres;
pub mod notice;
pub mod protocol;

// Encoding
pub mod types;

// Component
pub mod statement;
pub mod row;

// Connection
pub mod connection;

mod error;

pub use net::{MAX_MESSAGE_LEN, PgStream, Socket, read_message};
pub use notice::{Notice, Severity};
pub use protocol::{Action, Handler, Pipeline, Request};
pub use row::{CommandTag, Field, QueryResult, Row};
pub use statement::Statement;
pub use connection::{Config, Connection};
pub use error::{Error, ErrorKind, Result};
