//! Postgres connection.
use lru::LruCache;
use std::{
    hash::{DefaultHasher, Hash, Hasher},
    num::NonZeroUsize,
    sync::Arc,
};

use crate::{
    Result,
    common::{ByteStr, verbose},
    net::PgStream,
    postgres::backend::{BackendKeyData, NotificationResponse, TransactionStatus},
    protocol::{
        CloseRequest, ExecuteRequest, LazyQueryRequest, Pending, Pipeline, PrepareRequest,
        QueryRequest, Request, SyncRequest,
    },
    row::QueryResult,
    statement::Statement,
    types::{Registry, SessionContext, Value},
};

mod config;
mod startup;

pub use config::{Config, ParseError};
pub use startup::UnsupportedAuth;

/// A single postgres session.
///
/// Thin layer over [`Pipeline`], holding the codec [`Context`][crate::types::Context]
/// and the prepared statement cache.
#[derive(Debug)]
pub struct Connection {
    pipeline: Pipeline,
    cx: SessionContext,
    statements: Option<LruCache<u64, Statement>>,
    backend_key_data: Option<BackendKeyData>,
}

impl Connection {
    /// Connect using url, see [`Config`].
    pub async fn connect(url: &str) -> Result<Connection> {
        Self::connect_with(Config::parse(url)?).await
    }

    /// Connect using config from environment, see [`Config::from_env`].
    pub async fn connect_env() -> Result<Connection> {
        Self::connect_with(Config::from_env()).await
    }

    pub async fn connect_with(config: Config) -> Result<Connection> {
        Self::connect_with_registry(config, Arc::new(Registry::standard())).await
    }

    /// Connect with custom codec registry.
    pub async fn connect_with_registry(config: Config, registry: Arc<Registry>) -> Result<Connection> {
        let mut stream = PgStream::connect(&config).await?;
        let startup = startup::startup(&config, &mut stream).await?;

        let (read, write, read_buf) = stream.into_parts();
        let pipeline = Pipeline::with_buffer(read, read_buf, write);
        for (name, value) in startup.param_status {
            pipeline.set_parameter(name, value);
        }

        let statements = NonZeroUsize::new(config.settings.statement_cache).map(LruCache::new);

        Ok(Self {
            pipeline,
            cx: SessionContext::new(registry, config.settings),
            statements,
            backend_key_data: startup.backend_key_data,
        })
    }

    /// Codec context of this session, used to decode rows.
    pub fn context(&self) -> &SessionContext {
        &self.cx
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Cancellation key of the backend process.
    pub fn backend_key_data(&self) -> Option<BackendKeyData> {
        self.backend_key_data
    }

    /// Latest value the server reported for a runtime parameter.
    pub fn parameter(&self, name: &str) -> Option<ByteStr> {
        self.pipeline.parameter(name)
    }

    /// Drain received `LISTEN` notifications.
    pub fn take_notifications(&self) -> Vec<NotificationResponse> {
        self.pipeline.take_notifications()
    }

    /// Submit any request without waiting for the response.
    pub async fn submit<R: Request>(&self, request: R) -> Result<Pending<R::Output>> {
        self.pipeline.submit(request).await
    }

    /// Run simple query, which may contain multiple statements.
    ///
    /// An error of a preceding lazy request is reported here.
    pub async fn query(&self, sql: &str) -> Result<Vec<QueryResult>> {
        if !self.pipeline.is_synced().await {
            self.sync().await?;
        }
        self.submit(QueryRequest::new(sql)).await?.await
    }

    /// Prepare statement, cached by its sql.
    pub async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        let key = {
            let mut hasher = DefaultHasher::new();
            sql.hash(&mut hasher);
            hasher.finish()
        };

        if let Some(stmt) = self.statements.as_mut().and_then(|e|e.get(&key)) {
            return Ok(stmt.clone());
        }

        let stmt = self.submit(PrepareRequest::new(sql, Vec::new())).await?.await?;

        if let Some(cache) = self.statements.as_mut() {
            if let Some((_, evicted)) = cache.push(key, stmt.clone()) {
                if evicted.name != stmt.name {
                    verbose!("evict {}", evicted.name);
                    // outcome is irrelevant, an error is passed on
                    let _ = self.pipeline.submit(CloseRequest::new(evicted.name)).await?;
                }
            }
        }

        Ok(stmt)
    }

    /// Prepare and execute statement with binary encoded parameters.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let stmt = self.prepare(sql).await?;
        let request = ExecuteRequest::new(&stmt, params, &self.cx)?;
        let pending = self.submit(request).await?;

        if self.statements.is_none() {
            let _ = self.submit(CloseRequest::new(stmt.name)).await?;
        }

        pending.await
    }

    /// Begin transaction lazily.
    ///
    /// `BEGIN` is written without waiting for the response, and is sent
    /// along with the next request. The returned [`Pending`] may be
    /// ignored, a failure is also reported by the next request.
    pub async fn begin(&self) -> Result<Pending<QueryResult>> {
        self.submit(LazyQueryRequest::new("BEGIN")).await
    }

    pub async fn commit(&self) -> Result<()> {
        self.query("COMMIT").await.map(drop)
    }

    pub async fn rollback(&self) -> Result<()> {
        self.query("ROLLBACK").await.map(drop)
    }

    /// Send `Sync` and wait for the server.
    pub async fn sync(&self) -> Result<TransactionStatus> {
        self.submit(SyncRequest).await?.await
    }

    /// Send `Terminate` and close the socket.
    pub async fn close(self) -> Result<()> {
        self.pipeline.close().await
    }
}
