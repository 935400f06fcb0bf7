use bytes::BytesMut;
use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    task::JoinHandle,
};

use super::{
    Dispatcher, Event, Exception, Pending, ProtocolChannel, Request, SyncRequest, responder,
};
use crate::{
    Result,
    common::{ByteStr, verbose},
    net::read_message,
    postgres::{BackendMessage, BackendProtocol, backend::NotificationResponse},
};

/// Pipelined connection core.
///
/// Requests are written under a write lock and their handlers queued in
/// the same order. A reader task receives responses and drives the
/// [`Dispatcher`].
///
/// Submitting does not wait for a response. A request that must not follow
/// an unsynchronized one (see [`Request::needs_sync_before`]) is preceded
/// by a `Sync` written under the same lock.
pub struct Pipeline {
    writer: tokio::sync::Mutex<Writer>,
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
}

struct Writer {
    io: Box<dyn AsyncWrite + Send + Unpin>,
    buf: BytesMut,
    synced: bool,
}

struct Shared {
    dispatcher: Mutex<Dispatcher>,
    parameters: Mutex<HashMap<ByteStr, ByteStr>>,
    notifications: Mutex<VecDeque<NotificationResponse>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // handlers never leave the queue half updated
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Pipeline {
    /// Maximum number of retained notifications, the oldest is dropped
    /// when a new one arrives at capacity.
    pub const NOTIFICATION_CAPACITY: usize = 1024;

    /// Start pipeline on an established session.
    ///
    /// Must be called within tokio runtime, the reader task is spawned.
    pub fn new<R, W>(reader: R, writer: W) -> Pipeline
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_buffer(reader, BytesMut::new(), writer)
    }

    /// Start pipeline with bytes already read from `reader`.
    pub fn with_buffer<R, W>(reader: R, read_buf: BytesMut, writer: W) -> Pipeline
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared {
            dispatcher: Mutex::new(Dispatcher::new()),
            parameters: Mutex::new(HashMap::new()),
            notifications: Mutex::new(VecDeque::new()),
        });

        let reader = tokio::spawn(read_loop(reader, read_buf, shared.clone()));

        Self {
            writer: tokio::sync::Mutex::new(Writer {
                io: Box::new(writer),
                buf: BytesMut::new(),
                synced: true,
            }),
            shared,
            reader,
        }
    }

    /// Queue the request handler and write the request.
    ///
    /// Returns once the request is flushed, the outcome is delivered through
    /// the returned [`Pending`].
    ///
    /// # Errors
    ///
    /// Returns error if the pipeline is closed or the write failed. A failed
    /// write closes the pipeline.
    pub async fn submit<R: Request>(&self, request: R) -> Result<Pending<R::Output>> {
        let (tx, pending) = responder();
        let mut writer = self.writer.lock().await;
        let Writer { io, buf, synced } = &mut *writer;

        {
            let mut dispatcher = lock(&self.shared.dispatcher);
            if !*synced && request.needs_sync_before() {
                verbose!("sync before request");
                // the error is already reported to the unsynchronized request
                let (sync_tx, _) = responder();
                dispatcher.push(SyncRequest.create_handler(sync_tx))?;
                SyncRequest.execute(buf);
            }
            dispatcher.push(request.create_handler(tx))?;
        }

        request.execute(buf);
        *synced = request.synchronizes();
        verbose!(len = buf.len(), synced = *synced, "write request");

        if let Err(err) = flush(io, buf).await {
            buf.clear();
            let exception = Exception::from(err);
            lock(&self.shared.dispatcher).fail(exception.clone());
            return Err(exception.into());
        }

        Ok(pending)
    }

    /// Returns `false` if the last written request did not end with `Sync`.
    pub async fn is_synced(&self) -> bool {
        self.writer.lock().await.synced
    }

    /// Returns `true` once the pipeline failed or was closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.shared.dispatcher).is_closed()
    }

    /// Number of requests waiting for a response.
    pub fn pending(&self) -> usize {
        lock(&self.shared.dispatcher).len()
    }

    /// Latest value the server reported for a runtime parameter.
    pub fn parameter(&self, name: &str) -> Option<ByteStr> {
        lock(&self.shared.parameters).get(name).cloned()
    }

    /// Record runtime parameter reported before the pipeline started.
    pub fn set_parameter(&self, name: ByteStr, value: ByteStr) {
        lock(&self.shared.parameters).insert(name, value);
    }

    /// Drain received asynchronous notifications.
    ///
    /// At most [`NOTIFICATION_CAPACITY`][Pipeline::NOTIFICATION_CAPACITY]
    /// are kept between calls.
    pub fn take_notifications(&self) -> Vec<NotificationResponse> {
        lock(&self.shared.notifications).drain(..).collect()
    }

    /// Fail pending requests, send `Terminate` and shutdown the writer.
    pub async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        lock(&self.shared.dispatcher).fail(Exception::Closed);
        self.reader.abort();

        let Writer { io, buf, .. } = &mut *writer;
        buf.clear();
        buf.write_terminate();
        flush(io, buf).await?;
        io.shutdown().await?;
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("dispatcher", &*lock(&self.shared.dispatcher))
            .finish_non_exhaustive()
    }
}

async fn flush(io: &mut Box<dyn AsyncWrite + Send + Unpin>, buf: &mut BytesMut) -> io::Result<()> {
    io.write_all_buf(buf).await?;
    io.flush().await
}

async fn read_loop<R>(mut io: R, mut buf: BytesMut, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let exception = loop {
        let (msgtype, body) = match read_message(&mut io, &mut buf).await {
            Ok(ok) => ok,
            Err(err) => break Exception::from(err),
        };

        let message = match BackendMessage::decode(msgtype, body) {
            Ok(ok) => ok,
            Err(err) => break Exception::from(err),
        };

        verbose!("received {}", BackendMessage::message_name(msgtype));

        let event = match Event::from_backend(message) {
            Ok(event) => event,
            Err(BackendMessage::ParameterStatus(status)) => {
                lock(&shared.parameters).insert(status.name, status.value);
                continue;
            },
            Err(BackendMessage::NotificationResponse(notification)) => {
                let mut notifications = lock(&shared.notifications);
                if notifications.len() == Pipeline::NOTIFICATION_CAPACITY {
                    #[cfg(feature = "log")]
                    log::warn!("notification queue full, dropping the oldest");
                    notifications.pop_front();
                }
                notifications.push_back(notification);
                continue;
            },
            Err(message) => break Exception::from(message.unexpected("pipeline")),
        };

        #[cfg(feature = "log")]
        let notice = match &event {
            Event::Notice(notice) => Some(notice.clone()),
            _ => None,
        };
        let _name = event.name();

        if !lock(&shared.dispatcher).dispatch(event) {
            #[cfg(feature = "log")]
            unclaimed(notice, _name);
        }
    };

    #[cfg(feature = "log")]
    log::error!("{exception}");

    lock(&shared.dispatcher).fail(exception);
}

#[cfg(feature = "log")]
fn unclaimed(notice: Option<crate::notice::Notice>, name: &str) {
    match notice {
        Some(notice) => log::warn!("{notice}"),
        None => log::warn!("unhandled {name}"),
    }
}
