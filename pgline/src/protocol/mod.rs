//! Request pipelining and response dispatch.
//!
//! Every operation is a [`Request`]: it writes its messages onto a
//! [`ProtocolChannel`] and creates a [`Handler`] which receives the matching
//! responses. Requests are written without waiting for the previous response,
//! handlers wait in a FIFO [`Dispatcher`] queue.
//!
//! The server never says which request a message belongs to. Attribution is
//! restored by queue order plus the [`Action`] each handler returns:
//!
//! | action             | queue            | event                        |
//! |--------------------|------------------|------------------------------|
//! | `Complete`         | handler removed  | stop                         |
//! | `CompletePassing`  | handler removed  | redeliver to the new head    |
//! | `Resume`           | unchanged        | stop                         |
//! | `ResumePassing`    | unchanged        | deliver to the next handler  |
//!
//! A fatal channel failure is broadcast to every queued handler as an
//! [`Exception`], after which the queue is closed.
mod action;
mod handler;
mod dispatch;
mod channel;
mod request;
mod pipeline;

pub use action::Action;
pub use handler::{Event, Exception, Handler};
pub use dispatch::Dispatcher;
pub use channel::ProtocolChannel;
pub use request::{
    CloseRequest, ExecuteRequest, LazyQueryRequest, Pending, PrepareRequest, QueryRequest, Request,
    Responder, SyncRequest, responder,
};
pub use pipeline::Pipeline;
