use std::collections::VecDeque;

use super::{Action, Event, Exception, Handler};
use crate::common::{span, verbose};

/// Pending handler queue.
///
/// Handlers are pushed in the order their requests are written, and events
/// are applied to the queue head following the returned [`Action`]. The
/// dispatcher never performs io.
pub struct Dispatcher {
    queue: VecDeque<Box<dyn Handler>>,
    closed: Option<Exception>,
    /// Error passed on by the last handler while no follower was queued yet.
    carry: Option<Event>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Self {
            queue: VecDeque::new(),
            closed: None,
            carry: None,
        }
    }

    /// Number of pending handlers.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns `true` after [`fail`][Dispatcher::fail].
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    /// Append handler at the end of the queue.
    ///
    /// An error passed on by a completed handler before this one was queued
    /// is delivered to it immediately.
    ///
    /// # Errors
    ///
    /// Returns the failure exception if the dispatcher is closed.
    pub fn push(&mut self, handler: Box<dyn Handler>) -> Result<(), Exception> {
        if let Some(exception) = &self.closed {
            return Err(exception.clone());
        }

        self.queue.push_back(handler);

        if let Some(event) = self.carry.take() {
            verbose!("redeliver passed {}", event.name());
            self.dispatch(event);
        }

        Ok(())
    }

    /// Apply event to the queue.
    ///
    /// Returns `false` if no handler was interested in the event.
    pub fn dispatch(&mut self, event: Event) -> bool {
        let mut consumed = false;
        let mut idx = 0;

        while let Some(handler) = self.queue.get_mut(idx) {
            let Some(action) = event.deliver(&mut **handler) else {
                break;
            };
            consumed = true;
            verbose!(handler = idx, ?action, "dispatch {}", event.name());

            match action {
                Action::Complete => {
                    self.queue.remove(idx);
                    break;
                },
                Action::CompletePassing => {
                    self.queue.remove(idx);
                    // follower not submitted yet
                    if idx == self.queue.len() && matches!(event, Event::Error(_)) {
                        self.carry = Some(event);
                        return consumed;
                    }
                },
                Action::Resume => break,
                Action::ResumePassing => idx += 1,
            }
        }

        if let Event::ReadyForQuery(_) = event {
            self.carry = None;
        }

        consumed
    }

    /// Deliver exception to every queued handler in order, then close.
    pub fn fail(&mut self, exception: Exception) {
        if self.closed.is_some() {
            return;
        }

        span!("fail", %exception, pending = self.queue.len());
        for mut handler in self.queue.drain(..) {
            handler.exception(&exception);
        }

        self.carry = None;
        self.closed = Some(exception);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.queue.len())
            .field("closed", &self.closed)
            .field("carry", &self.carry)
            .finish()
    }
}
