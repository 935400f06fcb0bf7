/// Queue transition requested by a [`Handler`][super::Handler] after it
/// received an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The handler is done, remove it from the queue.
    Complete,
    /// The handler is done, and the same event is delivered to the handler
    /// after it.
    ///
    /// Used when an error aborts the pipelined request that follows.
    CompletePassing,
    /// The handler expects more events.
    Resume,
    /// The handler expects more events, and the same event is also delivered
    /// to the next handler in queue.
    ResumePassing,
}

impl Action {
    /// Returns `true` if the handler should be removed from the queue.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete | Self::CompletePassing)
    }

    /// Returns `true` if the event continues to the next handler.
    pub fn is_passing(&self) -> bool {
        matches!(self, Self::CompletePassing | Self::ResumePassing)
    }
}
