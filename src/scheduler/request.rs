use std::sync::Arc;

use crate::clip::{Clip, ClipIdentity};

pub type RequestId = u64;

/// Continuation fired after a generation attempt, success or failure.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Generation lane. Visible clips are `High`, background work is `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    High = 1,
}

impl Priority {
    pub fn from_high(high_priority: bool) -> Self {
        if high_priority {
            Priority::High
        } else {
            Priority::Low
        }
    }
}

/// Observable lifecycle of a request for one clip.
///
/// `Pending(Low) -> Pending(High) -> Processing` or
/// `Pending(Low) -> Processing`. Done requests are no longer tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending(Priority),
    Processing,
}

/// Canonical pending entry for one clip identity.
pub(crate) struct ThumbnailRequest {
    pub id: RequestId,
    pub clip: Arc<Clip>,
    pub priority: Priority,
    /// Lane the request was pushed onto; never changes
    pub lane: Priority,
    pub processed: bool,
    pub callbacks: Vec<CompletionCallback>,
}

impl ThumbnailRequest {
    pub fn new(id: RequestId, clip: Arc<Clip>, priority: Priority) -> Self {
        Self {
            id,
            clip,
            priority,
            lane: priority,
            processed: false,
            callbacks: Vec::new(),
        }
    }

    /// Raise to High while still waiting. Returns true if the priority changed.
    pub fn escalate(&mut self) -> bool {
        if self.processed || self.priority == Priority::High {
            return false;
        }
        self.priority = Priority::High;
        true
    }

    pub fn state(&self) -> RequestState {
        if self.processed {
            RequestState::Processing
        } else {
            RequestState::Pending(self.priority)
        }
    }
}

/// A request handed to the worker.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: RequestId,
    pub identity: ClipIdentity,
    pub clip: Arc<Clip>,
}
