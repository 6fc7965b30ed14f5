//! Dual-lane thumbnail request queue
//!
//! Holds pending requests in a High lane (visible clips) and a Low lane
//! (background work), plus a pending map keyed by clip identity that
//! deduplicates requests. Lanes are append-only and may hold stale entries;
//! they are skipped at dequeue time by checking whether an entry is still the
//! canonical pending request for its identity.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use super::request::{CompletionCallback, Job, Priority, RequestId, RequestState, ThumbnailRequest};
use crate::clip::{Clip, ClipIdentity};

/// Lane entry referring to a pending request by id.
#[derive(Debug, Clone)]
struct LaneEntry {
    id: RequestId,
    identity: ClipIdentity,
}

/// Outcome of popping one lane entry.
enum Dequeued {
    /// Still the canonical, unprocessed request for its identity
    Valid(LaneEntry),
    /// Already processed or superseded; dropped
    Stale,
    Empty,
}

#[derive(Default)]
struct QueueState {
    high: VecDeque<LaneEntry>,
    low: VecDeque<LaneEntry>,
    pending: HashMap<ClipIdentity, ThumbnailRequest>,
    next_id: RequestId,
    /// Unprocessed requests sitting in the Low lane that were escalated to High
    escalated_low: usize,
}

impl QueueState {
    fn lane_mut(&mut self, lane: Priority) -> &mut VecDeque<LaneEntry> {
        match lane {
            Priority::High => &mut self.high,
            Priority::Low => &mut self.low,
        }
    }

    fn is_canonical(&self, entry: &LaneEntry) -> bool {
        self.pending
            .get(&entry.identity)
            .is_some_and(|r| r.id == entry.id && !r.processed)
    }

    fn pop(&mut self, lane: Priority) -> Dequeued {
        let Some(entry) = self.lane_mut(lane).pop_front() else {
            return Dequeued::Empty;
        };
        if self.is_canonical(&entry) {
            Dequeued::Valid(entry)
        } else {
            Dequeued::Stale
        }
    }

    fn is_escalated(&self, entry: &LaneEntry) -> bool {
        self.pending
            .get(&entry.identity)
            .is_some_and(|r| r.priority == Priority::High)
    }

    fn escalate(&mut self, identity: &ClipIdentity) -> bool {
        let Some(request) = self.pending.get_mut(identity) else {
            return false;
        };
        if !request.escalate() {
            return false;
        }
        if request.lane == Priority::Low {
            self.escalated_low += 1;
        }
        true
    }

    fn take_job(&mut self, entry: LaneEntry) -> Option<Job> {
        let request = self.pending.get_mut(&entry.identity)?;
        request.processed = true;
        if request.lane == Priority::Low && request.priority == Priority::High {
            self.escalated_low = self.escalated_low.saturating_sub(1);
        }
        Some(Job {
            id: request.id,
            identity: entry.identity,
            clip: Arc::clone(&request.clip),
        })
    }

    fn next_high(&mut self) -> Option<LaneEntry> {
        loop {
            match self.pop(Priority::High) {
                Dequeued::Valid(entry) => return Some(entry),
                Dequeued::Stale => continue,
                Dequeued::Empty => return None,
            }
        }
    }

    /// Scan the Low lane, preferring an entry escalated while it waited and
    /// falling back to FIFO. Skipped valid entries go back to the front of the
    /// lane in their original order.
    fn next_low(&mut self) -> Option<LaneEntry> {
        let mut buffered = Vec::new();
        let mut selected = None;

        loop {
            match self.pop(Priority::Low) {
                Dequeued::Valid(entry) => {
                    // Nothing escalated: the first valid entry is the FIFO pick
                    if self.escalated_low == 0 || self.is_escalated(&entry) {
                        selected = Some(entry);
                        break;
                    }
                    buffered.push(entry);
                }
                Dequeued::Stale => continue,
                Dequeued::Empty => break,
            }
        }

        if selected.is_none() && !buffered.is_empty() {
            selected = Some(buffered.remove(0));
        }
        for entry in buffered.into_iter().rev() {
            self.low.push_front(entry);
        }

        selected
    }
}

/// Thread-safe dual-lane request queue with per-clip deduplication.
#[derive(Default)]
pub struct ThumbnailQueue {
    state: Mutex<QueueState>,
}

impl ThumbnailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a request, or merge it into the pending one for the same clip.
    ///
    /// A duplicate escalates the pending request if `priority` is higher and
    /// chains `on_complete` after the callbacks already registered. Returns
    /// true if a new request was created.
    pub fn request(
        &self,
        clip: Arc<Clip>,
        priority: Priority,
        on_complete: Option<CompletionCallback>,
    ) -> bool {
        let mut state = self.state.lock();
        let identity = clip.identity().clone();

        if state.pending.contains_key(&identity) {
            if priority == Priority::High && state.escalate(&identity) {
                debug!("Escalated thumbnail request for {}", clip.file_name);
            }
            if let (Some(callback), Some(request)) = (on_complete, state.pending.get_mut(&identity)) {
                request.callbacks.push(callback);
            }
            return false;
        }

        let id = state.next_id;
        state.next_id += 1;

        let mut request = ThumbnailRequest::new(id, clip, priority);
        request.callbacks.extend(on_complete);
        state.pending.insert(identity.clone(), request);
        state.lane_mut(priority).push_back(LaneEntry { id, identity });
        true
    }

    /// Escalate a pending request to High. No-op if nothing is pending.
    pub fn prioritize(&self, identity: &ClipIdentity) -> bool {
        self.state.lock().escalate(identity)
    }

    /// Select the next request to generate and mark it processing.
    ///
    /// High lane first, then an escalated Low entry, then Low in FIFO order.
    pub fn next_job(&self) -> Option<Job> {
        let mut state = self.state.lock();
        let entry = state.next_high().or_else(|| state.next_low())?;
        state.take_job(entry)
    }

    /// Fire the job's callbacks in registration order, then drop the request.
    ///
    /// Callbacks run outside the lock. Any callback chained while earlier
    /// ones were running is fired too before the request is removed, so no
    /// callback registered on a pending request is ever lost.
    pub fn complete(&self, job: &Job) {
        loop {
            let callbacks = {
                let mut state = self.state.lock();
                let Some(request) = state.pending.get_mut(&job.identity) else {
                    return;
                };
                if request.id != job.id {
                    return;
                }
                if request.callbacks.is_empty() {
                    state.pending.remove(&job.identity);
                    return;
                }
                std::mem::take(&mut request.callbacks)
            };

            for callback in callbacks {
                callback();
            }
        }
    }

    pub fn state_of(&self, identity: &ClipIdentity) -> Option<RequestState> {
        self.state.lock().pending.get(identity).map(ThumbnailRequest::state)
    }

    pub fn is_pending(&self, identity: &ClipIdentity) -> bool {
        self.state.lock().pending.contains_key(identity)
    }

    /// Requests not yet completed, including the one being processed.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }

    /// Raw lane lengths, stale entries included.
    pub fn lane_lens(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.high.len(), state.low.len())
    }
}
