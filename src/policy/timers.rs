//! Deadline bookkeeping for the policy engine
//!
//! Nothing here sleeps. Timers are plain deadlines that the owner polls with
//! the current time; the runtime sleeps until [`Debounce::deadline`] or
//! [`DelayedQueue::next_deadline`] and then polls.

use std::time::{Duration, Instant};

/// A resettable single-shot timer carrying a payload
#[derive(Debug)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debounce<T> {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Cancel any pending fire and re-arm for `now + delay` with `payload`
    pub fn arm(&mut self, now: Instant, payload: T) {
        self.pending = Some((now + self.delay, payload));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    /// Take the payload if the deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        if self.deadline().is_some_and(|at| at <= now) {
            self.pending.take().map(|(_, payload)| payload)
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    due: Instant,
    seq: u64,
    item: T,
}

/// Items released at fixed future instants, in due order
///
/// Items sharing a due instant come out in insertion order.
#[derive(Debug)]
pub struct DelayedQueue<T> {
    slots: Vec<Slot<T>>,
    seq: u64,
}

impl<T> Default for DelayedQueue<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            seq: 0,
        }
    }
}

impl<T> DelayedQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, item: T) {
        self.slots.push(Slot {
            due,
            seq: self.seq,
            item,
        });
        self.seq += 1;
    }

    /// Remove and return every item due at or before `now`
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        if !self.slots.iter().any(|s| s.due <= now) {
            return Vec::new();
        }

        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.slots).into_iter().partition(|s| s.due <= now);
        self.slots = pending;

        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter().map(|s| s.item).collect()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().map(|s| s.due).min()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
