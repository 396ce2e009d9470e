//! Announcement scheduler
//!
//! Single owner of the speech engine. Holds a priority-aware queue and makes
//! sure at most one utterance is in flight.
//!
//! ```text
//!            enqueue (idle)          Finished / Failed
//!   ┌──────┐ ───────────────▶ ┌──────────┐ ──────────────▶ ┌──────┐
//!   │ Idle │                  │ Speaking │                 │ Idle │ (+150 ms pause)
//!   └──────┘ ◀─────────────── └──────────┘                 └──────┘
//!             watchdog / reset
//! ```
//!
//! Enqueue rules:
//!
//! - Same cleaned text as the last dispatched utterance within 2 s: dropped
//! - `High`: cancel current speech, keep only other high entries, go first
//! - `Medium`: after the leading run of high entries
//! - `Normal`: at the tail
//! - `Low`: at the tail only while at most two entries are waiting
//!
//! Time is always passed in; the scheduler never reads the clock.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::text::clean_text;
use super::{AnnouncementRequest, Priority};
use crate::speech::{SpeechEngine, SpeechEvent, SpeechEventKind, Utterance, VoiceOptions};

/// Periodic queue drain interval
pub const DRAIN_INTERVAL: Duration = Duration::from_millis(250);

/// Gap between one utterance ending and the next starting
pub const INTER_UTTERANCE_PAUSE: Duration = Duration::from_millis(150);

/// Identical text inside this window is suppressed
pub const DEDUP_WINDOW: Duration = Duration::from_millis(2000);

/// How often the watchdog looks at the speaking state
pub const WATCHDOG_INTERVAL: Duration = Duration::from_millis(5000);

/// Speaking longer than this is treated as a stuck engine
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Low-priority entries are only accepted while the queue is this short
pub const LOW_PRIORITY_QUEUE_LIMIT: usize = 2;

/// Reasons passed to `on_error` hooks when speech is cut short
pub mod reason {
    pub const INTERRUPTED: &str = "interrupted";
    pub const CANCELLED: &str = "cancelled";
    pub const WATCHDOG: &str = "watchdog";
}

/// Whether an utterance is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Speaking,
}

/// What [`AnnouncementScheduler::enqueue`] did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Handed to the engine right away
    Dispatched,
    /// Waiting in the queue
    Queued,
    /// Same text was spoken less than 2 s ago
    Duplicate,
    /// Low priority and the queue was busy
    Dropped,
    /// Nothing left after cleaning
    Empty,
}

impl EnqueueOutcome {
    /// The request will (or did) reach the engine
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Dispatched | Self::Queued)
    }
}

#[derive(Debug)]
struct ActiveUtterance {
    id: u64,
    request: AnnouncementRequest,
    dispatched_at: Instant,
}

/// Priority queue plus single-utterance dispatcher
pub struct AnnouncementScheduler<E> {
    engine: E,
    voice: VoiceOptions,
    queue: VecDeque<AnnouncementRequest>,
    active: Option<ActiveUtterance>,
    last_spoken: Option<(String, Instant)>,
    next_dispatch_at: Option<Instant>,
    next_id: u64,
}

impl<E: SpeechEngine> AnnouncementScheduler<E> {
    pub const fn new(engine: E, voice: VoiceOptions) -> Self {
        Self {
            engine,
            voice,
            queue: VecDeque::new(),
            active: None,
            last_spoken: None,
            next_dispatch_at: None,
            next_id: 1,
        }
    }

    /// Submit a request.
    ///
    /// Never blocks. A high-priority request is handed to the engine before
    /// this returns; anything else is dispatched immediately when idle.
    pub fn enqueue(&mut self, mut request: AnnouncementRequest, now: Instant) -> EnqueueOutcome {
        let text = clean_text(&request.text);
        if text.is_empty() {
            return EnqueueOutcome::Empty;
        }
        request.text = text;

        if self.is_duplicate(&request.text, now) {
            tracing::debug!(text = %request.text, "suppressing duplicate announcement");
            return EnqueueOutcome::Duplicate;
        }

        let index = match request.priority {
            Priority::High => {
                self.interrupt(reason::INTERRUPTED);
                self.queue.retain(|r| r.priority == Priority::High);
                self.queue.push_front(request);
                self.dispatch(now);
                return EnqueueOutcome::Dispatched;
            }
            Priority::Medium => {
                let index = self
                    .queue
                    .iter()
                    .position(|r| r.priority != Priority::High)
                    .unwrap_or(self.queue.len());
                self.queue.insert(index, request);
                index
            }
            Priority::Normal => {
                self.queue.push_back(request);
                self.queue.len() - 1
            }
            Priority::Low => {
                if self.queue.len() > LOW_PRIORITY_QUEUE_LIMIT {
                    tracing::debug!(
                        text = %request.text,
                        queued = self.queue.len(),
                        "dropping low priority announcement"
                    );
                    return EnqueueOutcome::Dropped;
                }
                self.queue.push_back(request);
                self.queue.len() - 1
            }
        };

        if self.active.is_none() && index == 0 {
            self.dispatch(now);
            EnqueueOutcome::Dispatched
        } else {
            EnqueueOutcome::Queued
        }
    }

    /// Periodic drain: dispatch the next entry if idle and the pause is over
    pub fn drain(&mut self, now: Instant) {
        if self.active.is_some() {
            return;
        }
        if self.next_dispatch_at.is_some_and(|at| now < at) {
            return;
        }
        self.dispatch(now);
    }

    /// Feed a progress report from the engine.
    ///
    /// Events for anything but the in-flight utterance are ignored.
    pub fn on_speech_event(&mut self, event: SpeechEvent, now: Instant) {
        let Some(active) = self.active.as_mut() else {
            tracing::trace!(id = event.utterance_id, "speech event while idle");
            return;
        };
        if active.id != event.utterance_id {
            tracing::trace!(id = event.utterance_id, current = active.id, "stale speech event");
            return;
        }

        match event.kind {
            SpeechEventKind::Started => active.request.hooks.started(),
            SpeechEventKind::Finished => {
                if let Some(mut done) = self.active.take() {
                    done.request.hooks.ended();
                }
                self.after_utterance(now);
            }
            SpeechEventKind::Failed(reason) => {
                tracing::warn!(text = %active.request.text, reason = %reason, "speech failed");
                if let Some(mut failed) = self.active.take() {
                    failed.request.hooks.failed(&reason);
                }
                self.after_utterance(now);
            }
        }
    }

    /// Force the scheduler idle if the engine has been speaking too long.
    ///
    /// Returns `true` if a stuck utterance was reset.
    pub fn check_watchdog(&mut self, now: Instant) -> bool {
        let stuck = self
            .active
            .as_ref()
            .is_some_and(|a| now.saturating_duration_since(a.dispatched_at) > WATCHDOG_TIMEOUT);
        if !stuck {
            return false;
        }

        tracing::warn!("speech engine appears stuck, resetting");
        self.interrupt(reason::WATCHDOG);
        true
    }

    /// Cancel current speech and discard everything queued
    pub fn reset(&mut self) {
        let dropped = self.queue.len();
        self.interrupt(reason::CANCELLED);
        for mut request in self.queue.drain(..) {
            request.hooks.failed(reason::CANCELLED);
        }
        self.next_dispatch_at = None;
        tracing::debug!(dropped, "announcement queue reset");
    }

    /// Replace the base voice used for future utterances
    pub fn set_voice(&mut self, voice: VoiceOptions) {
        self.voice = voice;
    }

    #[must_use]
    pub const fn phase(&self) -> SchedulerPhase {
        if self.active.is_some() {
            SchedulerPhase::Speaking
        } else {
            SchedulerPhase::Idle
        }
    }

    #[must_use]
    pub const fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    /// Idle with nothing waiting
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Waiting entries, front first
    pub fn queued(&self) -> impl Iterator<Item = (&str, Priority)> {
        self.queue.iter().map(|r| (r.text.as_str(), r.priority))
    }

    /// Text of the in-flight utterance
    #[must_use]
    pub fn current_text(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.request.text.as_str())
    }

    /// Id of the in-flight utterance
    #[must_use]
    pub fn current_id(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Earliest time a paused queue may dispatch again
    #[must_use]
    pub const fn next_dispatch_at(&self) -> Option<Instant> {
        self.next_dispatch_at
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    fn is_duplicate(&self, text: &str, now: Instant) -> bool {
        self.last_spoken.as_ref().is_some_and(|(last, at)| {
            last == text && now.saturating_duration_since(*at) < DEDUP_WINDOW
        })
    }

    /// Cancel the in-flight utterance, if any, and fire its error hook
    fn interrupt(&mut self, why: &str) {
        if let Some(mut active) = self.active.take() {
            tracing::debug!(text = %active.request.text, reason = why, "cancelling speech");
            self.engine.cancel();
            active.request.hooks.failed(why);
        }
    }

    fn after_utterance(&mut self, now: Instant) {
        self.next_dispatch_at = if self.queue.is_empty() {
            None
        } else {
            Some(now + INTER_UTTERANCE_PAUSE)
        };
    }

    fn dispatch(&mut self, now: Instant) {
        if self.active.is_some() {
            return;
        }
        let Some(request) = self.queue.pop_front() else {
            return;
        };

        let id = self.next_id;
        self.next_id += 1;

        let options = if request.priority == Priority::High {
            self.voice.urgent()
        } else {
            self.voice.clone()
        };

        tracing::debug!(id, priority = %request.priority, text = %request.text, "speaking");

        self.last_spoken = Some((request.text.clone(), now));
        self.next_dispatch_at = None;
        self.engine.speak(Utterance {
            id,
            text: request.text.clone(),
            options,
        });
        self.active = Some(ActiveUtterance {
            id,
            request,
            dispatched_at: now,
        });
    }
}
