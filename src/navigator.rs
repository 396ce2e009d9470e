//! Navigation session
//!
//! Owns one of everything: the tracker, the policy engine and the
//! announcement scheduler (and through it the speech engine). Every entry
//! point takes the current time and runs to completion without blocking, so
//! a single owner can drive it from any event loop.

use std::time::{Duration, Instant};

use crate::announce::text::system;
use crate::announce::{AnnouncementRequest, AnnouncementScheduler, EnqueueOutcome, Priority};
use crate::config::{Config, GuidanceSettings, Verbosity};
use crate::detection::{DetectedObject, DetectionBatch, classify_batch};
use crate::policy::{PlannedAnnouncement, PolicyEngine};
use crate::speech::{SpeechEngine, SpeechEvent};
use crate::tracker::ObjectTracker;

/// What happened to a submitted detection batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Navigation is not running
    NotNavigating,
    /// Arrived too soon after the previous batch
    RateLimited,
    /// Folded into the session
    Processed {
        /// Objects that passed the confidence filter
        objects: usize,
        /// First sightings reported by the tracker
        new_objects: usize,
        /// Objects evicted after the grace window
        vanished: usize,
    },
}

/// A navigation session
pub struct Navigator<E> {
    scheduler: AnnouncementScheduler<E>,
    tracker: ObjectTracker,
    policy: PolicyEngine,
    snapshot: Vec<DetectedObject>,
    navigating: bool,
    hidden: bool,
    min_confidence: f64,
    min_tick_interval: Duration,
    last_tick_at: Option<Instant>,
}

impl<E: SpeechEngine> Navigator<E> {
    /// Create an idle session speaking through `engine`
    pub fn new(engine: E, config: &Config) -> Self {
        Self {
            scheduler: AnnouncementScheduler::new(engine, config.speech.voice.clone()),
            tracker: ObjectTracker::new(),
            policy: PolicyEngine::new(config.guidance),
            snapshot: Vec::new(),
            navigating: false,
            hidden: false,
            min_confidence: config.min_confidence,
            min_tick_interval: config.min_tick_interval,
            last_tick_at: None,
        }
    }

    /// Begin a fresh session
    pub fn start(&mut self, now: Instant) {
        self.tracker.clear();
        self.policy.reset_session();
        self.snapshot.clear();
        self.last_tick_at = None;
        self.navigating = true;

        tracing::info!(settings = ?self.policy.settings(), "navigation started");
        self.say(system::NAVIGATION_STARTED, Priority::Normal, now);
    }

    /// End the session, silencing everything pending
    pub fn stop(&mut self, now: Instant) {
        self.navigating = false;
        self.snapshot.clear();
        self.policy.cancel_timers();
        self.scheduler.reset();

        tracing::info!("navigation stopped");
        self.say(system::NAVIGATION_STOPPED, Priority::Normal, now);
    }

    /// Tear down without a spoken confirmation
    pub fn shutdown(&mut self) {
        self.navigating = false;
        self.policy.cancel_timers();
        self.scheduler.reset();
    }

    #[must_use]
    pub const fn is_navigating(&self) -> bool {
        self.navigating
    }

    /// Filter, classify and process one detector batch
    pub fn process_batch(&mut self, batch: &DetectionBatch, now: Instant) -> TickOutcome {
        if !self.navigating {
            return TickOutcome::NotNavigating;
        }
        if self
            .last_tick_at
            .is_some_and(|last| now.saturating_duration_since(last) < self.min_tick_interval)
        {
            tracing::trace!("batch arrived inside tick interval, skipping");
            return TickOutcome::RateLimited;
        }
        self.last_tick_at = Some(now);

        let objects = classify_batch(batch, self.min_confidence, now);
        self.process_objects(objects, now)
    }

    /// Process an already classified tick
    pub fn process_objects(&mut self, objects: Vec<DetectedObject>, now: Instant) -> TickOutcome {
        if !self.navigating {
            return TickOutcome::NotNavigating;
        }

        let update = self.tracker.update(&objects, now);
        let planned = self.policy.on_tick(&objects, &update, now);

        tracing::trace!(
            objects = objects.len(),
            new = update.newly_appeared.len(),
            vanished = update.vanished.len(),
            tracked = self.tracker.len(),
            "tick processed"
        );

        let outcome = TickOutcome::Processed {
            objects: objects.len(),
            new_objects: update.newly_appeared.len(),
            vanished: update.vanished.len(),
        };

        self.snapshot = objects;
        self.submit(planned, now);
        outcome
    }

    /// Describe the latest snapshot right away
    ///
    /// Returns `false` if navigation is not running.
    pub fn describe_now(&mut self, now: Instant) -> bool {
        if !self.navigating {
            return false;
        }
        tracing::debug!(objects = self.snapshot.len(), "manual scene description");
        let planned = self.policy.describe_now(&self.snapshot, now);
        self.submit(planned, now);
        true
    }

    /// The hosting context was hidden or shown again
    ///
    /// Hiding drops everything pending: speech, queued requests, any readout
    /// in progress and an armed scene description.
    pub fn set_hidden(&mut self, hidden: bool) {
        if hidden && !self.hidden {
            tracing::debug!("hidden, silencing speech");
            self.policy.cancel_timers();
            self.scheduler.reset();
        }
        self.hidden = hidden;
    }

    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Flip the mute switch; returns the new state
    pub fn toggle_speech(&mut self, now: Instant) -> bool {
        let enabled = !self.policy.settings().speech_enabled;
        self.policy.set_speech_enabled(enabled);
        let confirmation = if enabled {
            system::SPEECH_ENABLED
        } else {
            system::SPEECH_DISABLED
        };
        self.say(confirmation, Priority::Normal, now);
        enabled
    }

    /// Switch between announce-all and closest-only; returns the new mode
    pub fn toggle_announce_all(&mut self, now: Instant) -> bool {
        let announce_all = !self.policy.settings().announce_all;
        self.policy.set_announce_all(announce_all);
        let confirmation = if announce_all {
            system::ANNOUNCE_ALL_MODE
        } else {
            system::CLOSEST_ONLY_MODE
        };
        self.say(confirmation, Priority::Normal, now);
        announce_all
    }

    /// Advance to the next verbosity level
    pub fn cycle_verbosity(&mut self, now: Instant) -> Verbosity {
        let next = self.policy.settings().verbosity.next();
        self.set_verbosity(next, now);
        next
    }

    /// Set the verbosity level and confirm it aloud
    pub fn set_verbosity(&mut self, verbosity: Verbosity, now: Instant) {
        self.policy.set_verbosity(verbosity);
        self.say(&system::verbosity_set(verbosity), Priority::Normal, now);
    }

    #[must_use]
    pub const fn settings(&self) -> GuidanceSettings {
        self.policy.settings()
    }

    /// Speak arbitrary text through the scheduler
    pub fn say(&mut self, text: &str, priority: Priority, now: Instant) -> EnqueueOutcome {
        self.announce(AnnouncementRequest::new(text, priority), now)
    }

    /// Submit a prepared request (with hooks) to the scheduler
    pub fn announce(&mut self, request: AnnouncementRequest, now: Instant) -> EnqueueOutcome {
        self.scheduler.enqueue(request, now)
    }

    /// Release due readout entries and drain the queue
    pub fn poll(&mut self, now: Instant) {
        let planned = self.policy.poll(now);
        self.submit(planned, now);
        self.scheduler.drain(now);
    }

    /// Reset speech that has been running too long; returns `true` if reset
    pub fn check_watchdog(&mut self, now: Instant) -> bool {
        let reset = self.scheduler.check_watchdog(now);
        if reset {
            self.scheduler.drain(now);
        }
        reset
    }

    /// Feed a progress report from the speech engine
    pub fn on_speech_event(&mut self, event: SpeechEvent, now: Instant) {
        self.scheduler.on_speech_event(event, now);
        self.scheduler.drain(now);
    }

    /// Earliest instant [`poll`](Self::poll) should run
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.policy.next_deadline(), self.scheduler.next_dispatch_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Nothing speaking, queued or waiting for a readout slot
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.scheduler.is_quiet() && self.policy.pending_announcements() == 0
    }

    /// Latest classified batch
    #[must_use]
    pub fn snapshot(&self) -> &[DetectedObject] {
        &self.snapshot
    }

    #[must_use]
    pub const fn tracker(&self) -> &ObjectTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    #[must_use]
    pub const fn scheduler(&self) -> &AnnouncementScheduler<E> {
        &self.scheduler
    }

    fn submit(&mut self, planned: Vec<PlannedAnnouncement>, now: Instant) {
        for PlannedAnnouncement {
            request,
            identity_key,
        } in planned
        {
            let outcome = self.scheduler.enqueue(request, now);
            if !outcome.is_accepted() {
                continue;
            }
            if let Some(key) = identity_key {
                self.tracker.record_announcement(&key);
            }
        }
    }
}
