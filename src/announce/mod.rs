//! Announcements
//!
//! An [`AnnouncementRequest`] is a piece of guidance text with a
//! [`Priority`] and optional lifecycle hooks. The policy layer builds them
//! (see [`text`] for the phrases) and the [`AnnouncementScheduler`] decides
//! when, and whether, each one reaches the speech engine.

pub mod scheduler;
pub mod text;

use std::fmt;

pub use scheduler::{AnnouncementScheduler, EnqueueOutcome, SchedulerPhase};

/// Below this distance an object is urgent (meters)
pub const URGENT_DISTANCE: f64 = 1.5;

/// Below this distance an object is worth a medium-priority mention (meters)
pub const NEAR_DISTANCE: f64 = 3.0;

/// Announcement importance, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Preempts current speech and discards everything but other highs
    High,
    /// Jumps ahead of normal and low entries
    Medium,
    /// Plain FIFO
    Normal,
    /// Dropped when the queue is already busy
    Low,
}

impl Priority {
    /// Priority for an object at `distance` meters.
    #[must_use]
    pub fn for_distance(distance: f64) -> Self {
        if distance < URGENT_DISTANCE {
            Self::High
        } else if distance < NEAR_DISTANCE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback run when an utterance starts or ends
pub type Hook = Box<dyn FnOnce() + Send>;

/// Callback run with a reason when an utterance fails or is interrupted
pub type ErrorHook = Box<dyn FnOnce(&str) + Send>;

/// Optional lifecycle callbacks; each fires at most once
#[derive(Default)]
pub struct AnnouncementHooks {
    pub on_start: Option<Hook>,
    pub on_end: Option<Hook>,
    pub on_error: Option<ErrorHook>,
}

impl fmt::Debug for AnnouncementHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnouncementHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl AnnouncementHooks {
    pub(crate) fn started(&mut self) {
        if let Some(hook) = self.on_start.take() {
            hook();
        }
    }

    pub(crate) fn ended(&mut self) {
        if let Some(hook) = self.on_end.take() {
            hook();
        }
    }

    pub(crate) fn failed(&mut self, reason: &str) {
        if let Some(hook) = self.on_error.take() {
            hook(reason);
        }
    }
}

/// A request to say something
#[derive(Debug)]
pub struct AnnouncementRequest {
    pub text: String,
    pub priority: Priority,
    pub hooks: AnnouncementHooks,
}

impl AnnouncementRequest {
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        Self {
            text: text.into(),
            priority,
            hooks: AnnouncementHooks::default(),
        }
    }

    #[must_use]
    pub fn on_start(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_start = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_end(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.on_end = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_error(mut self, hook: impl FnOnce(&str) + Send + 'static) -> Self {
        self.hooks.on_error = Some(Box::new(hook));
        self
    }
}
