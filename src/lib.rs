//! Pathsense - spoken scene guidance from object detections
//!
//! This library turns a noisy per-frame stream of object detections into a
//! calm, priority-ordered sequence of spoken announcements for a user who
//! cannot see a screen:
//! - Geometry classification (bearing and distance from a bounding box)
//! - Object identity tracking (new / continuing / vanished)
//! - Announcement policy (describe the scene, or only the closest object)
//! - Announcement scheduling (priorities, interruption, dedup, watchdog)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Detector (external)                 │
//! │         labeled boxes + confidence per frame        │
//! └────────────────────┬────────────────────────────────┘
//!                      │ DetectionBatch
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Navigator                       │
//! │  Classifier → Tracker → Policy → Scheduler          │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Utterance / SpeechEvent
//! ┌────────────────────▼────────────────────────────────┐
//! │              Speech engine (external)               │
//! │        console  │  espeak-ng / say / spd-say        │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod announce;
pub mod config;
pub mod detection;
pub mod error;
pub mod navigator;
pub mod policy;
pub mod runtime;
pub mod speech;
pub mod tracker;

pub use announce::{
    AnnouncementHooks, AnnouncementRequest, AnnouncementScheduler, EnqueueOutcome, Priority,
    SchedulerPhase,
};
pub use config::{Config, GuidanceSettings, SpeechEngineKind, Verbosity};
pub use detection::{
    BoundingBox, DetectedObject, DetectionBatch, FrameSize, JsonLinesSource, Position,
    RawDetection, classify_batch,
};
pub use error::{Error, Result};
pub use navigator::{Navigator, TickOutcome};
pub use policy::{PlannedAnnouncement, PolicyEngine};
pub use runtime::{NavigatorHandle, NavigatorStatus};
pub use speech::{
    CommandSpeech, ConsoleSpeech, SpeechEngine, SpeechEvent, SpeechEventKind, Utterance,
    VoiceOptions,
};
pub use tracker::{ObjectTracker, TrackedObject, TrackerUpdate, VanishedObject};
