//! Object identity tracking
//!
//! Folds per-tick detection lists into a keyed history so the rest of the
//! pipeline can tell new objects from ones it has already described, and
//! notice when something close goes away.
//!
//! Identity is *not* geometric: an object's key is a pure function of its
//! current classified snapshot (`label`, `position`, `floor(distance)`). The
//! same physical chair gets a fresh identity when it crosses an integer-meter
//! boundary or moves between position buckets. Callers rely on this exact
//! bucketing; do not replace it with overlap matching.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::detection::{DetectedObject, Position};

/// Only first sightings nearer than this are reported as new (meters)
pub const INTERESTING_DISTANCE: f64 = 8.0;

/// Absent entries are retained this long before being treated as vanished
pub const VANISH_GRACE: Duration = Duration::from_millis(2000);

/// Absent entries older than this are dropped without vanish handling
pub const STALE_CEILING: Duration = Duration::from_millis(30_000);

/// A vanished object is worth mentioning only if it was this close (meters)
pub const NOTABLE_VANISH_DISTANCE: f64 = 3.0;

/// ...and had been in view at least this long
pub const NOTABLE_VANISH_PERSISTENCE: Duration = Duration::from_millis(3000);

/// Derive the identity key for a classified detection.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn identity_key(label: &str, position: Position, distance: f64) -> String {
    format!("{label}-{position}-{}", distance.floor() as i64)
}

/// History entry for one identity key
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub first_seen: Instant,
    pub last_seen: Instant,
    pub label: String,
    pub position: Position,
    pub distance: f64,
    pub announce_count: u32,
}

/// An entry evicted because it left the scene
#[derive(Debug, Clone, PartialEq)]
pub struct VanishedObject {
    pub identity_key: String,
    pub label: String,
    pub position: Position,
    pub distance: f64,
    pub first_seen: Instant,
    pub last_seen: Instant,
}

impl VanishedObject {
    /// Close enough and seen long enough that its disappearance matters
    #[must_use]
    pub fn is_notable(&self) -> bool {
        self.distance < NOTABLE_VANISH_DISTANCE
            && self.last_seen.saturating_duration_since(self.first_seen)
                >= NOTABLE_VANISH_PERSISTENCE
    }
}

/// Outcome of folding one tick into the history
#[derive(Debug, Default)]
pub struct TrackerUpdate {
    /// First sightings within [`INTERESTING_DISTANCE`], in batch order
    pub newly_appeared: Vec<DetectedObject>,
    /// Entries evicted past the grace window this tick, oldest first
    pub vanished: Vec<VanishedObject>,
}

/// Keyed history of recently seen objects
#[derive(Debug, Default)]
pub struct ObjectTracker {
    history: HashMap<String, TrackedObject>,
}

impl ObjectTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a classified batch into the history.
    ///
    /// An empty batch adds nothing but still ages out absent entries, so
    /// objects vanish from an empty scene.
    pub fn update(&mut self, batch: &[DetectedObject], now: Instant) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();

        for object in batch {
            if let Some(existing) = self.history.get_mut(&object.identity_key) {
                existing.last_seen = now;
                existing.position = object.position;
                existing.distance = object.distance;
                continue;
            }

            self.history.insert(
                object.identity_key.clone(),
                TrackedObject {
                    first_seen: now,
                    last_seen: now,
                    label: object.label.clone(),
                    position: object.position,
                    distance: object.distance,
                    announce_count: 0,
                },
            );

            tracing::debug!(
                key = %object.identity_key,
                distance = object.distance,
                "new identity"
            );

            if object.distance < INTERESTING_DISTANCE {
                update.newly_appeared.push(object.clone());
            }
        }

        update.vanished = self.sweep(batch, now);
        update
    }

    /// Evict entries absent from `batch` past the grace window or the ceiling.
    fn sweep(&mut self, batch: &[DetectedObject], now: Instant) -> Vec<VanishedObject> {
        let present: HashSet<&str> = batch.iter().map(|o| o.identity_key.as_str()).collect();
        let mut vanished = Vec::new();

        self.history.retain(|key, entry| {
            if present.contains(key.as_str()) {
                return true;
            }

            let absent_for = now.saturating_duration_since(entry.last_seen);
            if absent_for > STALE_CEILING {
                tracing::trace!(key = %key, "evicting stale entry");
                return false;
            }
            if absent_for > VANISH_GRACE {
                tracing::debug!(key = %key, absent_ms = absent_for.as_millis(), "object vanished");
                vanished.push(VanishedObject {
                    identity_key: key.clone(),
                    label: entry.label.clone(),
                    position: entry.position,
                    distance: entry.distance,
                    first_seen: entry.first_seen,
                    last_seen: entry.last_seen,
                });
                return false;
            }

            true
        });

        vanished.sort_by_key(|v| v.first_seen);
        vanished
    }

    /// Count one announcement against a tracked identity
    pub fn record_announcement(&mut self, key: &str) {
        if let Some(entry) = self.history.get_mut(key) {
            entry.announce_count += 1;
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TrackedObject> {
        self.history.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TrackedObject)> {
        self.history.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forget everything (new session)
    pub fn clear(&mut self) {
        self.history.clear();
    }
}
