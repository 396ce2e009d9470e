//! Announcement policy
//!
//! Turns tracker output into announcement requests. Two mutually exclusive
//! strategies, picked by [`GuidanceSettings::announce_all`]:
//!
//! - **Announce all**: new objects are read out as they appear (closest
//!   three, then a count of the rest). When a tick brings nothing new a 2 s
//!   debounce is re-armed; if it survives, the whole scene is described.
//! - **Closest only**: the nearest object within 5 m is repeated at an
//!   interval that tightens with proximity.
//!
//! A manual "describe now" always runs the full scene description.
//!
//! Delayed parts of a readout are held as deadlines in [`timers`] and
//! released by [`PolicyEngine::poll`].

pub mod timers;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::announce::{AnnouncementRequest, text};
use crate::config::{GuidanceSettings, Verbosity};
use crate::detection::DetectedObject;
use crate::tracker::TrackerUpdate;

use self::timers::{Debounce, DelayedQueue};

/// Quiet period before a full scene description
pub const SCENE_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Gap between consecutive objects in a readout
pub const READOUT_SPACING: Duration = Duration::from_millis(1500);

/// Gap between the scene banner and the first object
pub const SCENE_LEAD_IN: Duration = Duration::from_millis(1200);

/// New objects named individually per tick
pub const NEW_OBJECT_LIMIT: usize = 3;

/// Closest-only mode ignores objects at or beyond this distance (meters)
pub const CLOSEST_RANGE: f64 = 5.0;

/// Last-announcement times older than this are forgotten
pub const ANNOUNCEMENT_MEMORY: Duration = Duration::from_millis(30_000);

/// A request plus the identity it describes, if any
#[derive(Debug)]
pub struct PlannedAnnouncement {
    pub request: AnnouncementRequest,
    /// Tracker key credited when the request is accepted
    pub identity_key: Option<String>,
}

impl PlannedAnnouncement {
    fn about(request: AnnouncementRequest, key: &str) -> Self {
        Self {
            request,
            identity_key: Some(key.to_string()),
        }
    }
}

impl From<AnnouncementRequest> for PlannedAnnouncement {
    fn from(request: AnnouncementRequest) -> Self {
        Self {
            request,
            identity_key: None,
        }
    }
}

/// Minimum time between repeats of the closest object in closest-only mode.
///
/// `None` means the object is not announced at all.
#[must_use]
pub const fn closest_interval(distance: f64, verbosity: Verbosity) -> Option<Duration> {
    let high = matches!(verbosity, Verbosity::High);
    if distance < crate::announce::URGENT_DISTANCE {
        Some(Duration::from_millis(if high { 2000 } else { 3000 }))
    } else if distance < crate::announce::NEAR_DISTANCE {
        Some(Duration::from_millis(if high { 4000 } else { 6000 }))
    } else if matches!(verbosity, Verbosity::Low) {
        None
    } else {
        Some(Duration::from_millis(10_000))
    }
}

fn closest_first(objects: &[DetectedObject]) -> Vec<&DetectedObject> {
    let mut sorted: Vec<&DetectedObject> = objects.iter().collect();
    sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    sorted
}

/// Strategy selection, debounce and readout pacing
#[derive(Debug)]
pub struct PolicyEngine {
    settings: GuidanceSettings,
    scene_debounce: Debounce<Vec<DetectedObject>>,
    delayed: DelayedQueue<PlannedAnnouncement>,
    last_announced: HashMap<String, Instant>,
}

impl PolicyEngine {
    #[must_use]
    pub fn new(settings: GuidanceSettings) -> Self {
        Self {
            settings,
            scene_debounce: Debounce::new(SCENE_DEBOUNCE),
            delayed: DelayedQueue::new(),
            last_announced: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> GuidanceSettings {
        self.settings
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) {
        self.settings.speech_enabled = enabled;
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.settings.verbosity = verbosity;
    }

    /// Switch strategy; leaving announce-all drops a pending scene description
    pub fn set_announce_all(&mut self, announce_all: bool) {
        if !announce_all {
            self.scene_debounce.cancel();
        }
        self.settings.announce_all = announce_all;
    }

    /// React to one processed tick.
    ///
    /// `snapshot` is the full classified batch, `update` what the tracker
    /// made of it. Returns requests to enqueue now; later parts of a readout
    /// are held until [`poll`](Self::poll) releases them.
    pub fn on_tick(
        &mut self,
        snapshot: &[DetectedObject],
        update: &TrackerUpdate,
        now: Instant,
    ) -> Vec<PlannedAnnouncement> {
        self.last_announced
            .retain(|_, at| now.saturating_duration_since(*at) <= ANNOUNCEMENT_MEMORY);

        let mut out = Vec::new();

        if self.settings.speech_enabled && self.settings.verbosity != Verbosity::Low {
            for gone in update.vanished.iter().filter(|v| v.is_notable()) {
                out.push(text::vanished(&gone.label).into());
            }
        }

        if self.settings.announce_all {
            // Empty ticks count: the debounce then carries an empty scene
            if update.newly_appeared.is_empty() {
                self.scene_debounce.arm(now, snapshot.to_vec());
            } else {
                self.scene_debounce.cancel();
                out.extend(self.announce_new_objects(&update.newly_appeared, now));
            }
        } else {
            out.extend(self.announce_closest(snapshot, now));
        }

        out
    }

    /// Manual trigger: describe `snapshot` right away, whatever the mode
    pub fn describe_now(
        &mut self,
        snapshot: &[DetectedObject],
        now: Instant,
    ) -> Vec<PlannedAnnouncement> {
        if snapshot.is_empty() {
            return vec![text::empty_scene().into()];
        }
        self.describe_scene(snapshot, now)
    }

    /// Full scene description: banner now, objects paced after it
    #[allow(clippy::cast_possible_truncation)]
    pub fn describe_scene(
        &mut self,
        objects: &[DetectedObject],
        now: Instant,
    ) -> Vec<PlannedAnnouncement> {
        if !self.settings.speech_enabled || objects.is_empty() {
            return Vec::new();
        }

        let sorted = closest_first(objects);
        let count = self
            .settings
            .verbosity
            .scene_limit()
            .map_or(sorted.len(), |limit| limit.min(sorted.len()));

        tracing::debug!(total = sorted.len(), count, "describing scene");

        let out = vec![text::scene_banner(sorted.len()).into()];

        for (i, object) in sorted.iter().take(count).enumerate() {
            let due = now + SCENE_LEAD_IN + READOUT_SPACING * i as u32;
            self.last_announced.insert(object.identity_key.clone(), now);
            self.delayed.schedule(
                due,
                PlannedAnnouncement::about(
                    text::scene_entry(&object.label, object.position, object.distance),
                    &object.identity_key,
                ),
            );
        }

        if sorted.len() > count {
            let due = now + SCENE_LEAD_IN + READOUT_SPACING * count as u32;
            self.delayed
                .schedule(due, text::scene_overflow(sorted.len() - count).into());
        }

        out
    }

    #[allow(clippy::cast_possible_truncation)]
    fn announce_new_objects(
        &mut self,
        newly: &[DetectedObject],
        now: Instant,
    ) -> Vec<PlannedAnnouncement> {
        if !self.settings.speech_enabled {
            return Vec::new();
        }

        let sorted = closest_first(newly);
        let count = sorted.len().min(NEW_OBJECT_LIMIT);
        let mut out = Vec::new();

        for (i, object) in sorted.iter().take(count).enumerate() {
            let mut batch = vec![PlannedAnnouncement::about(
                text::new_object(&object.label, object.position, object.distance),
                &object.identity_key,
            )];
            if i + 1 == count && sorted.len() > count {
                batch.push(text::new_object_overflow(sorted.len() - count).into());
            }

            if i == 0 {
                out.extend(batch);
            } else {
                let due = now + READOUT_SPACING * i as u32;
                for planned in batch {
                    self.delayed.schedule(due, planned);
                }
            }
        }

        out
    }

    fn announce_closest(
        &mut self,
        snapshot: &[DetectedObject],
        now: Instant,
    ) -> Vec<PlannedAnnouncement> {
        let Some(closest) = snapshot.iter().min_by(|a, b| a.distance.total_cmp(&b.distance)) else {
            return Vec::new();
        };
        if !self.settings.speech_enabled || closest.distance >= CLOSEST_RANGE {
            return Vec::new();
        }

        let Some(interval) = closest_interval(closest.distance, self.settings.verbosity) else {
            return Vec::new();
        };
        let due = self
            .last_announced
            .get(&closest.identity_key)
            .is_none_or(|at| now.saturating_duration_since(*at) > interval);
        if !due {
            tracing::trace!(key = %closest.identity_key, "closest object announced recently");
            return Vec::new();
        }

        self.last_announced.insert(closest.identity_key.clone(), now);
        vec![PlannedAnnouncement::about(
            text::distance_notification(&closest.label, closest.position, closest.distance),
            &closest.identity_key,
        )]
    }

    /// Release everything whose time has come, including a fired scene
    /// debounce
    pub fn poll(&mut self, now: Instant) -> Vec<PlannedAnnouncement> {
        let mut out = self.delayed.take_due(now);

        if let Some(snapshot) = self.scene_debounce.take_due(now) {
            tracing::debug!(objects = snapshot.len(), "scene debounce fired");
            out.extend(self.describe_scene(&snapshot, now));
        }

        out
    }

    /// Earliest instant [`poll`](Self::poll) has work to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.scene_debounce.deadline(), self.delayed.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub const fn is_debounce_armed(&self) -> bool {
        self.scene_debounce.is_armed()
    }

    /// Readout entries still waiting for their slot
    #[must_use]
    pub fn pending_announcements(&self) -> usize {
        self.delayed.len()
    }

    /// When `key` was last announced, if remembered
    #[must_use]
    pub fn last_announced(&self, key: &str) -> Option<Instant> {
        self.last_announced.get(key).copied()
    }

    /// Drop the pending debounce and every delayed readout entry
    pub fn cancel_timers(&mut self) {
        self.scene_debounce.cancel();
        self.delayed.clear();
    }

    /// Start a new session: no timers, no announcement memory
    pub fn reset_session(&mut self) {
        self.cancel_timers();
        self.last_announced.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_interval_table() {
        let ms = |d: Duration| d.as_millis();

        assert_eq!(closest_interval(1.0, Verbosity::Medium).map(ms), Some(3000));
        assert_eq!(closest_interval(1.0, Verbosity::High).map(ms), Some(2000));
        assert_eq!(closest_interval(1.0, Verbosity::Low).map(ms), Some(3000));
        assert_eq!(closest_interval(2.0, Verbosity::Medium).map(ms), Some(6000));
        assert_eq!(closest_interval(2.0, Verbosity::High).map(ms), Some(4000));
        assert_eq!(closest_interval(4.0, Verbosity::Medium).map(ms), Some(10_000));
        assert_eq!(closest_interval(4.0, Verbosity::High).map(ms), Some(10_000));
        assert_eq!(closest_interval(4.0, Verbosity::Low), None);
    }

    #[test]
    fn test_settings_toggle_cancels_debounce() {
        let mut policy = PolicyEngine::new(GuidanceSettings::default());
        policy.scene_debounce.arm(Instant::now(), Vec::new());

        policy.set_announce_all(false);
        assert!(!policy.is_debounce_armed());
        assert!(!policy.settings().announce_all);
    }
}
