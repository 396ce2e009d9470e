//! Announcement phrases and speech text cleanup
//!
//! Every sentence the system says about the scene is built here so wording
//! stays consistent between modes.

use super::{AnnouncementRequest, NEAR_DISTANCE, Priority, URGENT_DISTANCE};
use crate::detection::Position;

/// Street abbreviations expanded before speaking
const ABBREVIATIONS: &[(&str, &str)] = &[("St.", "Street"), ("Ave.", "Avenue"), ("Rd.", "Road")];

/// Normalize text for a speech engine.
///
/// Trims, collapses whitespace runs to single spaces and expands common
/// street abbreviations. Returns an empty string for blank input.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let mut cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for (short, long) in ABBREVIATIONS {
        if cleaned.contains(short) {
            cleaned = cleaned.replace(short, long);
        }
    }
    cleaned
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// First sighting of an object in announce-all mode
#[must_use]
pub fn new_object(label: &str, position: Position, distance: f64) -> AnnouncementRequest {
    let priority = if distance < NEAR_DISTANCE {
        Priority::Medium
    } else {
        Priority::Low
    };
    AnnouncementRequest::new(
        format!("New {label} detected {position}, {distance:.1} meters away"),
        priority,
    )
}

/// Periodic update about the closest object in closest-only mode
#[must_use]
pub fn distance_notification(label: &str, position: Position, distance: f64) -> AnnouncementRequest {
    if distance < URGENT_DISTANCE {
        AnnouncementRequest::new(
            format!("Warning: {label} {position}, {distance:.1} meters"),
            Priority::High,
        )
    } else {
        AnnouncementRequest::new(
            format!("{label} {position}, {distance:.1} meters"),
            Priority::for_distance(distance),
        )
    }
}

/// One line of a scene description
#[must_use]
pub fn scene_entry(label: &str, position: Position, distance: f64) -> AnnouncementRequest {
    AnnouncementRequest::new(
        format!("{label} {position}, {distance:.1} meters"),
        Priority::for_distance(distance),
    )
}

/// Opening line of a scene description
#[must_use]
pub fn scene_banner(total: usize) -> AnnouncementRequest {
    AnnouncementRequest::new(
        format!("{total} object{} detected.", plural(total)),
        Priority::Medium,
    )
}

/// Trailer after a truncated scene description
#[must_use]
pub fn scene_overflow(remaining: usize) -> AnnouncementRequest {
    AnnouncementRequest::new(
        format!("And {remaining} more object{} further away", plural(remaining)),
        Priority::Low,
    )
}

/// Trailer after a truncated new-object readout
#[must_use]
pub fn new_object_overflow(remaining: usize) -> AnnouncementRequest {
    AnnouncementRequest::new(
        format!("And {remaining} more new object{}", plural(remaining)),
        Priority::Low,
    )
}

/// A close, long-present object left the scene
#[must_use]
pub fn vanished(label: &str) -> AnnouncementRequest {
    AnnouncementRequest::new(format!("{label} no longer detected"), Priority::Low)
}

/// Manual description requested with nothing in view
#[must_use]
pub fn empty_scene() -> AnnouncementRequest {
    AnnouncementRequest::new("No objects detected in view", Priority::Normal)
}

/// System confirmation phrases
pub mod system {
    pub const NAVIGATION_STARTED: &str = "Navigation started. Processing camera feed.";
    pub const NAVIGATION_STOPPED: &str = "Navigation stopped.";
    pub const SPEECH_ENABLED: &str = "Speech enabled";
    pub const SPEECH_DISABLED: &str = "Speech disabled";
    pub const ANNOUNCE_ALL_MODE: &str = "Switched to announce all objects mode";
    pub const CLOSEST_ONLY_MODE: &str = "Switched to closest object only mode";

    #[must_use]
    pub fn verbosity_set(level: impl std::fmt::Display) -> String {
        format!("Verbosity level set to {level}")
    }
}
