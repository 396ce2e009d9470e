//! Geometry classification
//!
//! Turns a bounding box and the source frame size into a coarse bearing
//! (left / ahead / right) and a monocular distance estimate. No depth sensor
//! is assumed: distance is inversely proportional to the square root of the
//! fraction of the frame the box covers.

use super::{BoundingBox, FrameSize, Position};

/// Numerator of the area-to-distance heuristic, in meters
const DISTANCE_SCALE: f64 = 0.8;

/// Box centers left of `center * LEFT_FACTOR` are "left"
const LEFT_FACTOR: f64 = 0.7;

/// Box centers right of `center * RIGHT_FACTOR` are "right"
const RIGHT_FACTOR: f64 = 1.3;

/// Result of classifying one bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Horizontal bucket relative to the frame center
    pub position: Position,
    /// Estimated distance in meters, always finite and positive
    pub distance: f64,
}

/// Classify a bounding box against its frame.
///
/// Returns `None` for geometry no defensible distance can be computed from:
/// zero or negative sizes, non-finite coordinates, or an empty frame.
#[must_use]
pub fn classify(bbox: &BoundingBox, frame: FrameSize) -> Option<Classification> {
    if !frame.is_valid() || !bbox.is_valid() {
        return None;
    }

    let distance = estimate_distance(bbox, frame)?;
    Some(Classification {
        position: position_of(bbox, frame),
        distance,
    })
}

/// Horizontal position of the box center.
///
/// The "ahead" cone spans `0.7..=1.3` times the frame center, so it is not
/// symmetric around the middle of the frame.
#[must_use]
pub fn position_of(bbox: &BoundingBox, frame: FrameSize) -> Position {
    let cx = bbox.x + bbox.width / 2.0;
    let center = frame.width / 2.0;

    if cx < center * LEFT_FACTOR {
        Position::Left
    } else if cx > center * RIGHT_FACTOR {
        Position::Right
    } else {
        Position::Ahead
    }
}

/// Heuristic distance `0.8 / sqrt(box_area / frame_area)`.
///
/// Returns `None` when either area is not strictly positive.
#[must_use]
pub fn estimate_distance(bbox: &BoundingBox, frame: FrameSize) -> Option<f64> {
    let box_area = bbox.width * bbox.height;
    let frame_area = frame.width * frame.height;

    if !(box_area > 0.0 && frame_area > 0.0) {
        return None;
    }

    let distance = DISTANCE_SCALE / (box_area / frame_area).sqrt();
    distance.is_finite().then_some(distance)
}
