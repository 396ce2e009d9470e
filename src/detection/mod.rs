//! Detection input and classification
//!
//! The object detector is an external collaborator. Each tick it hands over a
//! [`DetectionBatch`]: labeled boxes with confidence scores plus the pixel
//! size of the frame they were found in. This module filters that batch by
//! confidence, classifies each surviving box and produces immutable
//! [`DetectedObject`] values for the tracker.

pub mod geometry;
mod source;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use geometry::{Classification, classify};
pub use source::JsonLinesSource;

use crate::tracker::identity_key;
use crate::{Error, Result};

/// Detections at or below this confidence are discarded before classification
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.60;

/// Pixel dimensions of the source frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    /// Both dimensions finite and strictly positive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl FromStr for FrameSize {
    type Err = Error;

    /// Parse `WIDTHxHEIGHT`, e.g. `640x480`
    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::Detection(format!("frame size '{s}' is not WIDTHxHEIGHT")))?;
        let frame = Self {
            width: parse_number(w)?,
            height: parse_number(h)?,
        };
        if !frame.is_valid() {
            return Err(Error::Detection(format!("frame size '{s}' must be positive")));
        }
        Ok(frame)
    }
}

fn parse_number(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|e| Error::Detection(format!("invalid number '{s}': {e}")))
}

/// Axis-aligned box in source-frame pixels
///
/// Serialized as `[x, y, width, height]`, the layout detectors emit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Finite origin and strictly positive size
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    /// Parse `x,y,width,height`
    fn from_str(s: &str) -> Result<Self> {
        let values = s.split(',').map(parse_number).collect::<Result<Vec<_>>>()?;
        let [x, y, width, height] = values[..] else {
            return Err(Error::Detection(format!(
                "bounding box '{s}' needs four values x,y,width,height"
            )));
        };
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One labeled box as reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Class label (e.g. "chair")
    pub label: String,
    /// Detector score in `(0, 1]`
    #[serde(alias = "score")]
    pub confidence: f64,
    /// Box in frame pixels
    #[serde(alias = "bbox")]
    pub bounding_box: BoundingBox,
}

/// Everything the detector produced for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    /// Size of the frame the boxes refer to
    pub frame: FrameSize,
    /// Raw detections, unfiltered
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Coarse horizontal bearing of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Ahead,
    Right,
}

impl Position {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Ahead => "ahead",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified detection for a single tick
///
/// Created fresh every tick and never mutated; the tracker folds it into its
/// history and drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub position: Position,
    /// Heuristic distance in meters
    pub distance: f64,
    /// `label-position-floor(distance)`, see [`identity_key`]
    pub identity_key: String,
    pub observed_at: Instant,
}

impl DetectedObject {
    /// Classify a raw detection. `None` if its geometry is unusable.
    #[must_use]
    pub fn from_raw(raw: &RawDetection, frame: FrameSize, observed_at: Instant) -> Option<Self> {
        let Classification { position, distance } = classify(&raw.bounding_box, frame)?;

        Some(Self {
            identity_key: identity_key(&raw.label, position, distance),
            label: raw.label.clone(),
            confidence: raw.confidence,
            bounding_box: raw.bounding_box,
            position,
            distance,
            observed_at,
        })
    }
}

/// Filter a batch by confidence and classify what remains.
///
/// Low-confidence detections never reach the classifier. Detections with
/// unusable geometry are dropped silently; an empty result is a normal state.
#[must_use]
pub fn classify_batch(
    batch: &DetectionBatch,
    min_confidence: f64,
    now: Instant,
) -> Vec<DetectedObject> {
    if !batch.frame.is_valid() {
        tracing::debug!(frame = ?batch.frame, "ignoring batch with invalid frame size");
        return Vec::new();
    }

    batch
        .detections
        .iter()
        .filter(|d| d.confidence > min_confidence)
        .filter_map(|d| {
            let object = DetectedObject::from_raw(d, batch.frame, now);
            if object.is_none() {
                tracing::trace!(label = %d.label, bbox = ?d.bounding_box, "excluded degenerate box");
            }
            object
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, confidence: f64, bbox: [f64; 4]) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence,
            bounding_box: bbox.into(),
        }
    }

    #[test]
    fn test_confidence_filter_is_strict() {
        let batch = DetectionBatch {
            frame: FrameSize {
                width: 100.0,
                height: 100.0,
            },
            detections: vec![
                raw("chair", 0.60, [25.0, 25.0, 50.0, 50.0]),
                raw("table", 0.61, [25.0, 25.0, 50.0, 50.0]),
                raw("lamp", 0.2, [25.0, 25.0, 50.0, 50.0]),
            ],
        };

        let objects = classify_batch(&batch, DEFAULT_MIN_CONFIDENCE, Instant::now());
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].label, "table");
        assert_eq!(objects[0].identity_key, "table-ahead-1");
    }

    #[test]
    fn test_zero_area_box_excluded() {
        let batch = DetectionBatch {
            frame: FrameSize {
                width: 640.0,
                height: 480.0,
            },
            detections: vec![
                raw("person", 0.9, [10.0, 10.0, 0.0, 100.0]),
                raw("person", 0.9, [10.0, 10.0, 100.0, 100.0]),
            ],
        };

        let objects = classify_batch(&batch, DEFAULT_MIN_CONFIDENCE, Instant::now());
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_batch_deserializes_detector_layout() {
        let json = r#"{"frame":{"width":100,"height":100},
            "detections":[{"label":"chair","score":0.9,"bbox":[25,25,50,50]}]}"#;
        let batch: DetectionBatch = serde_json::from_str(json).unwrap();

        assert_eq!(batch.detections[0].confidence, 0.9);
        assert_eq!(batch.detections[0].bounding_box.width, 50.0);
    }

    #[test]
    fn test_parse_cli_geometry() {
        let frame: FrameSize = "640x480".parse().unwrap();
        assert_eq!(frame.width, 640.0);
        assert_eq!(frame.height, 480.0);
        assert!("640".parse::<FrameSize>().is_err());
        assert!("0x480".parse::<FrameSize>().is_err());

        let bbox: BoundingBox = "10, 20,30,40".parse().unwrap();
        assert_eq!(bbox, BoundingBox::from([10.0, 20.0, 30.0, 40.0]));
        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::Left.to_string(), "left");
        assert_eq!(Position::Ahead.to_string(), "ahead");
        assert_eq!(Position::Right.to_string(), "right");
    }
}
