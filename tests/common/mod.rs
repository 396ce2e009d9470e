//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pathsense::detection::RawDetection;
use pathsense::speech::SpeechEventSender;
use pathsense::tracker::identity_key;
use pathsense::{
    BoundingBox, Config, DetectedObject, DetectionBatch, FrameSize, Position, SpeechEngine,
    SpeechEvent, Utterance,
};

/// Everything a [`RecordingSpeech`] was asked to do
#[derive(Debug, Default)]
pub struct SpeechLog {
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
}

/// Speech engine that records utterances instead of playing them
///
/// Clones share one log, so a test can keep a clone after handing the engine
/// to a scheduler or navigator.
#[derive(Clone, Default)]
pub struct RecordingSpeech {
    log: Arc<Mutex<SpeechLog>>,
    events: Option<SpeechEventSender>,
}

impl RecordingSpeech {
    /// Records only; the test delivers completion events itself
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports every utterance as started and finished right away
    #[must_use]
    pub fn auto_complete(events: SpeechEventSender) -> Self {
        Self {
            log: Arc::default(),
            events: Some(events),
        }
    }

    /// Texts spoken so far, in dispatch order
    pub fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .spoken
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.log.lock().unwrap().spoken.clone()
    }

    pub fn last(&self) -> Option<Utterance> {
        self.log.lock().unwrap().spoken.last().cloned()
    }

    pub fn cancels(&self) -> usize {
        self.log.lock().unwrap().cancels
    }

    /// How many times `text` was spoken
    pub fn count(&self, text: &str) -> usize {
        self.texts().iter().filter(|t| t.as_str() == text).count()
    }
}

impl SpeechEngine for RecordingSpeech {
    fn speak(&mut self, utterance: Utterance) {
        let id = utterance.id;
        self.log.lock().unwrap().spoken.push(utterance);
        if let Some(events) = &self.events {
            let _ = events.send(SpeechEvent::started(id));
            let _ = events.send(SpeechEvent::finished(id));
        }
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
    }
}

/// `t0 + ms`
#[must_use]
pub fn at(t0: Instant, ms: u64) -> Instant {
    t0 + Duration::from_millis(ms)
}

/// A classified object built directly, bypassing geometry
#[must_use]
pub fn object(label: &str, position: Position, distance: f64, observed_at: Instant) -> DetectedObject {
    DetectedObject {
        label: label.to_string(),
        confidence: 0.9,
        bounding_box: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        },
        position,
        distance,
        identity_key: identity_key(label, position, distance),
        observed_at,
    }
}

/// 100x100 frame
#[must_use]
pub const fn square_frame() -> FrameSize {
    FrameSize {
        width: 100.0,
        height: 100.0,
    }
}

/// A raw detection as the detector would report it
#[must_use]
pub fn raw(label: &str, confidence: f64, bbox: [f64; 4]) -> RawDetection {
    RawDetection {
        label: label.to_string(),
        confidence,
        bounding_box: bbox.into(),
    }
}

/// A chair filling the middle quarter of a 100x100 frame (ahead, 1.6 m)
#[must_use]
pub fn chair_batch() -> DetectionBatch {
    DetectionBatch {
        frame: square_frame(),
        detections: vec![raw("chair", 0.9, [25.0, 25.0, 50.0, 50.0])],
    }
}

#[must_use]
pub fn empty_batch() -> DetectionBatch {
    DetectionBatch {
        frame: square_frame(),
        detections: Vec::new(),
    }
}

/// Default configuration with the tick rate limit disabled
#[must_use]
pub fn config() -> Config {
    Config {
        min_tick_interval: Duration::ZERO,
        ..Config::default()
    }
}
