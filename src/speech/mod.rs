//! Text-to-speech primitive
//!
//! The synthesizer itself is an external collaborator. The core only needs
//! a fire-and-forget [`SpeechEngine`] that accepts an [`Utterance`] and later
//! reports what happened to it as a [`SpeechEvent`] on a channel. Nothing
//! here blocks the caller.

mod command;
mod console;

use tokio::sync::mpsc;

pub use command::CommandSpeech;
pub use console::ConsoleSpeech;

use crate::config::{SpeechConfig, SpeechEngineKind};
use crate::{Error, Result};

/// Default speaking rate, slightly faster than the engine default
pub const DEFAULT_RATE: f32 = 1.1;

/// Rate used for urgent warnings so they come out slow and clear
pub const URGENT_RATE: f32 = 0.9;

/// Sender half engines use to report utterance progress
pub type SpeechEventSender = mpsc::UnboundedSender<SpeechEvent>;

/// Receiver half consumed by the runtime
pub type SpeechEventReceiver = mpsc::UnboundedReceiver<SpeechEvent>;

/// Create the channel engines report on
#[must_use]
pub fn event_channel() -> (SpeechEventSender, SpeechEventReceiver) {
    mpsc::unbounded_channel()
}

/// Voice parameters handed to the engine with every utterance
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceOptions {
    /// Speaking rate multiplier (engine default is 1.0)
    pub rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Volume in `0.0..=1.0`
    pub volume: f32,
    /// Engine-specific voice name, `None` for the engine default
    pub voice: Option<String>,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

impl VoiceOptions {
    /// Options adjusted for an urgent utterance: slower, full volume
    #[must_use]
    pub fn urgent(&self) -> Self {
        Self {
            rate: URGENT_RATE,
            volume: 1.0,
            ..self.clone()
        }
    }
}

/// One piece of text handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Scheduler-assigned id echoed back in [`SpeechEvent`]s
    pub id: u64,
    pub text: String,
    pub options: VoiceOptions,
}

/// What happened to an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEventKind {
    /// Audio output began
    Started,
    /// Utterance completed normally
    Finished,
    /// Engine gave up on the utterance
    Failed(String),
}

/// Progress report for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub utterance_id: u64,
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    #[must_use]
    pub const fn started(utterance_id: u64) -> Self {
        Self {
            utterance_id,
            kind: SpeechEventKind::Started,
        }
    }

    #[must_use]
    pub const fn finished(utterance_id: u64) -> Self {
        Self {
            utterance_id,
            kind: SpeechEventKind::Finished,
        }
    }

    #[must_use]
    pub fn failed(utterance_id: u64, reason: impl Into<String>) -> Self {
        Self {
            utterance_id,
            kind: SpeechEventKind::Failed(reason.into()),
        }
    }
}

/// A text-to-speech backend
///
/// Implementations must return promptly from both methods and report
/// progress asynchronously. `cancel` stops whatever is currently playing; an
/// engine may or may not emit an event for the cancelled utterance.
pub trait SpeechEngine: Send {
    /// Start speaking `utterance`
    fn speak(&mut self, utterance: Utterance);

    /// Stop the current utterance, if any
    fn cancel(&mut self);
}

impl<T: SpeechEngine + ?Sized> SpeechEngine for Box<T> {
    fn speak(&mut self, utterance: Utterance) {
        (**self).speak(utterance);
    }

    fn cancel(&mut self) {
        (**self).cancel();
    }
}

/// Build the engine selected by `config`, reporting on `events`
///
/// # Errors
///
/// Returns error if the command engine is selected without a command
pub fn engine_from_config(
    config: &SpeechConfig,
    events: SpeechEventSender,
) -> Result<Box<dyn SpeechEngine>> {
    match config.engine {
        SpeechEngineKind::Console => Ok(Box::new(ConsoleSpeech::new(events))),
        SpeechEngineKind::Command => {
            let program = config
                .command
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| Error::Speech("no speech command configured".to_string()))?;
            tracing::debug!(program, args = ?config.args, "using command speech engine");
            Ok(Box::new(CommandSpeech::new(
                program.to_string(),
                config.args.clone(),
                events,
            )))
        }
    }
}
