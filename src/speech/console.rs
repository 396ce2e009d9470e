//! Console speech engine
//!
//! Prints utterances to stdout instead of synthesizing audio. Completion is
//! reported after roughly the time the text would take to say, so queue
//! pacing behaves as it would with a real voice.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::{SpeechEngine, SpeechEvent, SpeechEventSender, Utterance};

/// Speaking speed at rate 1.0
const WORDS_PER_MINUTE: f32 = 150.0;

/// Floor for the simulated speaking time
const MIN_SPEAKING_MS: u64 = 300;

/// Writes utterances to stdout
pub struct ConsoleSpeech {
    events: SpeechEventSender,
    current: Option<JoinHandle<()>>,
}

impl ConsoleSpeech {
    #[must_use]
    pub const fn new(events: SpeechEventSender) -> Self {
        Self {
            events,
            current: None,
        }
    }
}

impl SpeechEngine for ConsoleSpeech {
    fn speak(&mut self, utterance: Utterance) {
        self.cancel();

        println!("\u{1f50a} {}", utterance.text);
        let _ = self.events.send(SpeechEvent::started(utterance.id));

        let duration = speaking_time(&utterance.text, utterance.options.rate);
        let events = self.events.clone();
        let id = utterance.id;

        // Outside a runtime there is nothing to wait on; finish right away
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.current = Some(handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = events.send(SpeechEvent::finished(id));
                }));
            }
            Err(_) => {
                let _ = events.send(SpeechEvent::finished(id));
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(task) = self.current.take() {
            task.abort();
        }
    }
}

/// Rough time to speak `text` at `rate`
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn speaking_time(text: &str, rate: f32) -> Duration {
    let words = text.split_whitespace().count() as f32;
    let rate = if rate > 0.0 { rate } else { 1.0 };
    let ms = (words * 60_000.0 / (WORDS_PER_MINUTE * rate)) as u64;
    Duration::from_millis(ms.max(MIN_SPEAKING_MS))
}
