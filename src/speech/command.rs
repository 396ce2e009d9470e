//! External command speech engine
//!
//! Runs a TTS program (`espeak-ng`, `say`, `spd-say`, ...) once per
//! utterance. Arguments may contain placeholders:
//!
//! - `{text}` the utterance text (appended as a final argument if absent)
//! - `{wpm}` words per minute derived from the rate (175 at rate 1.0)
//! - `{voice}` the configured voice, or an empty string
//!
//! Cancelling aborts the waiter task, which drops the child and kills it.

use std::process::Stdio;

use tokio::process::Command;
use tokio::task::JoinHandle;

use super::{SpeechEngine, SpeechEvent, SpeechEventSender, Utterance};

/// Words per minute at rate 1.0
const BASE_WPM: f32 = 175.0;

/// Speaks by spawning an external program
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
    events: SpeechEventSender,
    current: Option<JoinHandle<()>>,
}

impl CommandSpeech {
    #[must_use]
    pub const fn new(program: String, args: Vec<String>, events: SpeechEventSender) -> Self {
        Self {
            program,
            args,
            events,
            current: None,
        }
    }

    /// Expand placeholders for one utterance
    fn build_args(&self, utterance: &Utterance) -> Vec<String> {
        let wpm = wpm_for_rate(utterance.options.rate).to_string();
        let voice = utterance.options.voice.as_deref().unwrap_or_default();

        let mut has_text = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains("{text}") {
                    has_text = true;
                }
                arg.replace("{text}", &utterance.text)
                    .replace("{wpm}", &wpm)
                    .replace("{voice}", voice)
            })
            .collect();

        if !has_text {
            args.push(utterance.text.clone());
        }
        args
    }
}

impl SpeechEngine for CommandSpeech {
    fn speak(&mut self, utterance: Utterance) {
        self.cancel();

        let args = self.build_args(&utterance);
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let events = self.events.clone();
        let program = self.program.clone();
        let id = utterance.id;

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            let _ = events.send(SpeechEvent::failed(id, "no async runtime"));
            return;
        };

        self.current = Some(handle.spawn(async move {
            let child = match command.spawn() {
                Ok(child) => child,
                Err(e) => {
                    tracing::warn!(program = %program, error = %e, "failed to spawn speech command");
                    let _ = events.send(SpeechEvent::failed(id, e.to_string()));
                    return;
                }
            };

            let _ = events.send(SpeechEvent::started(id));

            match child.wait_with_output().await {
                Ok(output) if output.status.success() => {
                    let _ = events.send(SpeechEvent::finished(id));
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let reason = format!("{program} exited with {}: {}", output.status, stderr.trim());
                    tracing::warn!(reason = %reason, "speech command failed");
                    let _ = events.send(SpeechEvent::failed(id, reason));
                }
                Err(e) => {
                    let _ = events.send(SpeechEvent::failed(id, e.to_string()));
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.current.take() {
            tracing::trace!(program = %self.program, "cancelling speech command");
            task.abort();
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wpm_for_rate(rate: f32) -> u32 {
    let rate = if rate > 0.0 { rate } else { 1.0 };
    (BASE_WPM * rate).round() as u32
}
