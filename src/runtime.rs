//! Async driver for a [`Navigator`]
//!
//! One task owns the navigator and serializes everything that can touch it:
//!
//! ```text
//!   NavigatorHandle ──commands──┐
//!   SpeechEngine ───events──────┤
//!   drain interval (250 ms) ────┼──▶ select! ──▶ Navigator
//!   watchdog interval (5 s) ────┤
//!   next policy deadline ───────┘
//! ```
//!
//! Callers talk to it through a cloneable [`NavigatorHandle`].

use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::announce::Priority;
use crate::announce::scheduler::{DRAIN_INTERVAL, WATCHDOG_INTERVAL};
use crate::config::{GuidanceSettings, Verbosity};
use crate::detection::DetectionBatch;
use crate::navigator::Navigator;
use crate::speech::{SpeechEngine, SpeechEventReceiver};
use crate::{Error, Result};

const COMMAND_BUFFER: usize = 64;

/// Point-in-time view of a running navigator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorStatus {
    pub navigating: bool,
    pub speaking: bool,
    pub queued: usize,
    pub tracked: usize,
    pub settings: GuidanceSettings,
}

enum Command {
    Start,
    Stop,
    Batch(DetectionBatch),
    DescribeNow,
    SetHidden(bool),
    ToggleSpeech,
    ToggleAnnounceAll,
    CycleVerbosity,
    SetVerbosity(Verbosity),
    Say { text: String, priority: Priority },
    Status(oneshot::Sender<NavigatorStatus>),
    WaitQuiet(oneshot::Sender<()>),
    Shutdown,
}

/// Handle for sending commands to the navigator task
#[derive(Clone)]
pub struct NavigatorHandle {
    tx: mpsc::Sender<Command>,
}

impl NavigatorHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::Runtime("navigator task has stopped".to_string()))
    }

    /// Begin a navigation session
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    /// End the navigation session
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    /// Submit one detector batch
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn submit(&self, batch: DetectionBatch) -> Result<()> {
        self.send(Command::Batch(batch)).await
    }

    /// Describe the current scene immediately
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn describe_now(&self) -> Result<()> {
        self.send(Command::DescribeNow).await
    }

    /// Report that the hosting context was hidden or shown
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn set_hidden(&self, hidden: bool) -> Result<()> {
        self.send(Command::SetHidden(hidden)).await
    }

    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn toggle_speech(&self) -> Result<()> {
        self.send(Command::ToggleSpeech).await
    }

    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn toggle_announce_all(&self) -> Result<()> {
        self.send(Command::ToggleAnnounceAll).await
    }

    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn cycle_verbosity(&self) -> Result<()> {
        self.send(Command::CycleVerbosity).await
    }

    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn set_verbosity(&self, verbosity: Verbosity) -> Result<()> {
        self.send(Command::SetVerbosity(verbosity)).await
    }

    /// Speak arbitrary text
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn say(&self, text: impl Into<String>, priority: Priority) -> Result<()> {
        self.send(Command::Say {
            text: text.into(),
            priority,
        })
        .await
    }

    /// Current session state
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has stopped
    pub async fn status(&self) -> Result<NavigatorStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx)).await?;
        rx.await
            .map_err(|_| Error::Runtime("navigator task dropped status request".to_string()))
    }

    /// Resolve once nothing is speaking, queued or scheduled
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task stops first
    pub async fn wait_quiet(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::WaitQuiet(tx)).await?;
        rx.await
            .map_err(|_| Error::Runtime("navigator task stopped before going quiet".to_string()))
    }

    /// Stop the task. Pending speech is cancelled.
    ///
    /// # Errors
    ///
    /// Returns error if the navigator task has already stopped
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

/// Spawn the navigator task.
///
/// `events` must be the receiving end of the channel the navigator's speech
/// engine reports on. The join handle yields the navigator back after
/// shutdown.
pub fn spawn<E>(
    navigator: Navigator<E>,
    events: SpeechEventReceiver,
) -> (NavigatorHandle, JoinHandle<Navigator<E>>)
where
    E: SpeechEngine + 'static,
{
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(navigator, rx, events));
    (NavigatorHandle { tx }, task)
}

/// Current time on the tokio clock (honours paused time in tests)
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn run<E: SpeechEngine>(
    mut navigator: Navigator<E>,
    mut commands: mpsc::Receiver<Command>,
    mut events: SpeechEventReceiver,
) -> Navigator<E> {
    let mut drain = tokio::time::interval(DRAIN_INTERVAL);
    drain.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut watchdog = tokio::time::interval(WATCHDOG_INTERVAL);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut quiet_waiters: Vec<oneshot::Sender<()>> = Vec::new();

    tracing::debug!("navigator task started");

    loop {
        let deadline = navigator.next_deadline();
        let wake = deadline.map_or_else(tokio::time::Instant::now, tokio::time::Instant::from_std);

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("all navigator handles dropped");
                    break;
                };
                match command {
                    Command::Shutdown => {
                        tracing::info!("shutdown requested");
                        break;
                    }
                    Command::WaitQuiet(tx) => quiet_waiters.push(tx),
                    Command::Status(tx) => {
                        let _ = tx.send(NavigatorStatus {
                            navigating: navigator.is_navigating(),
                            speaking: navigator.scheduler().is_speaking(),
                            queued: navigator.scheduler().queue_len(),
                            tracked: navigator.tracker().len(),
                            settings: navigator.settings(),
                        });
                    }
                    other => apply(&mut navigator, other, now()),
                }
            }
            Some(event) = events.recv() => {
                navigator.on_speech_event(event, now());
            }
            _ = drain.tick() => {
                navigator.poll(now());
            }
            _ = watchdog.tick() => {
                navigator.check_watchdog(now());
            }
            () = tokio::time::sleep_until(wake), if deadline.is_some() => {
                navigator.poll(now());
            }
        }

        if !quiet_waiters.is_empty() && navigator.is_quiet() {
            for waiter in quiet_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    navigator.shutdown();
    tracing::debug!("navigator task stopped");
    navigator
}

fn apply<E: SpeechEngine>(navigator: &mut Navigator<E>, command: Command, now: Instant) {
    match command {
        Command::Start => navigator.start(now),
        Command::Stop => navigator.stop(now),
        Command::Batch(batch) => {
            navigator.process_batch(&batch, now);
        }
        Command::DescribeNow => {
            if !navigator.describe_now(now) {
                tracing::debug!("describe requested while not navigating");
            }
        }
        Command::SetHidden(hidden) => navigator.set_hidden(hidden),
        Command::ToggleSpeech => {
            let enabled = navigator.toggle_speech(now);
            tracing::info!(enabled, "speech toggled");
        }
        Command::ToggleAnnounceAll => {
            let announce_all = navigator.toggle_announce_all(now);
            tracing::info!(announce_all, "announcement mode toggled");
        }
        Command::CycleVerbosity => {
            let verbosity = navigator.cycle_verbosity(now);
            tracing::info!(%verbosity, "verbosity changed");
        }
        Command::SetVerbosity(verbosity) => navigator.set_verbosity(verbosity, now),
        Command::Say { text, priority } => {
            navigator.say(&text, priority, now);
        }
        Command::Status(_) | Command::WaitQuiet(_) | Command::Shutdown => {}
    }
}
