use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncRead;
use tracing_subscriber::EnvFilter;

use pathsense::detection::{self, BoundingBox, FrameSize};
use pathsense::speech;
use pathsense::{
    Config, JsonLinesSource, Navigator, NavigatorHandle, Priority, SpeechEngine, SpeechEngineKind,
    Verbosity, runtime,
};

/// How long to wait for outstanding speech before giving up on exit
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Pathsense - spoken scene guidance from object detections
#[derive(Parser)]
#[command(name = "pathsense", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ~/.config/pathsense/config.toml)
    #[arg(short, long, env = "PATHSENSE_CONFIG")]
    config: Option<PathBuf>,

    /// Read detection batches (JSON Lines) from a file instead of stdin
    #[arg(short, long, env = "PATHSENSE_INPUT")]
    input: Option<PathBuf>,

    /// Delay between batches when replaying a recorded file, in milliseconds
    #[arg(long, default_value = "0")]
    pace_ms: u64,

    /// Scene description detail: low, medium or high
    #[arg(long)]
    verbosity: Option<Verbosity>,

    /// Only report the closest object
    #[arg(long)]
    closest_only: bool,

    /// Start with scene announcements muted
    #[arg(long)]
    mute: bool,

    /// Speech engine: console or command
    #[arg(long)]
    engine: Option<SpeechEngineKind>,

    /// Speech program for the command engine (e.g. espeak-ng)
    #[arg(long)]
    speech_command: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Announce detections read from stdin or --input (default)
    Run,
    /// Classify a single bounding box
    Classify {
        /// Frame size as WIDTHxHEIGHT
        #[arg(long)]
        frame: FrameSize,
        /// Box as x,y,width,height
        #[arg(long)]
        bbox: BoundingBox,
    },
    /// Speak text through the configured engine
    Say {
        /// Text to speak
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,pathsense=info",
        1 => "info,pathsense=debug",
        2 => "debug",
        _ => "trace",
    };

    // Stdout carries console speech, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::Classify { frame, bbox }) = &cli.command {
        return classify(*frame, bbox);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Say { text }) => say(&config, &text.join(" ")).await,
        Some(Command::Run) | None => {
            navigate(&config, cli.input, Duration::from_millis(cli.pace_ms)).await
        }
        Some(Command::Classify { .. }) => Ok(()),
    }
}

/// Layer CLI flags over the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(verbosity) = cli.verbosity {
        config.guidance.verbosity = verbosity;
    }
    if cli.closest_only {
        config.guidance.announce_all = false;
    }
    if cli.mute {
        config.guidance.speech_enabled = false;
    }
    if let Some(command) = &cli.speech_command {
        config.speech.command = Some(command.clone());
        config.speech.engine = SpeechEngineKind::Command;
    }
    if let Some(engine) = cli.engine {
        config.speech.engine = engine;
    }
}

type NavigatorTask = tokio::task::JoinHandle<Navigator<Box<dyn SpeechEngine>>>;

/// Spawn the navigator task with the configured speech engine
fn spawn_navigator(config: &Config) -> anyhow::Result<(NavigatorHandle, NavigatorTask)> {
    let (events_tx, events_rx) = speech::event_channel();
    let engine = speech::engine_from_config(&config.speech, events_tx)?;
    let navigator = Navigator::new(engine, config);
    Ok(runtime::spawn(navigator, events_rx))
}

/// Wait for speech to finish, bounded by [`DRAIN_TIMEOUT`]
async fn drain(handle: &NavigatorHandle) -> anyhow::Result<()> {
    if tokio::time::timeout(DRAIN_TIMEOUT, handle.wait_quiet())
        .await
        .is_err()
    {
        tracing::warn!("timed out waiting for speech to finish");
    }
    Ok(())
}

/// Main loop: feed detection batches to the navigator until input ends
async fn navigate(config: &Config, input: Option<PathBuf>, pace: Duration) -> anyhow::Result<()> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = match &input {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };
    let mut source = JsonLinesSource::new(reader);

    let (handle, task) = spawn_navigator(config)?;
    handle.start().await?;

    tracing::info!(
        input = ?input,
        engine = %config.speech.engine,
        verbosity = %config.guidance.verbosity,
        announce_all = config.guidance.announce_all,
        "pathsense ready"
    );

    let mut batches = 0_usize;
    loop {
        tokio::select! {
            batch = source.next_batch() => {
                let Some(batch) = batch? else {
                    tracing::info!(batches, "end of input");
                    break;
                };
                batches += 1;
                handle.submit(batch).await?;
                if !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    drain(&handle).await?;
    handle.stop().await?;
    drain(&handle).await?;
    handle.shutdown().await?;
    task.await?;

    Ok(())
}

/// Print how a single box would be classified
fn classify(frame: FrameSize, bbox: &BoundingBox) -> anyhow::Result<()> {
    let Some(c) = detection::classify(bbox, frame) else {
        anyhow::bail!("bounding box has no usable geometry for this frame");
    };

    println!("position: {}", c.position);
    println!("distance: {:.2} m", c.distance);
    println!("priority: {}", Priority::for_distance(c.distance));

    Ok(())
}

/// Speak one utterance and wait for it to finish
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    let (handle, task) = spawn_navigator(config)?;

    handle.say(text, Priority::Normal).await?;
    drain(&handle).await?;
    handle.shutdown().await?;
    task.await?;

    Ok(())
}
