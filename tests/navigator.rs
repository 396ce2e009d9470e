//! Navigator session tests
//!
//! Drive the whole synchronous pipeline with explicit instants and a
//! recording speech engine.

use std::time::{Duration, Instant};

use pathsense::{Config, Navigator, Priority, SpeechEvent, TickOutcome, Verbosity};

mod common;

use common::{RecordingSpeech, at, chair_batch, config, empty_batch, raw, square_frame};

const STARTED: &str = "Navigation started. Processing camera feed.";

fn navigator(config: &Config) -> (Navigator<RecordingSpeech>, RecordingSpeech) {
    let speech = RecordingSpeech::new();
    (Navigator::new(speech.clone(), config), speech)
}

/// Complete whatever is speaking and let the pause elapse
fn finish_current(nav: &mut Navigator<RecordingSpeech>, now: Instant) -> Instant {
    if let Some(id) = nav.scheduler().current_id() {
        nav.on_speech_event(SpeechEvent::finished(id), now);
    }
    let after = now + Duration::from_millis(150);
    nav.poll(after);
    after
}

#[test]
fn test_batches_ignored_until_started() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());

    assert_eq!(nav.process_batch(&chair_batch(), t0), TickOutcome::NotNavigating);
    assert!(!nav.describe_now(t0));
    assert!(speech.texts().is_empty());
}

#[test]
fn test_new_chair_announced_and_counted() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());

    nav.start(t0);
    assert_eq!(speech.texts(), vec![STARTED]);
    let t1 = finish_current(&mut nav, at(t0, 1000));

    let outcome = nav.process_batch(&chair_batch(), t1);
    assert_eq!(
        outcome,
        TickOutcome::Processed {
            objects: 1,
            new_objects: 1,
            vanished: 0
        }
    );
    assert_eq!(
        speech.last().unwrap().text,
        "New chair detected ahead, 1.6 meters away"
    );
    assert_eq!(nav.tracker().get("chair-ahead-1").unwrap().announce_count, 1);
    assert_eq!(nav.snapshot().len(), 1);
}

#[test]
fn test_low_confidence_never_reaches_tracker() {
    let t0 = Instant::now();
    let (mut nav, _speech) = navigator(&config());
    nav.start(t0);

    let batch = pathsense::DetectionBatch {
        frame: square_frame(),
        detections: vec![raw("chair", 0.6, [25.0, 25.0, 50.0, 50.0])],
    };
    nav.process_batch(&batch, at(t0, 100));

    assert!(nav.tracker().is_empty());
}

#[test]
fn test_tick_rate_limit() {
    let t0 = Instant::now();
    let (mut nav, _speech) = navigator(&Config::default());
    nav.start(t0);

    assert!(matches!(
        nav.process_batch(&chair_batch(), t0),
        TickOutcome::Processed { .. }
    ));
    assert_eq!(
        nav.process_batch(&chair_batch(), at(t0, 499)),
        TickOutcome::RateLimited
    );
    assert!(matches!(
        nav.process_batch(&chair_batch(), at(t0, 500)),
        TickOutcome::Processed { .. }
    ));
}

#[test]
fn test_quiet_scene_described_after_debounce() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);
    let mut now = finish_current(&mut nav, at(t0, 100));

    nav.process_batch(&chair_batch(), now);
    now = finish_current(&mut nav, now + Duration::from_millis(100));

    // Same chair keeps reporting; every tick pushes the description back
    for _ in 0..4 {
        now += Duration::from_millis(500);
        nav.process_batch(&chair_batch(), now);
    }
    let deadline = nav.next_deadline().unwrap();
    assert_eq!(deadline, now + Duration::from_secs(2));

    nav.poll(deadline);
    assert_eq!(speech.last().unwrap().text, "1 object detected.");
    let after_banner = finish_current(&mut nav, deadline + Duration::from_millis(400));

    nav.poll(after_banner.max(deadline + Duration::from_millis(1200)));
    assert_eq!(speech.last().unwrap().text, "chair ahead, 1.6 meters");
    assert_eq!(speech.count("1 object detected."), 1);
    assert_eq!(nav.tracker().get("chair-ahead-1").unwrap().announce_count, 2);
}

#[test]
fn test_vanished_chair_announced_once() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);

    let mut now = t0;
    for _ in 0..8 {
        now += Duration::from_millis(500);
        nav.process_batch(&chair_batch(), now);
        now = finish_current(&mut nav, now);
    }

    nav.process_batch(&empty_batch(), now + Duration::from_millis(1000));
    assert_eq!(speech.count("chair no longer detected"), 0);

    nav.process_batch(&empty_batch(), now + Duration::from_millis(2500));
    nav.process_batch(&empty_batch(), now + Duration::from_millis(3000));
    assert_eq!(speech.count("chair no longer detected"), 1);
}

#[test]
fn test_manual_describe_with_empty_snapshot() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);
    let now = finish_current(&mut nav, at(t0, 500));

    assert!(nav.describe_now(now));
    assert_eq!(speech.last().unwrap().text, "No objects detected in view");
}

#[test]
fn test_toggles_confirm_even_when_muted() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());

    assert!(!nav.toggle_speech(t0));
    assert_eq!(speech.last().unwrap().text, "Speech disabled");
    assert!(!nav.settings().speech_enabled);

    let now = finish_current(&mut nav, at(t0, 500));
    assert!(!nav.toggle_announce_all(now));
    assert_eq!(speech.last().unwrap().text, "Switched to closest object only mode");

    let now = finish_current(&mut nav, at(now, 500));
    assert_eq!(nav.cycle_verbosity(now), Verbosity::High);
    assert_eq!(speech.last().unwrap().text, "Verbosity level set to high");

    let now = finish_current(&mut nav, at(now, 500));
    assert_eq!(nav.cycle_verbosity(now), Verbosity::Low);
    assert_eq!(speech.last().unwrap().text, "Verbosity level set to low");
}

#[test]
fn test_muted_session_stays_silent_on_ticks() {
    let t0 = Instant::now();
    let mut muted = config();
    muted.guidance.speech_enabled = false;
    let (mut nav, speech) = navigator(&muted);

    nav.start(t0);
    let now = finish_current(&mut nav, at(t0, 500));
    nav.process_batch(&chair_batch(), now);

    assert_eq!(speech.texts(), vec![STARTED]);
}

#[test]
fn test_hidden_resets_speech() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);
    nav.say("one", Priority::Normal, t0);
    nav.say("two", Priority::Normal, t0);

    nav.set_hidden(true);

    assert!(nav.is_hidden());
    assert!(nav.scheduler().is_quiet());
    assert_eq!(speech.cancels(), 1);

    // Only the first transition resets
    nav.set_hidden(true);
    assert_eq!(speech.cancels(), 1);
}

#[test]
fn test_hiding_drops_readout_in_progress() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);
    let now = finish_current(&mut nav, at(t0, 100));

    nav.process_batch(&chair_batch(), now);
    let now = finish_current(&mut nav, now + Duration::from_millis(500));
    nav.process_batch(&chair_batch(), now);

    assert!(nav.describe_now(now));
    assert_eq!(speech.last().unwrap().text, "1 object detected.");
    assert_eq!(nav.policy().pending_announcements(), 1);

    nav.set_hidden(true);
    let spoken_before = speech.texts().len();

    assert_eq!(nav.policy().pending_announcements(), 0);
    assert!(!nav.policy().is_debounce_armed());
    assert!(nav.next_deadline().is_none());

    nav.poll(now + Duration::from_millis(1200));
    nav.poll(now + Duration::from_secs(10));
    assert_eq!(speech.texts().len(), spoken_before);
    assert_eq!(speech.count("chair ahead, 1.6 meters"), 0);
}

#[test]
fn test_stop_cancels_pending_readout() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);
    let now = finish_current(&mut nav, at(t0, 100));

    nav.process_batch(&chair_batch(), now);
    nav.process_batch(&chair_batch(), now + Duration::from_millis(500));
    assert!(nav.policy().is_debounce_armed());

    nav.stop(now + Duration::from_millis(600));

    assert!(!nav.is_navigating());
    assert!(nav.snapshot().is_empty());
    assert!(!nav.policy().is_debounce_armed());
    assert_eq!(speech.last().unwrap().text, "Navigation stopped.");

    let later = finish_current(&mut nav, now + Duration::from_secs(1));
    nav.poll(later + Duration::from_secs(10));
    assert_eq!(speech.last().unwrap().text, "Navigation stopped.");
}

#[test]
fn test_restart_clears_history() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());
    nav.start(t0);
    let now = finish_current(&mut nav, at(t0, 100));
    nav.process_batch(&chair_batch(), now);
    nav.stop(now + Duration::from_millis(100));

    let now = finish_current(&mut nav, at(t0, 5000));
    nav.start(now);
    assert!(nav.tracker().is_empty());

    let now = finish_current(&mut nav, now + Duration::from_millis(500));
    nav.process_batch(&chair_batch(), now);
    assert_eq!(speech.count("New chair detected ahead, 1.6 meters away"), 2);
}

#[test]
fn test_watchdog_resumes_queue() {
    let t0 = Instant::now();
    let (mut nav, speech) = navigator(&config());

    nav.say("stuck", Priority::Normal, t0);
    nav.say("next", Priority::Normal, t0);

    assert!(!nav.check_watchdog(at(t0, 5000)));
    assert!(nav.check_watchdog(at(t0, 10_001)));
    assert_eq!(speech.texts(), vec!["stuck", "next"]);
}
