//! Object identity tracker integration tests

use std::time::Instant;

use pathsense::detection::classify_batch;
use pathsense::{ObjectTracker, Position};

mod common;

use common::{at, chair_batch, object};

#[test]
fn test_chair_scenario_classification() {
    let t0 = Instant::now();
    let objects = classify_batch(&chair_batch(), 0.60, t0);

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].position, Position::Ahead);
    assert!((objects[0].distance - 1.6).abs() < 1e-9);
    assert_eq!(objects[0].identity_key, "chair-ahead-1");
    assert_eq!(
        pathsense::Priority::for_distance(objects[0].distance),
        pathsense::Priority::Medium
    );
}

#[test]
fn test_grace_window_then_single_vanish() {
    let t0 = Instant::now();
    let mut tracker = ObjectTracker::new();

    // Present for 10 ticks, last seen at t0 + 4500
    for tick in 0..10 {
        let now = at(t0, tick * 500);
        let update = tracker.update(&[object("chair", Position::Ahead, 1.6, now)], now);
        assert_eq!(update.newly_appeared.len(), usize::from(tick == 0));
    }

    // Absent 500 ms later: still inside the grace window
    let update = tracker.update(&[], at(t0, 5000));
    assert!(update.vanished.is_empty());
    assert!(tracker.get("chair-ahead-1").is_some());

    // Exactly at the grace boundary the entry is retained
    let update = tracker.update(&[], at(t0, 6500));
    assert!(update.vanished.is_empty());

    // Past it: evicted and reported once
    let update = tracker.update(&[], at(t0, 6501));
    assert_eq!(update.vanished.len(), 1);
    assert!(update.vanished[0].is_notable());
    assert!(tracker.is_empty());

    let update = tracker.update(&[], at(t0, 7000));
    assert!(update.vanished.is_empty());
}

#[test]
fn test_brief_object_vanish_is_not_notable() {
    let t0 = Instant::now();
    let mut tracker = ObjectTracker::new();

    tracker.update(&[object("dog", Position::Left, 2.2, t0)], t0);
    let update = tracker.update(&[], at(t0, 2500));

    assert_eq!(update.vanished.len(), 1);
    assert!(!update.vanished[0].is_notable());
}

#[test]
fn test_far_vanish_is_not_notable() {
    let t0 = Instant::now();
    let mut tracker = ObjectTracker::new();

    for tick in 0..8 {
        let now = at(t0, tick * 500);
        tracker.update(&[object("car", Position::Right, 4.5, now)], now);
    }
    let update = tracker.update(&[], at(t0, 6000));

    assert_eq!(update.vanished.len(), 1);
    assert!(!update.vanished[0].is_notable());
}

#[test]
fn test_same_bucket_collapses_to_one_identity() {
    let t0 = Instant::now();
    let mut tracker = ObjectTracker::new();

    let update = tracker.update(
        &[
            object("person", Position::Ahead, 2.1, t0),
            object("person", Position::Ahead, 2.8, t0),
        ],
        t0,
    );

    assert_eq!(update.newly_appeared.len(), 1);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_crossing_meter_boundary_is_a_new_identity() {
    let t0 = Instant::now();
    let mut tracker = ObjectTracker::new();

    tracker.update(&[object("chair", Position::Ahead, 1.9, t0)], t0);
    let update = tracker.update(&[object("chair", Position::Ahead, 2.1, at(t0, 500))], at(t0, 500));

    assert_eq!(update.newly_appeared.len(), 1);
    assert_eq!(update.newly_appeared[0].identity_key, "chair-ahead-2");
    // The old identity lingers until its grace window runs out
    assert!(tracker.get("chair-ahead-1").is_some());
    assert_eq!(tracker.len(), 2);
}

#[test]
fn test_vanished_sorted_oldest_first() {
    let t0 = Instant::now();
    let mut tracker = ObjectTracker::new();

    tracker.update(&[object("bench", Position::Left, 2.0, t0)], t0);
    tracker.update(
        &[
            object("bench", Position::Left, 2.0, at(t0, 500)),
            object("lamp", Position::Right, 2.0, at(t0, 500)),
        ],
        at(t0, 500),
    );

    let update = tracker.update(&[], at(t0, 3000));
    let labels: Vec<&str> = update.vanished.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, vec!["bench", "lamp"]);
}
