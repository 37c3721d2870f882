//! End-to-end session flows against an on-disk SQLite store.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::TimeDelta;
use satchel_config::{RotationPolicy, SessionConfig};
use satchel_session::{SessionDriver, SessionLifecycle, WriteOutcome, codec};
use satchel_store::LookupField;
use satchel_types::{CookieJar, ManualClock, SequenceIdGenerator, StaticRequest};
use serde_json::json;
use tempfile::TempDir;

fn config(dir: &TempDir) -> SessionConfig {
    let path = dir.path().join("sessions.db");
    SessionConfig::new("web_sessions")
        .with_database("main", path.to_string_lossy())
        .with_gc_probability(0)
        .with_rotation(RotationPolicy::EveryWrite)
}

fn request() -> StaticRequest {
    StaticRequest::new("203.0.113.7", "Mozilla/5.0").with_real_ip("198.51.100.2")
}

#[test]
fn test_session_survives_driver_restart() {
    let dir = TempDir::new().unwrap();
    let req = request();

    let token = {
        let driver = SessionDriver::open(config(&dir)).unwrap();
        let jar = CookieJar::empty();
        let mut session = driver.start(&jar, &req);
        session.read(false).unwrap();
        session.set("user_id", 7);
        session.write().unwrap();
        jar.sent().unwrap()
    };

    let driver = SessionDriver::open(config(&dir)).unwrap();
    let jar = CookieJar::presenting(token.clone());
    let mut session = driver.start(&jar, &req);
    session.read(false).unwrap();
    assert_eq!(session.session_id(), Some(token.as_str()));
    assert_eq!(session.get("user_id"), Some(&json!(7)));
}

#[test]
fn test_rotation_chain_on_disk() {
    let dir = TempDir::new().unwrap();
    let ids = Arc::new(SequenceIdGenerator::new(["t1", "t2", "t3"]));
    let driver = SessionDriver::open(config(&dir))
        .unwrap()
        .with_id_generator(ids);
    let req = request();

    let jar = CookieJar::empty();
    let mut session = driver.start(&jar, &req);
    session.create().unwrap();
    session.write().unwrap();
    session.write().unwrap();

    let store = driver.store();
    assert_eq!(store.count().unwrap(), 1);
    let record = store
        .find_one_by(LookupField::SessionId, "t3")
        .unwrap()
        .unwrap();
    assert_eq!(record.previous_id, "t2");
    // only the most recent predecessor is remembered
    assert!(store.find_one_by(LookupField::PreviousId, "t1").unwrap().is_none());
}

#[test]
fn test_expired_rows_swept_by_driver_gc() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());
    let driver = SessionDriver::open(config(&dir))
        .unwrap()
        .with_clock(clock.clone());
    let req = request();

    for _ in 0..3 {
        let jar = CookieJar::empty();
        driver.start(&jar, &req).create().unwrap();
    }
    clock.advance(TimeDelta::hours(3));
    let jar = CookieJar::empty();
    driver.start(&jar, &req).create().unwrap();

    let now = driver.now();
    assert_eq!(driver.store().count_updated_before(driver.gc().threshold(now)).unwrap(), 3);
    assert_eq!(driver.gc().sweep(now).unwrap(), 3);
    assert_eq!(driver.store().count().unwrap(), 1);
}

#[test]
fn test_racing_requests_single_winner() {
    const WRITERS: usize = 6;

    let dir = TempDir::new().unwrap();
    let driver = Arc::new(SessionDriver::open(config(&dir)).unwrap());
    let req = request();

    let jar = CookieJar::empty();
    driver.start(&jar, &req).create().unwrap();
    let token = jar.sent().unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let driver = Arc::clone(&driver);
            let barrier = Arc::clone(&barrier);
            let token = token.clone();
            thread::spawn(move || {
                let req = request();
                let jar = CookieJar::presenting(token);
                let mut session = driver.start(&jar, &req);
                session.read(false).unwrap();
                session.set("writer", i as u64);
                barrier.wait();
                let outcome = session.write().unwrap();
                (i, outcome, jar.sent())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results
        .iter()
        .filter(|(_, outcome, _)| matches!(outcome, WriteOutcome::Written { .. }))
        .collect();
    assert_eq!(winners.len(), 1);

    let (winner, _, cookie) = winners[0];
    for (_, outcome, sent) in &results {
        if !matches!(outcome, WriteOutcome::Written { .. }) {
            assert_eq!(*outcome, WriteOutcome::Conflict);
            assert!(sent.is_none());
        }
    }

    let new_token = cookie.clone().unwrap();
    let record = driver
        .store()
        .find_one_by(LookupField::SessionId, &new_token)
        .unwrap()
        .unwrap();
    assert_eq!(record.previous_id, token);
    let (data, _) = codec::decode(&record.payload).unwrap();
    assert_eq!(data.get("writer"), Some(&json!(*winner as u64)));
}

#[test]
fn test_racing_requests_without_rotation_single_winner() {
    const WRITERS: usize = 6;

    let dir = TempDir::new().unwrap();
    let driver = Arc::new(
        SessionDriver::open(config(&dir).with_rotation(RotationPolicy::Never)).unwrap(),
    );
    let req = request();

    let jar = CookieJar::empty();
    driver.start(&jar, &req).create().unwrap();
    let token = jar.sent().unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let driver = Arc::clone(&driver);
            let barrier = Arc::clone(&barrier);
            let token = token.clone();
            thread::spawn(move || {
                let req = request();
                let jar = CookieJar::presenting(token);
                let mut session = driver.start(&jar, &req);
                session.read(false).unwrap();
                session.set(format!("key-{i}"), i as u64);
                barrier.wait();
                (i, session.write().unwrap())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results
        .iter()
        .filter(|(_, outcome)| *outcome == WriteOutcome::Written { rotated: false })
        .map(|(i, _)| *i)
        .collect();
    assert_eq!(winners.len(), 1);
    assert!(
        results
            .iter()
            .filter(|(i, _)| *i != winners[0])
            .all(|(_, outcome)| *outcome == WriteOutcome::Conflict)
    );

    let record = driver
        .store()
        .find_one_by(LookupField::SessionId, &token)
        .unwrap()
        .unwrap();
    let (data, _) = codec::decode(&record.payload).unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data.get(&format!("key-{}", winners[0])), Some(&json!(winners[0] as u64)));
}
