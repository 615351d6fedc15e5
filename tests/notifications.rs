//! Pattern subscription behavior through the public facade.

use emberdb::{Database, Error, ValueKind, ValueSnapshot};
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_hash_mutation_delivers_one_event_with_snapshot() {
    let db = Database::new();
    let sub = db.psubscribe(&[".*first.*"]).unwrap();

    db.hset("my first hash", "my key", "yo yo yo").unwrap();

    let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
    assert_eq!(event.kind, ValueKind::Hash);
    assert_eq!(event.key, "my first hash");
    assert_eq!(event.field.as_deref(), Some("my key"));
    match event.value {
        Some(ValueSnapshot::Hash(fields)) => {
            assert_eq!(fields.get("my key").map(String::as_str), Some("yo yo yo"));
        }
        other => panic!("unexpected snapshot: {other:?}"),
    }

    // Exactly one event for one mutation.
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn test_subscription_sees_multiple_patterns() {
    let db = Database::new();
    let sub = db.psubscribe(&["my first hash", ".*list.*"]).unwrap();

    db.rpush("a list", &["item 1", "item 2"]).unwrap();
    db.hset("my first hash", "my key", "yo yo yo").unwrap();

    let first = sub.recv_timeout(RECV_TIMEOUT).expect("list event");
    assert_eq!(first.key, "a list");
    match first.value {
        Some(ValueSnapshot::List(items)) => assert_eq!(items, ["item 1", "item 2"]),
        other => panic!("unexpected snapshot: {other:?}"),
    }

    let second = sub.recv_timeout(RECV_TIMEOUT).expect("hash event");
    assert_eq!(second.key, "my first hash");
    assert_eq!(second.kind, ValueKind::Hash);
}

#[test]
fn test_overlapping_patterns_deliver_once() {
    let db = Database::new();
    // Both patterns match the same key.
    let sub = db.psubscribe(&["^over", "lap$"]).unwrap();

    db.set("overlap", "v").unwrap();

    let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
    assert_eq!(event.key, "overlap");
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn test_non_matching_keys_are_silent() {
    let db = Database::new();
    let sub = db.psubscribe(&["^user:"]).unwrap();

    db.set("session:1", "v").unwrap();
    db.set("user:1", "alice").unwrap();

    let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
    assert_eq!(event.key, "user:1");
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn test_set_update_snapshot() {
    let db = Database::new();
    let sub = db.psubscribe(&["publish set"]).unwrap();

    db.sadd("publish set", &["hot", "doggie"]).unwrap();

    let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
    assert_eq!(event.kind, ValueKind::Set);
    match event.value {
        Some(ValueSnapshot::Set(mut members)) => {
            members.sort();
            assert_eq!(members, ["doggie", "hot"]);
        }
        other => panic!("unexpected snapshot: {other:?}"),
    }
}

#[test]
fn test_every_hash_event_carries_a_hash_snapshot() {
    let db = Database::new();
    let sub = db.psubscribe(&["^TestValidHash:"]).unwrap();

    db.hset("TestValidHash: set", "field", "value").unwrap();
    // Deleting a field from a hash that never existed still notifies,
    // with an empty hash snapshot.
    assert!(!db.hdel("TestValidHash: del", "field").unwrap());

    for _ in 0..2 {
        let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
        match event.value {
            Some(ValueSnapshot::Hash(_)) => {}
            other => panic!("hash event without hash snapshot: {other:?}"),
        }
    }
}

#[test]
fn test_concurrent_hash_writers_publish_in_mutation_order() {
    use std::sync::Arc;

    let db = Arc::new(Database::new());
    let sub = db.psubscribe(&["^contested$"]).unwrap();
    let barrier = db.psubscribe(&["^sentinel$"]).unwrap();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let db = Arc::clone(&db);
        handles.push(std::thread::spawn(move || {
            for i in 0..50 {
                db.hset("contested", "field", &format!("w{worker}-{i}"))
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    let final_value = db
        .hget("contested", "field")
        .unwrap()
        .expect("field must exist");

    db.set("sentinel", "done").unwrap();
    barrier.recv_timeout(RECV_TIMEOUT).expect("sentinel expected");

    // Events are published under the per-hash field lock, so the last
    // delivered snapshot must describe the hash's final state.
    let mut last = None;
    while let Some(event) = sub.try_recv() {
        last = Some(event);
    }
    match last.expect("events expected").value {
        Some(ValueSnapshot::Hash(fields)) => {
            assert_eq!(fields.get("field"), Some(&final_value));
        }
        other => panic!("unexpected snapshot: {other:?}"),
    }
}

#[test]
fn test_psubscribe_with_custom_matcher() {
    use emberdb::{KeyMatcher, PatternSet};

    struct Prefix(&'static str);
    impl KeyMatcher for Prefix {
        fn matches(&self, text: &str) -> bool {
            text.starts_with(self.0)
        }
    }

    let db = Database::new();
    let sub =
        db.psubscribe_matchers(PatternSet::from_matchers(vec![Box::new(Prefix("job:"))]));

    db.set("other", "v").unwrap();
    db.set("job:1", "queued").unwrap();

    let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
    assert_eq!(event.key, "job:1");
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn test_deletion_event_has_no_value() {
    let db = Database::new();
    db.rpush("doomed", &["a"]).unwrap();

    let sub = db.psubscribe(&["^doomed$"]).unwrap();
    db.del(&["doomed"]);

    let event = sub.recv_timeout(RECV_TIMEOUT).expect("event expected");
    assert_eq!(event.kind, ValueKind::List);
    assert_eq!(event.value, None);
}

#[test]
fn test_cancelled_subscription_stops_receiving() {
    let db = Database::new();
    let sub = db.psubscribe(&[".*"]).unwrap();

    db.set("before", "v").unwrap();
    assert!(sub.recv_timeout(RECV_TIMEOUT).is_some());

    sub.cancel();
    db.set("after", "v").unwrap();
    assert_eq!(sub.recv_timeout(Duration::from_millis(200)), None);
}

#[test]
fn test_bad_pattern_is_rejected() {
    let db = Database::new();
    assert!(matches!(
        db.psubscribe(&["(["]),
        Err(Error::Pattern { .. })
    ));
}

#[test]
fn test_slow_subscriber_drops_are_counted() {
    // Tiny delivery queue so an undrained subscriber overflows quickly.
    let db = Database::with_config(emberdb::Config {
        publish_queue_capacity: 64,
        delivery_queue_capacity: 4,
    });
    let slow = db.psubscribe(&["^flood"]).unwrap();
    let barrier = db.psubscribe(&["^sentinel$"]).unwrap();

    let total = 32u64;
    for i in 0..total {
        db.set(&format!("flood-{i}"), "v").unwrap();
    }
    // Events dispatch in publish order, so once the sentinel arrives every
    // flood event has been delivered or dropped.
    db.set("sentinel", "done").unwrap();
    barrier.recv_timeout(RECV_TIMEOUT).expect("sentinel expected");

    let mut received = 0u64;
    while slow.try_recv().is_some() {
        received += 1;
    }
    assert_eq!(received + slow.dropped_events(), total);
    assert!(slow.dropped_events() > 0, "queue of 4 must have overflowed");
}

#[test]
fn test_shutdown_closes_subscriptions() {
    let db = Database::new();
    let sub = db.psubscribe(&[".*"]).unwrap();

    db.shutdown();
    assert!(matches!(sub.recv(), Err(Error::BusClosed)));
}
