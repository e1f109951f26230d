use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use mezcal_monitor::codec;
use mezcal_monitor::events::{Callback, EventBus, callback};

fn recorder() -> (Callback, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cb = callback(move |payload| sink.lock().unwrap().push(payload.clone()));
    (cb, seen)
}

#[test]
fn subscribe_publish_unsubscribe_cycle() {
    let bus = EventBus::new();
    let (f, seen) = recorder();

    bus.subscribe("vat:v1:update", Arc::clone(&f));
    bus.publish("vat:v1:update", &json!({ "id": "v1", "temperature": 30 }));
    assert_eq!(*seen.lock().unwrap(), vec![json!({ "id": "v1", "temperature": 30 })]);

    assert_eq!(bus.unsubscribe("vat:v1:update", &f), 1);
    bus.publish("vat:v1:update", &json!({ "id": "v1", "temperature": 31 }));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn unknown_event_frame_is_silently_dropped() {
    let bus = EventBus::new();
    let (f, seen) = recorder();
    bus.subscribe("vat:all:update", f);

    assert!(codec::dispatch(&bus, r#"{"type":"nobody:listens","payload":1}"#));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn malformed_frames_never_reach_subscribers() {
    let bus = EventBus::new();
    let (f, seen) = recorder();
    bus.subscribe("vat:all:update", f);

    for frame in ["not-json", "{\"payload\":[]}", "[1,2,3]", ""] {
        assert!(!codec::dispatch(&bus, frame), "accepted {frame:?}");
    }
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn failing_subscriber_is_isolated() {
    let bus = EventBus::new();
    let (good, seen) = recorder();
    bus.subscribe("connection:status", callback(|_| panic!("subscriber bug")));
    bus.subscribe("connection:status", good);

    let delivered = bus.publish("connection:status", &json!({ "connected": true }));

    assert_eq!(delivered, 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn scoped_subscription_detaches_on_drop() {
    let bus = Arc::new(EventBus::new());
    let (f, seen) = recorder();
    {
        let _sub = bus.subscribe_scoped("vat:all:update", f);
        bus.publish("vat:all:update", &json!([]));
    }
    bus.publish("vat:all:update", &json!([]));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(bus.subscriber_count("vat:all:update"), 0);
}

fn labelled(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> Callback {
    let log = Arc::clone(log);
    callback(move |_| log.lock().unwrap().push(label))
}

#[test]
fn delivery_is_subscribed_minus_unsubscribed_in_order() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let [a, b, c, d] = ["a", "b", "c", "d"].map(|label| labelled(&log, label));
    for cb in [&a, &b, &c, &d] {
        bus.subscribe("vat:all:update", Arc::clone(cb));
    }

    assert_eq!(bus.unsubscribe("vat:all:update", &d), 1);
    assert_eq!(bus.unsubscribe("vat:all:update", &b), 1);
    bus.publish("vat:all:update", &json!([]));

    assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
}

#[test]
fn resubscribed_callback_moves_to_the_end() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let [a, b, c] = ["a", "b", "c"].map(|label| labelled(&log, label));
    for cb in [&a, &b, &c] {
        bus.subscribe("vat:v1:update", Arc::clone(cb));
    }

    bus.unsubscribe("vat:v1:update", &a);
    bus.subscribe("vat:v1:update", Arc::clone(&a));
    bus.publish("vat:v1:update", &json!({ "id": "v1" }));

    assert_eq!(*log.lock().unwrap(), vec!["b", "c", "a"]);
}
