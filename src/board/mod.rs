//! The dashboard's view of the vats, kept current by pushed updates.
//!
//! A [`VatBoard`] holds the last known record for every vat. Pushed
//! partial records are merged by id; fields missing from a patch keep their
//! old value. Patches for vats the board has never seen are ignored.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::consts::{ALL_VATS_UPDATE_EVENT, CONNECTION_STATUS_EVENT, vat_update_event};
use crate::events::{EventBus, Subscription, callback};
use crate::model::{Vat, VatPatch};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VatBoard {
    vats: Vec<Vat>,
}

impl VatBoard {
    /// Board seeded with the initial vat list.
    pub fn new(vats: Vec<Vat>) -> Self {
        Self { vats }
    }

    /// Vats in their original order.
    pub fn vats(&self) -> &[Vat] {
        &self.vats
    }

    /// Look up a vat by id.
    pub fn get(&self, vat_id: &str) -> Option<&Vat> {
        self.vats.iter().find(|v| v.id == vat_id)
    }

    /// Merge one patch. Returns `false` for an unknown id.
    pub fn apply_one(&mut self, patch: &VatPatch, now: DateTime<Utc>) -> bool {
        match self.vats.iter_mut().find(|v| v.id == patch.id) {
            Some(vat) => {
                *vat = vat.merged(patch, now);
                true
            }
            None => {
                tracing::debug!(vat_id = %patch.id, "update for unknown vat ignored");
                false
            }
        }
    }

    /// Merge a batch of patches. Returns how many matched a vat.
    pub fn apply_all(&mut self, patches: &[VatPatch], now: DateTime<Utc>) -> usize {
        patches
            .iter()
            .filter(|patch| self.apply_one(patch, now))
            .count()
    }

    /// Subscribe `board` to the bulk update and to each of its vats' own
    /// update events. Drop the returned subscriptions to detach.
    pub fn attach(board: &Arc<Mutex<VatBoard>>, bus: &Arc<EventBus>) -> Vec<Subscription> {
        let mut subscriptions = Vec::new();

        let all_board = Arc::clone(board);
        subscriptions.push(bus.subscribe_scoped(
            ALL_VATS_UPDATE_EVENT,
            callback(move |payload| match parse::<Vec<VatPatch>>(payload) {
                Some(patches) => {
                    lock(&all_board).apply_all(&patches, Utc::now());
                }
                None => tracing::warn!("ignoring malformed {ALL_VATS_UPDATE_EVENT} payload"),
            }),
        ));

        let ids: Vec<String> = lock(board).vats.iter().map(|v| v.id.clone()).collect();
        for id in ids {
            let event = vat_update_event(&id);
            let one_board = Arc::clone(board);
            subscriptions.push(bus.subscribe_scoped(
                &event,
                callback(move |payload| match parse::<VatPatch>(payload) {
                    // A per-vat event only ever updates its own vat.
                    Some(patch) if patch.id == id => {
                        lock(&one_board).apply_one(&patch, Utc::now());
                    }
                    Some(patch) => {
                        tracing::warn!(expected = %id, got = %patch.id, "vat update under the wrong event")
                    }
                    None => tracing::warn!(vat_id = %id, "ignoring malformed vat update"),
                }),
            ));
        }

        subscriptions
    }
}

fn parse<T: serde::de::DeserializeOwned>(payload: &Value) -> Option<T> {
    T::deserialize(payload).ok()
}

fn lock(board: &Mutex<VatBoard>) -> MutexGuard<'_, VatBoard> {
    match board.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Tracks the last `connection:status` seen on the bus.
#[derive(Debug, Clone, Default)]
pub struct ConnectionIndicator {
    connected: Arc<AtomicBool>,
}

impl ConnectionIndicator {
    /// Follow `connection:status` on `bus` for as long as the guard lives.
    pub fn attach(&self, bus: &Arc<EventBus>) -> Subscription {
        let connected = Arc::clone(&self.connected);
        bus.subscribe_scoped(
            CONNECTION_STATUS_EVENT,
            callback(move |payload| {
                if let Some(flag) = payload.get("connected").and_then(Value::as_bool) {
                    connected.store(flag, Ordering::SeqCst);
                }
            }),
        )
    }

    /// Last reported link state; `false` until the first event.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::generate::generate_vats;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 30, 0).unwrap()
    }

    fn board() -> VatBoard {
        VatBoard::new(generate_vats(&mut StdRng::seed_from_u64(2), 3, now()))
    }

    #[test]
    fn apply_one_merges_by_id() {
        let mut board = board();
        let before = board.get("vat-2").unwrap().clone();
        let later = now() + chrono::TimeDelta::seconds(30);
        let patch = VatPatch {
            liquid_level: Some(61.0),
            ..VatPatch::new("vat-2")
        };

        assert!(board.apply_one(&patch, later));

        let after = board.get("vat-2").unwrap();
        assert_eq!(after.liquid_level, 61.0);
        assert_eq!(after.temperature, before.temperature);
        assert_eq!(after.last_updated, later);
        assert_eq!(board.get("vat-1").unwrap().last_updated, now());
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut board = board();
        let snapshot = board.clone();
        assert!(!board.apply_one(&VatPatch::new("vat-77"), now()));
        assert_eq!(board, snapshot);
    }

    #[test]
    fn apply_all_counts_matches() {
        let mut board = board();
        let patches = vec![
            VatPatch {
                temperature: Some(33.3),
                ..VatPatch::new("vat-1")
            },
            VatPatch::new("ghost"),
            VatPatch {
                temperature: Some(26.0),
                ..VatPatch::new("vat-3")
            },
        ];
        assert_eq!(board.apply_all(&patches, now()), 2);
        assert_eq!(board.get("vat-1").unwrap().temperature, 33.3);
        assert_eq!(board.get("vat-3").unwrap().temperature, 26.0);
    }

    #[test]
    fn attached_board_follows_bus_until_detached() {
        let bus = Arc::new(EventBus::new());
        let shared = Arc::new(Mutex::new(board()));
        let subs = VatBoard::attach(&shared, &bus);
        assert_eq!(subs.len(), 4);

        bus.publish("vat:all:update", &json!([{ "id": "vat-1", "temperature": 30.5 }]));
        bus.publish("vat:vat-2:update", &json!({ "id": "vat-2", "pH": 4.4 }));
        {
            let board = shared.lock().unwrap();
            assert_eq!(board.get("vat-1").unwrap().temperature, 30.5);
            assert_eq!(board.get("vat-2").unwrap().ph, 4.4);
        }

        drop(subs);
        assert_eq!(bus.subscriber_count("vat:all:update"), 0);
        bus.publish("vat:all:update", &json!([{ "id": "vat-1", "temperature": 25.0 }]));
        assert_eq!(shared.lock().unwrap().get("vat-1").unwrap().temperature, 30.5);
    }

    #[test]
    fn malformed_and_misrouted_payloads_are_ignored() {
        let bus = Arc::new(EventBus::new());
        let shared = Arc::new(Mutex::new(board()));
        let _subs = VatBoard::attach(&shared, &bus);
        let before = shared.lock().unwrap().clone();

        bus.publish("vat:all:update", &json!({ "id": "vat-1" }));
        bus.publish("vat:vat-1:update", &json!("hot"));
        bus.publish("vat:vat-1:update", &json!({ "id": "vat-2", "temperature": 34.0 }));

        assert_eq!(*shared.lock().unwrap(), before);
    }

    #[test]
    fn indicator_tracks_status_events() {
        let bus = Arc::new(EventBus::new());
        let indicator = ConnectionIndicator::default();
        let _sub = indicator.attach(&bus);
        assert!(!indicator.is_connected());

        bus.publish("connection:status", &json!({ "connected": true }));
        assert!(indicator.is_connected());

        bus.publish("connection:status", &json!({ "connected": false }));
        assert!(!indicator.is_connected());
    }
}
