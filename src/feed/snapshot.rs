use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::generate::{
    generate_alerts, generate_batches, generate_reading, generate_sensors, generate_valves,
    generate_vats,
};
use crate::model::{
    Alert, AlertStatus, Batch, LatestReadings, Reading, Sensor, SensorType, Valve, Vat,
};

/// A consistent set of records: every foreign key points at a vat in `vats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub vats: Vec<Vat>,
    pub sensors: Vec<Sensor>,
    pub batches: Vec<Batch>,
    pub alerts: Vec<Alert>,
    pub valves: Vec<Valve>,
}

impl FeedSnapshot {
    /// Generate vats and every record that hangs off them.
    pub fn generate(
        rng: &mut StdRng,
        vat_count: usize,
        alert_count: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let vats = generate_vats(rng, vat_count, now);
        let sensors = generate_sensors(rng, &vats, now);
        let batches = generate_batches(rng, &vats, now);
        let alerts = generate_alerts(rng, &vats, &sensors, alert_count, now);
        let valves = generate_valves(rng, &vats, now);
        Self {
            vats,
            sensors,
            batches,
            alerts,
            valves,
        }
    }

    /// Look up a vat by id.
    pub fn vat(&self, vat_id: &str) -> Option<&Vat> {
        self.vats.iter().find(|v| v.id == vat_id)
    }

    /// The vat's sensors.
    pub fn sensors_for(&self, vat_id: &str) -> Vec<&Sensor> {
        self.sensors.iter().filter(|s| s.vat_id == vat_id).collect()
    }

    /// The vat's hot and cold valves.
    pub fn valves_for(&self, vat_id: &str) -> Vec<&Valve> {
        self.valves.iter().filter(|v| v.vat_id == vat_id).collect()
    }

    /// Alerts raised on the vat, read or not.
    pub fn alerts_for(&self, vat_id: &str) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| a.vat_id == vat_id).collect()
    }

    /// Alerts nobody has read yet, across all vats.
    pub fn unread_alerts(&self) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Unread)
            .collect()
    }

    /// First batch recorded for the vat.
    pub fn batch_for(&self, vat_id: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.vat_id == vat_id)
    }

    /// Current value of each of the vat's sensors. When a vat has two sensors
    /// of one type the first one listed wins.
    pub fn latest_readings(&self, vat_id: &str) -> LatestReadings {
        let mut latest = LatestReadings::default();
        for sensor in self.sensors.iter().filter(|s| s.vat_id == vat_id) {
            let slot = match sensor.sensor_type {
                SensorType::Temperature => &mut latest.temperature,
                SensorType::Ph => &mut latest.ph,
                SensorType::Level => &mut latest.liquid_level,
            };
            slot.get_or_insert(sensor.current_reading);
        }
        latest
    }

    /// Wall-clock hours since the vat's batch started, or `None` for a vat
    /// without a batch.
    pub fn fermentation_hours(&self, vat_id: &str, now: DateTime<Utc>) -> Option<f64> {
        self.batch_for(vat_id)
            .map(|batch| (now - batch.start_date).num_seconds() as f64 / 3600.0)
    }

    /// One fresh reading per sensor, ids `reading-1..`.
    pub fn sample_readings(&self, rng: &mut StdRng, now: DateTime<Utc>) -> Vec<Reading> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, sensor)| generate_reading(rng, &format!("reading-{}", i + 1), sensor, now))
            .collect()
    }
}
