//! Randomized record generators.
//!
//! Shapes are fixed, values are random within the documented ranges. Every
//! generator takes `now` explicitly so callers (and tests) control the clock.

use chrono::{DateTime, TimeDelta, Utc};
use rand::RngExt;
use rand::rngs::StdRng;

use crate::model::{
    Alert, AlertStatus, Batch, BatchStatus, Reading, Sensor, SensorStatus, SensorType, Valve,
    ValveStatus, ValveType, Vat, VatHistory, VatHistoryPoint, VatStatus,
};

pub const TEMPERATURE_RANGE: (f64, f64) = (25.0, 35.0);
pub const PH_RANGE: (f64, f64) = (3.5, 5.5);
pub const LIQUID_LEVEL_RANGE: (f64, f64) = (50.0, 100.0);
const FERMENTATION_HOURS_RANGE: (f64, f64) = (24.0, 120.0);
const AGAVE_AGE_RANGE: (f64, f64) = (6.0, 12.0);

pub const AGAVE_TYPES: [&str; 6] = [
    "Espadín",
    "Tobalá",
    "Cuishe",
    "Tepeztate",
    "Madrecuishe",
    "Jabalí",
];

/// Operator recorded on generated valve actions and read alerts.
const OPERATOR_ID: &str = "user-1";

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Uniform in `[min, max]`, rounded to one decimal.
pub fn random_value(rng: &mut StdRng, (min, max): (f64, f64)) -> f64 {
    (rng.random_range(min..=max) * 10.0).round() / 10.0
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

fn minutes_ago(rng: &mut StdRng, now: DateTime<Utc>, max_minutes: i64) -> DateTime<Utc> {
    now - TimeDelta::minutes(rng.random_range(0..=max_minutes))
}

/// `count` vats named `Tina 1..`, created some time in the past 30 days.
pub fn generate_vats(rng: &mut StdRng, count: usize, now: DateTime<Utc>) -> Vec<Vat> {
    (1..=count)
        .map(|n| {
            let created_at = now - TimeDelta::milliseconds(rng.random_range(0..=30 * MS_PER_DAY));
            Vat {
                id: format!("vat-{n}"),
                name: format!("Tina {n}"),
                capacity: rng.random_range(10..=30u32) * 100,
                status: *pick(rng, &VatStatus::ALL),
                agave_type: pick(rng, &AGAVE_TYPES).to_string(),
                agave_age: random_value(rng, AGAVE_AGE_RANGE),
                temperature: random_value(rng, TEMPERATURE_RANGE),
                ph: random_value(rng, PH_RANGE),
                liquid_level: random_value(rng, LIQUID_LEVEL_RANGE),
                fermentation_time: random_value(rng, FERMENTATION_HOURS_RANGE),
                created_at,
                last_updated: now,
            }
        })
        .collect()
}

/// One point per hour for `days * 24 + 1` hours, oldest first, the last one
/// at `now`. Points are independent draws; there is no smoothing.
pub fn generate_history(
    rng: &mut StdRng,
    vat_id: &str,
    days: u32,
    now: DateTime<Utc>,
) -> VatHistory {
    let hours = i64::from(days) * 24;
    let data = (0..=hours)
        .rev()
        .map(|ago| VatHistoryPoint {
            timestamp: now - TimeDelta::hours(ago),
            temperature: random_value(rng, TEMPERATURE_RANGE),
            ph: random_value(rng, PH_RANGE),
            liquid_level: random_value(rng, LIQUID_LEVEL_RANGE),
        })
        .collect();
    VatHistory {
        vat_id: vat_id.to_string(),
        data,
    }
}

/// One sensor per metric per vat.
pub fn generate_sensors(rng: &mut StdRng, vats: &[Vat], now: DateTime<Utc>) -> Vec<Sensor> {
    let mut sensors = Vec::with_capacity(vats.len() * SensorType::ALL.len());
    for vat in vats {
        for sensor_type in SensorType::ALL {
            // Mostly online, occasionally flaky.
            let status = match rng.random_range(0..10) {
                0 => SensorStatus::Disconnected,
                1 => SensorStatus::Updating,
                _ => SensorStatus::Connected,
            };
            sensors.push(Sensor {
                id: format!("sensor-{}-{}", vat.id, sensor_type.slug()),
                vat_id: vat.id.clone(),
                sensor_type,
                status,
                current_reading: random_value(rng, sensor_type.range()),
                last_reading_at: now - TimeDelta::seconds(rng.random_range(0..=60)),
            });
        }
    }
    sensors
}

/// One batch per vat that is not empty. Resting vats hold a finished batch.
pub fn generate_batches(rng: &mut StdRng, vats: &[Vat], now: DateTime<Utc>) -> Vec<Batch> {
    vats.iter()
        .filter(|vat| vat.status != VatStatus::Empty)
        .map(|vat| {
            let start_date = now - TimeDelta::hours(rng.random_range(24..=240));
            let (status, end_date) = if vat.status == VatStatus::Resting {
                let elapsed = (now - start_date).num_minutes();
                let end = start_date + TimeDelta::minutes(rng.random_range(1..=elapsed));
                (BatchStatus::Finished, Some(end))
            } else {
                (BatchStatus::InProgress, None)
            };
            Batch {
                id: format!("batch-{}", vat.id),
                vat_id: vat.id.clone(),
                agave_type: vat.agave_type.clone(),
                start_date,
                end_date,
                status,
                notes: format!("Lote de {} en {}", vat.agave_type, vat.name),
            }
        })
        .collect()
}

fn alert_message(sensor: &Sensor, vat: &Vat) -> String {
    match sensor.sensor_type {
        SensorType::Temperature => format!(
            "Temperatura fuera de rango en {}: {}°C",
            vat.name, sensor.current_reading
        ),
        SensorType::Ph => format!("pH fuera de rango en {}: {}", vat.name, sensor.current_reading),
        SensorType::Level => format!(
            "Nivel de líquido anormal en {}: {}%",
            vat.name, sensor.current_reading
        ),
    }
}

/// `count` alerts, each on a random vat and one of that vat's sensors.
/// Vats without sensors are never picked.
pub fn generate_alerts(
    rng: &mut StdRng,
    vats: &[Vat],
    sensors: &[Sensor],
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let candidates: Vec<&Vat> = vats
        .iter()
        .filter(|vat| sensors.iter().any(|s| s.vat_id == vat.id))
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    (1..=count)
        .map(|n| {
            let vat = *pick(rng, &candidates);
            let own: Vec<&Sensor> = sensors.iter().filter(|s| s.vat_id == vat.id).collect();
            let sensor = *pick(rng, &own);
            let created_at = minutes_ago(rng, now, 48 * 60);
            let (status, read_at, read_by) = if rng.random_range(0..2) == 0 {
                let read_at = created_at + TimeDelta::minutes(rng.random_range(1..=30));
                (
                    AlertStatus::Read,
                    Some(read_at.min(now)),
                    Some(OPERATOR_ID.to_string()),
                )
            } else {
                (AlertStatus::Unread, None, None)
            };
            Alert {
                id: format!("alert-{n}"),
                vat_id: vat.id.clone(),
                sensor_id: sensor.id.clone(),
                message: alert_message(sensor, vat),
                created_at,
                status,
                read_at,
                read_by,
            }
        })
        .collect()
}

/// A hot and a cold valve for every vat.
pub fn generate_valves(rng: &mut StdRng, vats: &[Vat], now: DateTime<Utc>) -> Vec<Valve> {
    let mut valves = Vec::with_capacity(vats.len() * 2);
    for vat in vats {
        for (valve_type, slug) in [(ValveType::Hot, "hot"), (ValveType::Cold, "cold")] {
            let status = if rng.random_range(0..2) == 0 {
                ValveStatus::Open
            } else {
                ValveStatus::Closed
            };
            valves.push(Valve {
                id: format!("valve-{}-{slug}", vat.id),
                vat_id: vat.id.clone(),
                valve_type,
                status,
                last_action_by: OPERATOR_ID.to_string(),
                last_action_at: minutes_ago(rng, now, 24 * 60),
            });
        }
    }
    valves
}

/// A fresh measurement from `sensor`, filling only the metric it measures.
pub fn generate_reading(rng: &mut StdRng, id: &str, sensor: &Sensor, now: DateTime<Utc>) -> Reading {
    let value = Some(random_value(rng, sensor.sensor_type.range()));
    let mut reading = Reading {
        id: id.to_string(),
        sensor_id: sensor.id.clone(),
        temperature: None,
        ph: None,
        liquid_level: None,
        timestamp: now,
    };
    match sensor.sensor_type {
        SensorType::Temperature => reading.temperature = value,
        SensorType::Ph => reading.ph = value,
        SensorType::Level => reading.liquid_level = value,
    }
    reading
}
