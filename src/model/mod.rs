//! Plain value records describing the distillery floor.
//!
//! Every record has a stable `id`; everything except [`Vat`] points back at
//! its vat through `vat_id`. Records are never mutated in place.

pub mod vat;

pub use vat::{Vat, VatHistory, VatHistoryPoint, VatPatch, VatStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    #[serde(rename = "temperatura")]
    Temperature,
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "nivel")]
    Level,
}

impl SensorType {
    pub const ALL: [SensorType; 3] = [SensorType::Temperature, SensorType::Ph, SensorType::Level];

    /// Short slug used in generated ids.
    pub fn slug(self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Ph => "ph",
            SensorType::Level => "level",
        }
    }

    /// Inclusive range of plausible readings.
    pub fn range(self) -> (f64, f64) {
        match self {
            SensorType::Temperature => (25.0, 35.0),
            SensorType::Ph => (3.5, 5.5),
            SensorType::Level => (50.0, 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    #[serde(rename = "conectado")]
    Connected,
    #[serde(rename = "desconectado")]
    Disconnected,
    #[serde(rename = "actualizando")]
    Updating,
}

/// A logical measurement source attached to a vat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: String,
    pub vat_id: String,
    pub sensor_type: SensorType,
    pub status: SensorStatus,
    pub current_reading: f64,
    pub last_reading_at: DateTime<Utc>,
}

/// A single timestamped measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: String,
    pub sensor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, rename = "pH", skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid_level: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    #[serde(rename = "finalizado")]
    Finished,
    #[serde(rename = "en_proceso")]
    InProgress,
}

/// One fermentation/distillation run in a vat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub vat_id: String,
    pub agave_type: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: BatchStatus,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    #[serde(rename = "leida")]
    Read,
    #[serde(rename = "no_leida")]
    Unread,
}

/// A notification about a vat, raised by one of its sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub vat_id: String,
    pub sensor_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub read_at: Option<DateTime<Utc>>,
    /// User id of whoever read it.
    pub read_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValveType {
    #[serde(rename = "caliente")]
    Hot,
    #[serde(rename = "frio")]
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValveStatus {
    #[serde(rename = "abierto")]
    Open,
    #[serde(rename = "cerrado")]
    Closed,
}

/// A hot or cold water valve on a vat's jacket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valve {
    pub id: String,
    pub vat_id: String,
    pub valve_type: ValveType,
    pub status: ValveStatus,
    pub last_action_by: String,
    pub last_action_at: DateTime<Utc>,
}

/// Fan-in of a vat's sensors' current values. A metric is `None` when the
/// vat has no sensor for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestReadings {
    pub temperature: Option<f64>,
    #[serde(rename = "pH")]
    pub ph: Option<f64>,
    pub liquid_level: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_types_use_wire_names() {
        let names: Vec<String> = SensorType::ALL
            .iter()
            .map(|t| serde_json::to_string(t).unwrap())
            .collect();
        assert_eq!(names, vec!["\"temperatura\"", "\"pH\"", "\"nivel\""]);
    }

    #[test]
    fn sensor_ranges_are_ordered() {
        for sensor_type in SensorType::ALL {
            let (min, max) = sensor_type.range();
            assert!(min < max);
        }
    }

    #[test]
    fn reading_omits_absent_metrics() {
        let reading = Reading {
            id: "r-1".to_string(),
            sensor_id: "sensor-vat-1-ph".to_string(),
            temperature: None,
            ph: Some(4.1),
            liquid_level: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["pH"], 4.1);
        assert!(json.get("temperature").is_none());
        assert_eq!(json["sensorId"], "sensor-vat-1-ph");
    }

    #[test]
    fn batch_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&BatchStatus::InProgress).unwrap(),
            "\"en_proceso\""
        );
    }

    #[test]
    fn alert_status_wire_names() {
        let status: AlertStatus = serde_json::from_str("\"no_leida\"").unwrap();
        assert_eq!(status, AlertStatus::Unread);
    }
}
