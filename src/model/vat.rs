use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process stage a vat is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VatStatus {
    #[serde(rename = "fermentando")]
    Fermenting,
    #[serde(rename = "destilando")]
    Distilling,
    #[serde(rename = "reposando")]
    Resting,
    #[serde(rename = "vacio")]
    Empty,
}

impl VatStatus {
    pub const ALL: [VatStatus; 4] = [
        VatStatus::Fermenting,
        VatStatus::Distilling,
        VatStatus::Resting,
        VatStatus::Empty,
    ];
}

/// A fermentation vessel and its latest telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vat {
    pub id: String,
    pub name: String,
    /// Liters.
    pub capacity: u32,
    pub status: VatStatus,
    pub agave_type: String,
    /// Years the agave grew before harvest.
    pub agave_age: f64,
    /// °C.
    pub temperature: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    /// Percent of capacity.
    pub liquid_level: f64,
    /// Hours.
    pub fermentation_time: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// A partial vat record as pushed over the wire. Only `id` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VatStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agave_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agave_age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, rename = "pH", skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fermentation_time: Option<f64>,
}

impl VatPatch {
    /// Patch that names the vat and changes nothing.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl Vat {
    /// Return a copy with every field present in `patch` replaced and
    /// `last_updated` stamped with `now`. The caller matches ids.
    pub fn merged(&self, patch: &VatPatch, now: DateTime<Utc>) -> Vat {
        let mut vat = self.clone();
        if let Some(name) = &patch.name {
            vat.name = name.clone();
        }
        if let Some(capacity) = patch.capacity {
            vat.capacity = capacity;
        }
        if let Some(status) = patch.status {
            vat.status = status;
        }
        if let Some(agave_type) = &patch.agave_type {
            vat.agave_type = agave_type.clone();
        }
        if let Some(agave_age) = patch.agave_age {
            vat.agave_age = agave_age;
        }
        if let Some(temperature) = patch.temperature {
            vat.temperature = temperature;
        }
        if let Some(ph) = patch.ph {
            vat.ph = ph;
        }
        if let Some(liquid_level) = patch.liquid_level {
            vat.liquid_level = liquid_level;
        }
        if let Some(fermentation_time) = patch.fermentation_time {
            vat.fermentation_time = fermentation_time;
        }
        vat.last_updated = now;
        vat
    }
}

/// One hourly sample in a vat's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatHistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub liquid_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatHistory {
    pub vat_id: String,
    pub data: Vec<VatHistoryPoint>,
}
