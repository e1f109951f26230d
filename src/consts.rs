//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Sensor gateway address used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080";

/// Fixed delay before every reconnect attempt. There is no backoff growth.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// How often the simulator pushes a fresh round of readings.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Latency the mock data source pretends a backend round trip takes.
pub const DEFAULT_FEED_LATENCY: Duration = Duration::from_millis(800);

/// Number of vats the mock feed produces by default.
pub const DEFAULT_VAT_COUNT: usize = 6;

/// Days of hourly history shown on the vat detail view.
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

/// Reserved event carrying `{"connected": bool}` on every link transition.
pub const CONNECTION_STATUS_EVENT: &str = "connection:status";

/// Event carrying an array of partial vat records.
pub const ALL_VATS_UPDATE_EVENT: &str = "vat:all:update";

/// Event name for updates to a single vat.
pub fn vat_update_event(vat_id: &str) -> String {
    format!("vat:{vat_id}:update")
}

/// Default config path: `~/.mezcal/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".mezcal").join("config.json"))
}
