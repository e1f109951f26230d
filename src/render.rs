//! Terminal rendering: startup banner, vat cards, status badges, history.

use std::fmt::Write;

use crate::consts::{AUTHOR, REPO};
use crate::model::{VatHistory, Vat, VatStatus};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub endpoint: &'a str,
    pub reconnect_ms: u64,
    pub source: &'a str,
}

/// Print the startup banner.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║         M E Z C A L   M O N           ║
   ║      tinas, sensores y alambiques     ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   repo      {}
   endpoint  {}
   retry     every {} ms
   source    {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        REPO,
        info.endpoint,
        info.reconnect_ms,
        info.source,
    );
}

/// Label shown on a vat's status badge.
pub fn status_badge(status: VatStatus) -> &'static str {
    match status {
        VatStatus::Fermenting => "Fermentando",
        VatStatus::Distilling => "Destilando",
        VatStatus::Resting => "Reposando",
        VatStatus::Empty => "Disponible",
    }
}

/// Label for the gateway link indicator.
pub fn connection_badge(connected: bool) -> &'static str {
    if connected {
        "● Sensores conectados"
    } else {
        "○ Sensores desconectados"
    }
}

/// A vat card. `fermentation_hours` overrides the vat's own counter when the
/// batch start is known.
pub fn vat_card(vat: &Vat, fermentation_hours: Option<f64>) -> String {
    let hours = fermentation_hours.unwrap_or(vat.fermentation_time);
    let mut card = String::new();
    let _ = writeln!(card, "┌ {:<20} [{}]", vat.name, status_badge(vat.status));
    let _ = writeln!(
        card,
        "│ {:>5.1}°C   pH {:>4.1}   {:>5.1}%   {:>6.1}h",
        vat.temperature, vat.ph, vat.liquid_level, hours
    );
    let _ = writeln!(
        card,
        "│ Agave: {} ({} años)   {} L",
        vat.agave_type, vat.agave_age, vat.capacity
    );
    let _ = write!(
        card,
        "└ Actualizado: {}",
        vat.last_updated.format("%H:%M:%S")
    );
    card
}

/// Tabulate a history, keeping every `every_nth` point plus the latest one.
pub fn history_table(history: &VatHistory, every_nth: usize) -> String {
    let step = every_nth.max(1);
    let last = history.data.len().saturating_sub(1);
    let mut table = format!(
        "{:<17} {:>7} {:>5} {:>7}\n",
        history.vat_id, "°C", "pH", "nivel"
    );
    for (i, point) in history.data.iter().enumerate() {
        if i % step != 0 && i != last {
            continue;
        }
        let _ = writeln!(
            table,
            "{:<17} {:>7.1} {:>5.1} {:>6.1}%",
            point.timestamp.format("%Y-%m-%d %H:%M"),
            point.temperature,
            point.ph,
            point.liquid_level
        );
    }
    table
}
