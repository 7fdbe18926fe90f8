//! Legend entries — one per zone, independent of formation.

use serde::{Deserialize, Serialize};

use crate::zones::{Zone, ZoneKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendMarker {
    /// Solid circle with an outline (trees).
    Circle,
    /// Translucent square (crops).
    Square,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub marker: LegendMarker,
    pub color: String,
    pub opacity: f64,
    /// `"<label> (<count>)"`
    pub text: String,
}

/// Build legend entries in zone order.
pub fn legend(zones: &[Zone]) -> Vec<LegendEntry> {
    zones
        .iter()
        .map(|zone| {
            let (marker, opacity) = match zone.kind {
                ZoneKind::Tree => (LegendMarker::Circle, 1.0),
                ZoneKind::Crop => (LegendMarker::Square, 0.7),
            };
            LegendEntry {
                marker,
                color: zone.color.clone(),
                opacity,
                text: format!("{} ({})", zone.label, zone.count),
            }
        })
        .collect()
}
