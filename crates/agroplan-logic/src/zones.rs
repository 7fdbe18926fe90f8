//! Zone normalization — turns advisory entries or manual selections into
//! canonical [`Zone`] records.
//!
//! Counts come from the entry when it supplies one, otherwise from an area
//! heuristic: trees take 15% of the plot (border land), crops 85% (interior),
//! each divided by the square of the plant spacing.
//!
//! Crop zones are deduplicated by label (first occurrence wins). Tree zones
//! are not.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::advisory::{RawPlantDetails, RawZoneEntry};
use crate::plot::PlotSpec;
use crate::spacing::{default_spacing, format_spacing, parse_spacing, SpacingValue};
use crate::species::{CropSpecies, SpeciesConfig, TreeSpecies};

/// Share of the plot area given to trees by the count heuristic.
pub const TREE_AREA_SHARE: f64 = 0.15;
/// Share of the plot area given to crops by the count heuristic.
pub const CROP_AREA_SHARE: f64 = 0.85;

const DEFAULT_REASON: &str = "Recommended for your farm.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Tree,
    Crop,
}

impl ZoneKind {
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }

    fn area_share(&self) -> f64 {
        match self {
            Self::Tree => TREE_AREA_SHARE,
            Self::Crop => CROP_AREA_SHARE,
        }
    }
}

/// Where a zone sits on the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePlacement {
    #[serde(rename = "border-all")]
    BorderAll,
    #[serde(rename = "center")]
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneIcon {
    Circle,
    Dots,
}

/// One species group's placement, styling, and quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub area: ZonePlacement,
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub color: String,
    pub label: String,
    pub icon: ZoneIcon,
    /// Number of plants, at least 1.
    pub count: u32,
    pub reason: String,
    /// Display spacing, e.g. `"6m"` or `"75cm"`.
    pub spacing: String,
    pub spacing_meters: f64,
}

impl Zone {
    /// Build a zone; placement and icon follow from `kind`.
    fn new(
        kind: ZoneKind,
        config: &SpeciesConfig,
        spacing_m: f64,
        count: u32,
        reason: &str,
    ) -> Self {
        let (area, icon) = match kind {
            ZoneKind::Tree => (ZonePlacement::BorderAll, ZoneIcon::Circle),
            ZoneKind::Crop => (ZonePlacement::Center, ZoneIcon::Dots),
        };
        Self {
            area,
            kind,
            color: config.color.to_string(),
            label: config.name.to_string(),
            icon,
            count,
            reason: reason.to_string(),
            spacing: format_spacing(spacing_m),
            spacing_meters: spacing_m,
        }
    }
}

/// Plant count from the area heuristic, at least 1.
pub fn heuristic_count(kind: ZoneKind, plot_area: f64, spacing_m: f64) -> u32 {
    let raw = (plot_area * kind.area_share()) / (spacing_m * spacing_m);
    clamp_count(raw)
}

fn clamp_count(raw: f64) -> u32 {
    if raw.is_nan() {
        return 1;
    }
    raw.floor().clamp(1.0, u32::MAX as f64) as u32
}

/// Reason strings used when zones are synthesized from a manual selection.
#[derive(Debug, Clone, Copy)]
struct ManualReasons {
    tree: &'static str,
    crop: &'static str,
}

/// Manual path: the user picked species and asked for no recommendation.
const SELECTED: ManualReasons = ManualReasons {
    tree: "Selected for border planting.",
    crop: "Selected for planting.",
};

/// Fallback path: the advisory reply yielded nothing usable.
const FALLBACK: ManualReasons = ManualReasons {
    tree: "Planted on border for shade and windbreak.",
    crop: "Grown in center for maximum sunlight.",
};

/// Normalize advisory entries into zones.
///
/// Each entry may contribute a tree zone and a crop zone, in that order. When
/// no entry yields a zone, the manual selection is used instead. An empty
/// result means neither source produced anything; callers must treat that as
/// a failure.
pub fn normalize(
    raw_entries: &[RawZoneEntry],
    plot_area: f64,
    manual_trees: &[String],
    manual_crops: &[String],
    recommendation_requested: bool,
) -> Vec<Zone> {
    let mut zones = Vec::new();
    let mut crop_labels: HashSet<String> = HashSet::new();

    for entry in raw_entries {
        if let Some(tree) = &entry.tree_details {
            let species = TreeSpecies::resolve(tree.species.as_deref().unwrap_or("Unknown"));
            zones.push(zone_from_details(ZoneKind::Tree, &species.config(), tree, plot_area));
        }

        if let Some(crop) = &entry.crop_details {
            let species = CropSpecies::resolve(crop.species.as_deref().unwrap_or("Unknown"));
            let config = species.config();
            if !crop_labels.insert(config.name.to_string()) {
                log::warn!("dropping duplicate crop zone {:?}", config.name);
                continue;
            }
            zones.push(zone_from_details(ZoneKind::Crop, &config, crop, plot_area));
        }
    }

    if zones.is_empty() && (!manual_trees.is_empty() || !manual_crops.is_empty()) {
        let reasons = if recommendation_requested {
            log::warn!("no zones from advisory reply, falling back to manual selection");
            FALLBACK
        } else {
            SELECTED
        };
        zones = zones_from_selection(manual_trees, manual_crops, plot_area, reasons);
    }

    log::debug!(
        "normalized {} entries into {} zones",
        raw_entries.len(),
        zones.len()
    );
    zones
}

/// Zones for a manual submission (no advisory involved).
pub fn from_manual_selection(plot: &PlotSpec) -> Vec<Zone> {
    normalize(&[], plot.area(), &plot.trees, &plot.crops, false)
}

fn zone_from_details(
    kind: ZoneKind,
    config: &SpeciesConfig,
    details: &RawPlantDetails,
    plot_area: f64,
) -> Zone {
    let spacing_m = resolve_spacing(details.spacing_meters.as_ref(), kind.is_tree());
    // zero or negative counts are treated as missing
    let count = match details.count {
        Some(n) if n > 0.0 => clamp_count(n),
        _ => heuristic_count(kind, plot_area, spacing_m),
    };
    let reason = details.reason.as_deref().unwrap_or(DEFAULT_REASON);
    Zone::new(kind, config, spacing_m, count, reason)
}

/// Parsed spacing, replaced by the kind default when it isn't positive.
fn resolve_spacing(value: Option<&SpacingValue>, is_tree: bool) -> f64 {
    let spacing = parse_spacing(value, is_tree);
    if spacing.is_finite() && spacing > 0.0 {
        spacing
    } else {
        default_spacing(is_tree)
    }
}

fn zones_from_selection(
    tree_ids: &[String],
    crop_ids: &[String],
    plot_area: f64,
    reasons: ManualReasons,
) -> Vec<Zone> {
    let mut zones = Vec::with_capacity(tree_ids.len() + crop_ids.len());

    for id in tree_ids {
        let config = TreeSpecies::from_id_or_default(id).config();
        let count = heuristic_count(ZoneKind::Tree, plot_area, config.spacing_m);
        zones.push(Zone::new(ZoneKind::Tree, &config, config.spacing_m, count, reasons.tree));
    }

    let mut crop_labels: HashSet<&'static str> = HashSet::new();
    for id in crop_ids {
        let config = CropSpecies::from_id_or_default(id).config();
        if !crop_labels.insert(config.name) {
            continue;
        }
        let count = heuristic_count(ZoneKind::Crop, plot_area, config.spacing_m);
        zones.push(Zone::new(ZoneKind::Crop, &config, config.spacing_m, count, reasons.crop));
    }

    zones
}
