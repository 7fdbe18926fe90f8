//! Plot description submitted by the user.
//!
//! Holds the data model behind the plot input form, independent of any UI
//! framework: dimensions, site conditions, chosen formation, and either a
//! manual species selection or a request for advisory recommendations.
//!
//! ```
//! use agroplan_logic::plot::{validate_plot, PlotSpec};
//!
//! let mut plot = PlotSpec::default();
//! plot.trees = vec!["neem".into()];
//! assert!(validate_plot(&plot).is_empty());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spatial pattern for arranging trees and crops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormationMode {
    /// Trees on all four borders, crops in the interior.
    #[default]
    Block,
    /// Crops in side-by-side vertical stripes.
    Intercropping,
    /// Tree rows across the plot with crop alleys between them.
    Alley,
}

impl FormationMode {
    pub fn all() -> &'static [FormationMode] {
        &[Self::Block, Self::Intercropping, Self::Alley]
    }

    /// Wire id, as serialized.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Intercropping => "intercropping",
            Self::Alley => "alley",
        }
    }

    /// Case-insensitive id lookup; surrounding whitespace is ignored.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::all()
            .iter()
            .copied()
            .find(|f| f.id().eq_ignore_ascii_case(id))
    }

    /// Caption text shown above the drawn plot.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Block => "Block Formation (Border Trees)",
            Self::Intercropping => "Intercropping (Relay)",
            Self::Alley => "Alley Cropping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    #[default]
    Loamy,
    Clay,
    Red,
    Sandy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterSource {
    #[default]
    Rainfed,
    Borewell,
    Pond,
    River,
}

/// One plot submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlotSpec {
    /// Plot width in meters (x axis).
    pub width: f64,
    /// Plot length in meters (y axis).
    pub length: f64,
    pub soil: SoilType,
    /// Annual rainfall in mm.
    pub rainfall: f64,
    pub water_source: WaterSource,
    pub formation: FormationMode,
    /// District name, free text.
    pub district: Option<String>,
    /// Manually selected tree ids (`"mango"`, `"neem"`, ...).
    pub trees: Vec<String>,
    /// Manually selected crop ids (`"maize"`, `"ragi"`, ...).
    pub crops: Vec<String>,
    /// Ask the advisory service instead of using the manual selection.
    pub recommend_crops: bool,
    /// Tree types to request from the advisory service.
    pub num_trees: u32,
    /// Crop types to request from the advisory service.
    pub num_crops: u32,
}

impl Default for PlotSpec {
    fn default() -> Self {
        Self {
            width: 30.0,
            length: 50.0,
            soil: SoilType::Loamy,
            rainfall: 600.0,
            water_source: WaterSource::Rainfed,
            formation: FormationMode::Block,
            district: None,
            trees: Vec::new(),
            crops: Vec::new(),
            recommend_crops: false,
            num_trees: 1,
            num_crops: 2,
        }
    }
}

impl PlotSpec {
    /// Plot area in square meters.
    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    pub fn has_selection(&self) -> bool {
        !self.trees.is_empty() || !self.crops.is_empty()
    }
}

/// Plot validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotError {
    /// Width or length is zero, negative, or not a number.
    #[error("plot {field} must be a positive number of meters, got {value}")]
    NonPositiveDimension { field: &'static str, value: f64 },
    /// Manual submission with nothing selected.
    #[error("select at least one tree or crop, or ask for a recommendation")]
    NoSelection,
}

/// Validate a plot submission, returning all errors found.
pub fn validate_plot(plot: &PlotSpec) -> Vec<PlotError> {
    let mut errors = Vec::new();

    for (field, value) in [("width", plot.width), ("length", plot.length)] {
        if !value.is_finite() || value <= 0.0 {
            errors.push(PlotError::NonPositiveDimension { field, value });
        }
    }

    if !plot.recommend_crops && !plot.has_selection() {
        errors.push(PlotError::NoSelection);
    }

    errors
}
