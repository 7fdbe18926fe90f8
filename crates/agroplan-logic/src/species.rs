//! Species tables — the tree and crop species the planner knows how to draw.
//!
//! Each species carries an immutable [`SpeciesConfig`] (display color, display
//! name, default spacing). Lookups scan the table in declaration order, so the
//! first match always wins.

use serde::{Deserialize, Serialize};

/// Display and spacing data for one species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeciesConfig {
    /// Table key, lower-case.
    pub id: &'static str,
    /// Hex display color.
    pub color: &'static str,
    pub name: &'static str,
    /// Default planting distance in meters.
    pub spacing_m: f64,
}

impl SpeciesConfig {
    /// True when the key or display name appears inside `lowered`.
    fn matches(&self, lowered: &str) -> bool {
        lowered.contains(self.id) || lowered.contains(&self.name.to_lowercase())
    }
}

// ============================================================================
// TREES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSpecies {
    Mango,
    Neem,
    Coconut,
    Tamarind,
}

impl TreeSpecies {
    pub fn config(&self) -> SpeciesConfig {
        match self {
            Self::Mango => SpeciesConfig {
                id: "mango",
                color: "#FF8C00",
                name: "Mango",
                spacing_m: 6.0,
            },
            Self::Neem => SpeciesConfig {
                id: "neem",
                color: "#228B22",
                name: "Neem",
                spacing_m: 5.0,
            },
            Self::Coconut => SpeciesConfig {
                id: "coconut",
                color: "#8B4513",
                name: "Coconut",
                spacing_m: 7.0,
            },
            Self::Tamarind => SpeciesConfig {
                id: "tamarind",
                color: "#654321",
                name: "Tamarind",
                spacing_m: 8.0,
            },
        }
    }

    pub fn all() -> &'static [TreeSpecies] {
        &[Self::Mango, Self::Neem, Self::Coconut, Self::Tamarind]
    }

    /// Exact key lookup (`"neem"` → `Neem`).
    pub fn from_id(id: &str) -> Option<TreeSpecies> {
        Self::all().iter().copied().find(|t| t.config().id == id)
    }

    /// Key lookup for manual selections; unknown keys become Mango.
    pub fn from_id_or_default(id: &str) -> TreeSpecies {
        Self::from_id(id).unwrap_or(Self::Mango)
    }

    /// Resolve free text such as `"Neem (Azadirachta indica)"`.
    ///
    /// Picks the first species whose key or name is a substring of the
    /// lower-cased text; Mango when nothing matches.
    pub fn resolve(name: &str) -> TreeSpecies {
        let lowered = name.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.config().matches(&lowered))
            .unwrap_or(Self::Mango)
    }
}

// ============================================================================
// CROPS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropSpecies {
    Maize,
    Sorghum,
    Legumes,
    Cotton,
    Ragi,
}

impl CropSpecies {
    pub fn config(&self) -> SpeciesConfig {
        match self {
            Self::Maize => SpeciesConfig {
                id: "maize",
                color: "#FFD700",
                name: "Maize",
                spacing_m: 0.75,
            },
            Self::Sorghum => SpeciesConfig {
                id: "sorghum",
                color: "#CD853F",
                name: "Sorghum",
                spacing_m: 0.45,
            },
            Self::Legumes => SpeciesConfig {
                id: "legumes",
                color: "#90EE90",
                name: "Legumes",
                spacing_m: 0.30,
            },
            Self::Cotton => SpeciesConfig {
                id: "cotton",
                color: "#F5F5DC",
                name: "Cotton",
                spacing_m: 0.90,
            },
            Self::Ragi => SpeciesConfig {
                id: "ragi",
                color: "#8B4513",
                name: "Ragi",
                spacing_m: 0.20,
            },
        }
    }

    pub fn all() -> &'static [CropSpecies] {
        &[
            Self::Maize,
            Self::Sorghum,
            Self::Legumes,
            Self::Cotton,
            Self::Ragi,
        ]
    }

    pub fn from_id(id: &str) -> Option<CropSpecies> {
        Self::all().iter().copied().find(|c| c.config().id == id)
    }

    /// Key lookup for manual selections; unknown keys become Maize.
    pub fn from_id_or_default(id: &str) -> CropSpecies {
        Self::from_id(id).unwrap_or(Self::Maize)
    }

    /// Resolve free text against the crop table; Maize when nothing matches.
    pub fn resolve(name: &str) -> CropSpecies {
        let lowered = name.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.config().matches(&lowered))
            .unwrap_or(Self::Maize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_key_and_name() {
        assert_eq!(TreeSpecies::resolve("Neem"), TreeSpecies::Neem);
        assert_eq!(TreeSpecies::resolve("Tall coconut palms"), TreeSpecies::Coconut);
        assert_eq!(CropSpecies::resolve("Finger millet (Ragi)"), CropSpecies::Ragi);
        assert_eq!(CropSpecies::resolve("LEGUMES"), CropSpecies::Legumes);
    }

    #[test]
    fn test_resolve_falls_back_to_first_entry() {
        assert_eq!(TreeSpecies::resolve("Teak"), TreeSpecies::Mango);
        assert_eq!(CropSpecies::resolve("Unknown"), CropSpecies::Maize);
    }

    #[test]
    fn test_first_match_wins() {
        // Both names appear; table order decides.
        assert_eq!(CropSpecies::resolve("ragi after maize"), CropSpecies::Maize);
        assert_eq!(TreeSpecies::resolve("tamarind and neem"), TreeSpecies::Neem);
    }

    #[test]
    fn test_manual_ids() {
        assert_eq!(TreeSpecies::from_id_or_default("tamarind"), TreeSpecies::Tamarind);
        assert_eq!(TreeSpecies::from_id_or_default("oak"), TreeSpecies::Mango);
        assert_eq!(CropSpecies::from_id("cotton"), Some(CropSpecies::Cotton));
        assert_eq!(CropSpecies::from_id("Cotton"), None);
    }

    #[test]
    fn test_tables_have_positive_spacing() {
        assert!(TreeSpecies::all().iter().all(|t| t.config().spacing_m > 0.0));
        assert!(CropSpecies::all().iter().all(|c| c.config().spacing_m > 0.0));
    }
}
