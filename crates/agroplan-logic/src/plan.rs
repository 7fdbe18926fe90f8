//! Planning — from a plot submission to a normalized plan and a layout.
//!
//! Two paths lead to a [`Plan`]:
//! 1. Manual: the user picked species and wants no recommendation.
//! 2. Advisory: the advisory service is asked, its reply parsed and
//!    normalized, with the manual selection as fallback.
//!
//! Internal fallbacks (spacing, species, counts) never surface. Only an
//! invalid submission, a failed advisory call, or a plan with no zones at all
//! is reported as a [`PlanError`].

use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::advisory::{
    parse_response, AdvisoryClient, AdvisoryError, AdvisoryRequest, RequestToken, RequestTracker,
};
use crate::layout::{place, Layout, LayoutConfig};
use crate::plot::{validate_plot, FormationMode, PlotError, PlotSpec};
use crate::zones::{from_manual_selection, normalize, Zone};

/// Setup cost per square meter, in rupees.
pub const SETUP_COST_PER_M2: f64 = 50.0;

const AGROFORESTRY_BENEFIT: &str = "+20% income from agroforestry";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid submission: {}", describe(.0))]
    Validation(Vec<PlotError>),
    #[error(transparent)]
    Advisory(#[from] AdvisoryError),
    #[error("no planting zones could be produced")]
    EmptyNormalization,
}

fn describe(errors: &[PlotError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rough economics shown next to the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicSummary {
    pub yield_note: String,
    pub benefit: String,
    pub setup_cost: String,
}

impl EconomicSummary {
    fn for_area(area: f64, yield_note: impl Into<String>) -> Self {
        Self {
            yield_note: yield_note.into(),
            benefit: AGROFORESTRY_BENEFIT.to_string(),
            setup_cost: format!("₹{}", area * SETUP_COST_PER_M2),
        }
    }
}

/// Normalized recommendation ready for layout and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub zones: Vec<Zone>,
    pub formation: FormationMode,
    pub economic: EconomicSummary,
    pub tips: Vec<String>,
    /// Advisory text blocks, passed through verbatim.
    pub water_assessment: Option<Value>,
    pub regional_insights: Option<Value>,
}

/// Plan from the manual selection alone.
pub fn plan_manual(plot: &PlotSpec) -> Result<Plan, PlanError> {
    let mut errors = validate_plot(plot);
    if !plot.has_selection() && !errors.contains(&PlotError::NoSelection) {
        errors.push(PlotError::NoSelection);
    }
    if !errors.is_empty() {
        return Err(PlanError::Validation(errors));
    }

    let zones = from_manual_selection(plot);
    if zones.is_empty() {
        return Err(PlanError::EmptyNormalization);
    }
    log::info!(
        "manual plan: {} zones, {:?} formation",
        zones.len(),
        plot.formation
    );

    Ok(Plan {
        zones,
        formation: plot.formation,
        economic: EconomicSummary::for_area(plot.area(), "Based on selected crops"),
        tips: vec![
            "Maintain proper spacing between plants for optimal growth.".to_string(),
            "Water regularly during dry seasons.".to_string(),
            "Practice crop rotation to maintain soil fertility.".to_string(),
        ],
        water_assessment: None,
        regional_insights: None,
    })
}

/// Plan from raw advisory reply text.
pub fn plan_from_advisory(plot: &PlotSpec, reply: &str) -> Result<Plan, PlanError> {
    check_dimensions(plot)?;

    let response = parse_response(reply)?;
    let zones = normalize(
        &response.zones,
        plot.area(),
        &plot.trees,
        &plot.crops,
        true,
    );
    if zones.is_empty() {
        log::warn!("advisory reply produced no zones and no manual selection to fall back on");
        return Err(PlanError::EmptyNormalization);
    }

    let formation = response.formation_override().unwrap_or(plot.formation);
    let yield_note = response
        .yield_note()
        .unwrap_or_else(|| "See detailed plan".to_string());
    log::info!(
        "advisory plan: {} zones, {:?} formation",
        zones.len(),
        formation
    );

    Ok(Plan {
        zones,
        formation,
        economic: EconomicSummary::for_area(plot.area(), yield_note),
        tips: response.normalized_tips(),
        water_assessment: response.water_assessment,
        regional_insights: response.regional_insights,
    })
}

/// Plan a submission, asking `client` when a recommendation is requested.
pub fn plan(plot: &PlotSpec, client: &dyn AdvisoryClient) -> Result<Plan, PlanError> {
    if !plot.recommend_crops {
        return plan_manual(plot);
    }
    check_dimensions(plot)?;
    let reply = client.recommend(&AdvisoryRequest::from_plot(plot))?;
    plan_from_advisory(plot, &reply)
}

fn check_dimensions(plot: &PlotSpec) -> Result<(), PlanError> {
    let errors: Vec<_> = validate_plot(plot)
        .into_iter()
        .filter(|e| matches!(e, PlotError::NonPositiveDimension { .. }))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlanError::Validation(errors))
    }
}

/// Tracks in-flight advisory submissions so only the newest reply is applied.
///
/// ```
/// use agroplan_logic::plan::Planner;
/// use agroplan_logic::plot::PlotSpec;
///
/// let planner = Planner::new();
/// let plot = PlotSpec { recommend_crops: true, ..Default::default() };
/// let stale = planner.begin();
/// let fresh = planner.begin();
/// assert!(planner.complete(stale, &plot, Ok("{}".into())).is_none());
/// assert!(planner.complete(fresh, &plot, Ok("{}".into())).is_some());
/// ```
#[derive(Debug, Default)]
pub struct Planner {
    tracker: RequestTracker,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new submission. Any reply for an earlier one is now stale.
    pub fn begin(&self) -> RequestToken {
        self.tracker.issue()
    }

    /// Turn an advisory reply into a plan, unless a newer submission exists.
    ///
    /// Returns `None` for stale replies; they are dropped without touching
    /// any state.
    pub fn complete(
        &self,
        token: RequestToken,
        plot: &PlotSpec,
        reply: Result<String, AdvisoryError>,
    ) -> Option<Result<Plan, PlanError>> {
        let reply = self.tracker.resolve(token, reply)?;
        Some(reply.map_err(PlanError::from).and_then(|text| plan_from_advisory(plot, &text)))
    }
}

/// Lay out a plan with a deterministic RNG seeded from `seed`.
pub fn render(plot: &PlotSpec, plan: &Plan, config: &LayoutConfig, seed: u64) -> Layout {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    place(plot, &plan.zones, plan.formation, config, &mut rng)
}

/// Time-based seed for interactive use.
pub fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::CannedAdvisor;
    use crate::layout::{LayoutVariant, PrimitiveRole};
    use crate::zones::ZoneKind;

    fn manual_plot() -> PlotSpec {
        PlotSpec {
            width: 30.0,
            length: 50.0,
            trees: vec!["mango".into()],
            crops: vec!["maize".into()],
            formation: FormationMode::Block,
            recommend_crops: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_manual_plan() {
        let plan = plan_manual(&manual_plot()).unwrap();
        assert_eq!(plan.zones.len(), 2);
        assert_eq!(plan.zones[0].kind, ZoneKind::Tree);
        assert_eq!(plan.zones[0].count, 6);
        assert_eq!(plan.zones[1].kind, ZoneKind::Crop);
        assert_eq!(plan.zones[1].count, 2266);
        assert_eq!(plan.economic.setup_cost, "₹75000");
        assert_eq!(plan.tips.len(), 3);
    }

    #[test]
    fn test_manual_without_selection_rejected() {
        let plot = PlotSpec::default();
        let err = plan_manual(&plot).unwrap_err();
        assert!(matches!(err, PlanError::Validation(ref e) if e == &vec![PlotError::NoSelection]));
    }

    #[test]
    fn test_advisory_plan() {
        let reply = r#"{
            "zones": [
                { "tree_details": { "type": "Neem tree", "spacing_meters": "5m", "count": 24 } },
                { "crop_details": { "type": "Ragi", "spacing_meters": 0.2 }, "formation": "intercropping" },
                { "crop_details": { "type": "Legumes", "spacing_meters": "30 cm", "reason": "Fixes nitrogen" } }
            ],
            "tips": ["Mulch", null],
            "regional_insights": { "district": "Tumakuru" }
        }"#;
        let plot = PlotSpec {
            recommend_crops: true,
            ..Default::default()
        };
        let plan = plan_from_advisory(&plot, reply).unwrap();

        assert_eq!(plan.formation, FormationMode::Intercropping);
        assert_eq!(plan.zones.len(), 3);
        assert_eq!(plan.zones[0].label, "Neem");
        assert_eq!(plan.zones[0].count, 24);
        assert_eq!(plan.zones[0].spacing, "5m");
        assert_eq!(plan.zones[2].reason, "Fixes nitrogen");
        assert_eq!(plan.tips, vec!["Mulch".to_string()]);
        assert_eq!(plan.economic.yield_note, "See detailed plan");
        assert!(plan.regional_insights.is_some());
    }

    #[test]
    fn test_advisory_garbage_is_error() {
        let plot = PlotSpec {
            recommend_crops: true,
            ..Default::default()
        };
        let err = plan_from_advisory(&plot, "<html>502</html>").unwrap_err();
        assert!(matches!(err, PlanError::Advisory(AdvisoryError::Malformed(_))));
    }

    #[test]
    fn test_empty_advisory_without_selection() {
        let plot = PlotSpec {
            recommend_crops: true,
            ..Default::default()
        };
        let err = plan_from_advisory(&plot, r#"{ "zones": [] }"#).unwrap_err();
        assert!(matches!(err, PlanError::EmptyNormalization));
    }

    #[test]
    fn test_empty_advisory_falls_back_to_selection() {
        let plot = PlotSpec {
            recommend_crops: true,
            ..manual_plot()
        };
        let plan = plan_from_advisory(&plot, r#"{ "zones": [{}] }"#).unwrap();
        assert_eq!(plan.zones.len(), 2);
        assert_eq!(plan.zones[0].reason, "Planted on border for shade and windbreak.");
    }

    #[test]
    fn test_plan_dispatch() {
        let down = CannedAdvisor::failing(AdvisoryError::Unavailable("missing API key".into()));

        // manual path never calls the advisor
        assert!(plan(&manual_plot(), &down).is_ok());

        let plot = PlotSpec {
            recommend_crops: true,
            ..manual_plot()
        };
        assert!(matches!(
            plan(&plot, &down),
            Err(PlanError::Advisory(AdvisoryError::Unavailable(_)))
        ));

        let up = CannedAdvisor::replying(r#"{"zones":[{"crop_details":{"type":"Sorghum"}}]}"#);
        let plan = plan(&plot, &up).unwrap();
        assert_eq!(plan.zones.len(), 1);
        assert_eq!(plan.zones[0].label, "Sorghum");
    }

    #[test]
    fn test_bad_dimensions_rejected_before_advisory() {
        let plot = PlotSpec {
            width: -1.0,
            recommend_crops: true,
            ..Default::default()
        };
        let up = CannedAdvisor::replying("{}");
        assert!(matches!(plan(&plot, &up), Err(PlanError::Validation(_))));
    }

    #[test]
    fn test_planner_discards_superseded_reply() {
        let planner = Planner::new();
        let plot = PlotSpec {
            recommend_crops: true,
            ..manual_plot()
        };
        let first = planner.begin();
        let second = planner.begin();

        assert!(planner.complete(first, &plot, Ok("{}".into())).is_none());
        let result = planner
            .complete(second, &plot, Err(AdvisoryError::Unavailable("timeout".into())))
            .unwrap();
        assert!(matches!(result, Err(PlanError::Advisory(_))));
    }

    #[test]
    fn test_render_end_to_end() {
        let plot = manual_plot();
        let plan = plan_manual(&plot).unwrap();
        let layout = render(&plot, &plan, &LayoutConfig::default(), 7);

        assert_eq!(layout.variant, LayoutVariant::Block);
        assert_eq!(layout.count_role(PrimitiveRole::BorderStrip), 4);
        assert_eq!(layout.count_role(PrimitiveRole::CropArea), 1);
        assert!(layout.count_role(PrimitiveRole::CropDot) <= 40);
        assert_eq!(render(&plot, &plan, &LayoutConfig::default(), 7), layout);
    }

    #[test]
    fn test_error_messages() {
        let err = PlanError::Validation(vec![PlotError::NoSelection]);
        assert!(err.to_string().contains("select at least one tree or crop"));
        let err = PlanError::from(AdvisoryError::Unavailable("offline".into()));
        assert_eq!(err.to_string(), "advisory service unavailable: offline");
    }
}
