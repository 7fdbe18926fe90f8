//! AgroPlan Headless Layout Harness
//!
//! Runs canned plot submissions and a canned advisory reply through the
//! planning engine and checks the resulting layouts.
//! Runs entirely in-process — no advisory service, no rendering.
//!
//! Usage:
//!   cargo run -p agroplan-simtest
//!   cargo run -p agroplan-simtest -- --verbose
//!   cargo run -p agroplan-simtest -- --dump <scenario>   (prints layout JSON)
//!   RUST_LOG=agroplan_logic=debug cargo run -p agroplan-simtest

use agroplan_logic::advisory::{AdvisoryError, CannedAdvisor, RequestTracker};
use agroplan_logic::layout::{Layout, LayoutConfig, LayoutVariant, Primitive, PrimitiveRole};
use agroplan_logic::plan::{self, Plan, PlanError, Planner};
use agroplan_logic::plot::{validate_plot, FormationMode, PlotSpec};
use agroplan_logic::spacing::{format_spacing, parse_spacing, SpacingValue};
use agroplan_logic::species::{CropSpecies, TreeSpecies};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// ── Fixtures (same JSON the integration tests use) ──────────────────────
const PLOTS_JSON: &str = include_str!("../../../data/plots.json");
const ADVISORY_REPLY: &str = include_str!("../../../data/advisory_reply.json");

/// Fixed seed so repeated runs print identical layouts.
const HARNESS_SEED: u64 = 2024;

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    plot: PlotSpec,
    #[serde(default)]
    advisory: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let dump = args
        .iter()
        .position(|a| a == "--dump")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let scenarios: Vec<Scenario> = match serde_json::from_str(PLOTS_JSON) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("plots.json parse error: {e}");
            std::process::exit(2);
        }
    };

    if let Some(name) = dump {
        dump_layout(&scenarios, &name);
        return;
    }

    println!("=== AgroPlan Layout Harness ===\n");

    let mut results = Vec::new();

    // 1. Species tables and spacing
    results.extend(validate_species_tables(verbose));

    // 2. Canned plot scenarios
    results.extend(validate_scenarios(&scenarios, verbose));

    // 3. Advisory failure handling
    results.extend(validate_advisory_failures(verbose));

    // 4. Stale reply guard
    results.extend(validate_request_generations(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Species & spacing ────────────────────────────────────────────────

fn validate_species_tables(verbose: bool) -> Vec<TestResult> {
    println!("--- Species & Spacing ---");
    let mut results = Vec::new();

    // Every table entry's spacing survives a format/parse round trip
    let mut mismatches = Vec::new();
    let spacings = TreeSpecies::all()
        .iter()
        .map(|t| (t.config(), true))
        .chain(CropSpecies::all().iter().map(|c| (c.config(), false)));
    for (config, is_tree) in spacings {
        let text = format_spacing(config.spacing_m);
        let back = parse_spacing(Some(&SpacingValue::Text(text.clone())), is_tree);
        if (back - config.spacing_m).abs() > 1e-9 {
            mismatches.push(format!("{} {} → {}", config.name, text, back));
        }
        if verbose {
            println!("  {:<10} {:>6}", config.name, text);
        }
    }
    results.push(TestResult::check(
        "spacing_round_trip",
        mismatches.is_empty(),
        if mismatches.is_empty() {
            "all table spacings round-trip".to_string()
        } else {
            mismatches.join(", ")
        },
    ));

    // Display names resolve back to their own species
    let trees_ok = TreeSpecies::all()
        .iter()
        .all(|t| TreeSpecies::resolve(t.config().name) == *t);
    let crops_ok = CropSpecies::all()
        .iter()
        .all(|c| CropSpecies::resolve(c.config().name) == *c);
    results.push(TestResult::check(
        "species_names_resolve",
        trees_ok && crops_ok,
        format!("trees={trees_ok} crops={crops_ok}"),
    ));

    results
}

// ── 2. Scenarios ────────────────────────────────────────────────────────

fn run_scenario(scenario: &Scenario) -> Result<(Plan, Layout), PlanError> {
    let advisor = if scenario.advisory {
        CannedAdvisor::replying(ADVISORY_REPLY)
    } else {
        CannedAdvisor::failing(AdvisoryError::Unavailable(
            "harness: manual scenario".to_string(),
        ))
    };
    let plan = plan::plan(&scenario.plot, &advisor)?;
    let layout = plan::render(&scenario.plot, &plan, &LayoutConfig::default(), HARNESS_SEED);
    Ok((plan, layout))
}

fn validate_scenarios(scenarios: &[Scenario], verbose: bool) -> Vec<TestResult> {
    println!("--- Plot Scenarios ---");
    let mut results = Vec::new();

    for scenario in scenarios {
        let errors = validate_plot(&scenario.plot);
        if !errors.is_empty() {
            results.push(TestResult::check(
                format!("{}_valid", scenario.name),
                false,
                format!("{errors:?}"),
            ));
            continue;
        }

        let (plan, layout) = match run_scenario(scenario) {
            Ok(out) => out,
            Err(e) => {
                results.push(TestResult::check(
                    format!("{}_plan", scenario.name),
                    false,
                    e.to_string(),
                ));
                continue;
            }
        };

        if verbose {
            println!(
                "  {}: {:?}, {} zones, {} primitives",
                scenario.name,
                layout.variant,
                plan.zones.len(),
                layout.primitives.len()
            );
            for entry in &layout.legend {
                println!("    {:?} {}", entry.marker, entry.text);
            }
        }

        results.push(check_layout_shape(&scenario.name, &plan, &layout));
        results.push(check_points_inside(&scenario.name, &scenario.plot, &layout));
        results.push(TestResult::check(
            format!("{}_legend", scenario.name),
            layout.legend.len() == plan.zones.len(),
            format!("{} legend entries", layout.legend.len()),
        ));

        let again = plan::render(&scenario.plot, &plan, &LayoutConfig::default(), HARNESS_SEED);
        results.push(TestResult::check(
            format!("{}_deterministic", scenario.name),
            again == layout,
            "same seed, same layout",
        ));
    }

    results
}

/// Variant-specific structural checks.
fn check_layout_shape(name: &str, plan: &Plan, layout: &Layout) -> TestResult {
    let has_crops = plan.zones.iter().any(|z| !z.kind.is_tree());
    let (ok, detail) = match layout.variant {
        LayoutVariant::TreesOnlyGrid => (
            !has_crops && layout.count_role(PrimitiveRole::Background) == 1,
            format!("{} grid trees", layout.count_role(PrimitiveRole::Tree)),
        ),
        LayoutVariant::Block => {
            let borders = layout.count_role(PrimitiveRole::BorderStrip);
            let interior = layout.count_role(PrimitiveRole::CropArea);
            let dots = layout.count_role(PrimitiveRole::CropDot);
            (
                borders == 4 && interior == 1 && dots <= 40,
                format!("{borders} borders, {interior} interior, {dots} dots"),
            )
        }
        LayoutVariant::Intercropping => {
            let stripes = layout.count_role(PrimitiveRole::Stripe);
            let crops = plan.zones.iter().filter(|z| !z.kind.is_tree()).count();
            (stripes == crops, format!("{stripes} stripes for {crops} crops"))
        }
        LayoutVariant::Alley => {
            let rows = layout.count_role(PrimitiveRole::TreeRow);
            let strips = layout.count_role(PrimitiveRole::AlleyStrip);
            (
                rows >= 1 && strips + 1 == rows,
                format!("{rows} tree rows, {strips} crop strips"),
            )
        }
    };
    TestResult::check(format!("{name}_shape"), ok, detail)
}

fn check_points_inside(name: &str, plot: &PlotSpec, layout: &Layout) -> TestResult {
    let config = LayoutConfig::default();
    let (x0, y0) = (config.margin, config.margin);
    let (x1, y1) = (
        x0 + plot.width * config.scale,
        y0 + plot.length * config.scale,
    );
    let outside = layout
        .primitives
        .iter()
        .filter(|p| match p {
            Primitive::Circle { x, y, .. } => *x < x0 || *x > x1 || *y < y0 || *y > y1,
            _ => false,
        })
        .count();
    TestResult::check(
        format!("{name}_inside"),
        outside == 0,
        format!("{outside} points outside plot"),
    )
}

// ── 3. Advisory failures ────────────────────────────────────────────────

fn validate_advisory_failures(verbose: bool) -> Vec<TestResult> {
    println!("--- Advisory Failures ---");
    let mut results = Vec::new();
    let plot = PlotSpec {
        recommend_crops: true,
        ..Default::default()
    };

    let cases: [(&str, CannedAdvisor); 3] = [
        (
            "unavailable",
            CannedAdvisor::failing(AdvisoryError::Unavailable("missing API key".into())),
        ),
        ("not_json", CannedAdvisor::replying("I recommend planting maize.")),
        ("no_zones", CannedAdvisor::replying(r#"{"zones": []}"#)),
    ];
    for (name, advisor) in cases {
        let outcome = plan::plan(&plot, &advisor);
        if verbose {
            println!("  {name}: {outcome:?}");
        }
        let expected = match name {
            "no_zones" => matches!(outcome, Err(PlanError::EmptyNormalization)),
            _ => matches!(outcome, Err(PlanError::Advisory(_))),
        };
        results.push(TestResult::check(
            format!("advisory_{name}"),
            expected,
            match &outcome {
                Ok(p) => format!("unexpected plan with {} zones", p.zones.len()),
                Err(e) => e.to_string(),
            },
        ));
    }

    // Fallback to the manual selection when the reply is empty
    let with_selection = PlotSpec {
        trees: vec!["neem".into()],
        crops: vec!["ragi".into()],
        formation: FormationMode::Alley,
        ..plot
    };
    let fallback = plan::plan(&with_selection, &CannedAdvisor::replying(r#"{"zones": [{}]}"#));
    results.push(TestResult::check(
        "advisory_fallback",
        matches!(&fallback, Ok(p) if p.zones.len() == 2),
        format!("{:?}", fallback.map(|p| p.zones.len())),
    ));

    results
}

// ── 4. Request generations ──────────────────────────────────────────────

fn validate_request_generations(_verbose: bool) -> Vec<TestResult> {
    println!("--- Request Generations ---");
    let mut results = Vec::new();

    let tracker = RequestTracker::new();
    let tokens: Vec<_> = (0..5).map(|_| tracker.issue()).collect();
    let accepted = tokens.iter().filter(|t| tracker.is_current(**t)).count();
    results.push(TestResult::check(
        "only_latest_current",
        accepted == 1 && tracker.is_current(tokens[4]),
        format!("{accepted} of {} tokens current", tokens.len()),
    ));

    let planner = Planner::new();
    let plot = PlotSpec {
        recommend_crops: true,
        ..Default::default()
    };
    let old = planner.begin();
    let new = planner.begin();
    let stale = planner.complete(old, &plot, Ok(ADVISORY_REPLY.to_string()));
    let fresh = planner.complete(new, &plot, Ok(ADVISORY_REPLY.to_string()));
    results.push(TestResult::check(
        "stale_reply_discarded",
        stale.is_none() && matches!(fresh, Some(Ok(_))),
        "older reply dropped, newer applied",
    ));

    results
}

// ── Dump ────────────────────────────────────────────────────────────────

fn dump_layout(scenarios: &[Scenario], name: &str) {
    let Some(scenario) = scenarios.iter().find(|s| s.name == name) else {
        eprintln!("unknown scenario {name:?}");
        std::process::exit(2);
    };
    match run_scenario(scenario) {
        Ok((_, layout)) => match serde_json::to_string_pretty(&layout) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("serialize error: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            log::error!("scenario {name} failed: {e}");
            std::process::exit(1);
        }
    }
}
