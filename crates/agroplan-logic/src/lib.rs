//! Pure planting layout logic for AgroPlan.
//!
//! This crate contains the layout engine that is independent of any UI,
//! renderer, or network client. Functions take plain data and return
//! results, making them unit-testable and portable across a web frontend,
//! native CLI tools, and any future renderer.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`advisory`] | Advisory request/response model, tolerant parsing, request-generation guard |
//! | [`layout`] | Formation placement: zones + plot → drawing primitives |
//! | [`legend`] | Legend entries derived from zones |
//! | [`plan`] | Manual and advisory planning paths, error taxonomy, seeded rendering |
//! | [`plot`] | Plot description, formation modes, form defaults, validation |
//! | [`spacing`] | Spacing parsing (`"50cm"`, `"6m"`, numbers) and display formatting |
//! | [`species`] | Tree and crop species tables with fuzzy name resolution |
//! | [`zones`] | Zone normalization from advisory entries or manual selections |
//!
//! ```
//! use agroplan_logic::layout::LayoutConfig;
//! use agroplan_logic::plan::{plan_manual, render};
//! use agroplan_logic::plot::PlotSpec;
//!
//! let mut plot = PlotSpec::default();
//! plot.trees = vec!["mango".into()];
//! plot.crops = vec!["maize".into()];
//!
//! let plan = plan_manual(&plot).unwrap();
//! let layout = render(&plot, &plan, &LayoutConfig::default(), 42);
//! assert_eq!(plan.zones.len(), 2);
//! assert!(!layout.primitives.is_empty());
//! ```

pub mod advisory;
pub mod layout;
pub mod legend;
pub mod plan;
pub mod plot;
pub mod spacing;
pub mod species;
pub mod zones;
