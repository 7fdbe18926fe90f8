//! Formation placement — turns zones and plot geometry into drawing primitives.
//!
//! Output is a flat, ordered list of [`Primitive`]s in pixel space for an
//! external renderer. Every placed point uses `pixel = margin + meters × scale`
//! with the plot's top-left corner at `(margin, margin)`.
//!
//! # Layout variants
//!
//! | Variant | Chosen when | Geometry |
//! |---------|-------------|----------|
//! | `TreesOnlyGrid` | no crop zones | tinted plot, trees on a uniform grid |
//! | `Block` | formation = block | four tree border strips, inset crop rectangle |
//! | `Intercropping` | formation = intercropping | one vertical stripe per crop zone |
//! | `Alley` | formation = alley | tree rows along the length, crop strips between |
//!
//! Only the first tree zone (and, for block and alley, the first crop zone)
//! drives geometry. Crop presence is drawn as a capped number of dots at
//! random positions; the RNG is supplied by the caller so layouts are
//! reproducible under a fixed seed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::legend::{legend, LegendEntry};
use crate::plot::{FormationMode, PlotSpec};
use crate::spacing::default_spacing;
use crate::zones::{Zone, ZoneKind};

/// Cap on tree positions along one axis of a grid or row.
pub const MAX_GRID_STEPS: usize = 200;
/// Cap on crop dots drawn in the block interior.
pub const BLOCK_MAX_DOTS: u32 = 40;
/// Cap on crop dots drawn per intercropping stripe.
pub const STRIPE_MAX_DOTS: u32 = 35;
/// Cap on crop dots drawn per alley strip.
pub const ALLEY_MAX_DOTS: u32 = 25;

/// Pixel-space drawing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pixels per meter.
    pub scale: f64,
    /// Blank border around the plot, in pixels.
    pub margin: f64,
    pub tree_radius: f64,
    pub dot_radius: f64,
    pub dot_opacity: f64,
    /// Outline color for tree markers and the plot boundary.
    pub tree_stroke: String,
    /// Outline color for crop areas.
    pub crop_stroke: String,
    /// Distance of the caption line above the plot.
    pub caption_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            scale: 3.0,
            margin: 60.0,
            tree_radius: 6.0,
            dot_radius: 2.5,
            dot_opacity: 0.85,
            tree_stroke: "#228B22".to_string(),
            crop_stroke: "#4CAF50".to_string(),
            caption_offset: 30.0,
        }
    }
}

/// What a primitive depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveRole {
    PlotOutline,
    /// Whole-plot tint in the trees-only grid.
    Background,
    BorderStrip,
    /// Inset crop rectangle in block formation.
    CropArea,
    Stripe,
    AlleyStrip,
    Tree,
    TreeRow,
    CropDot,
    Caption,
}

/// One drawable instruction in pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Primitive {
    Rect {
        role: PrimitiveRole,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
        opacity: f64,
        stroke: String,
        stroke_width: f64,
    },
    Circle {
        role: PrimitiveRole,
        x: f64,
        y: f64,
        radius: f64,
        fill: String,
        opacity: f64,
        stroke: Option<String>,
        stroke_width: f64,
    },
    Line {
        role: PrimitiveRole,
        points: Vec<[f64; 2]>,
        stroke: String,
        stroke_width: f64,
        closed: bool,
    },
    Label {
        role: PrimitiveRole,
        x: f64,
        y: f64,
        text: String,
    },
}

impl Primitive {
    pub fn role(&self) -> PrimitiveRole {
        match self {
            Self::Rect { role, .. }
            | Self::Circle { role, .. }
            | Self::Line { role, .. }
            | Self::Label { role, .. } => *role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutVariant {
    TreesOnlyGrid,
    Block,
    Intercropping,
    Alley,
}

/// Placement result handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub variant: LayoutVariant,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub primitives: Vec<Primitive>,
    pub legend: Vec<LegendEntry>,
}

impl Layout {
    pub fn with_role(&self, role: PrimitiveRole) -> impl Iterator<Item = &Primitive> + '_ {
        self.primitives.iter().filter(move |p| p.role() == role)
    }

    pub fn count_role(&self, role: PrimitiveRole) -> usize {
        self.with_role(role).count()
    }
}

// ── Coordinate frame ────────────────────────────────────────────────────

/// Plot rectangle in pixel space.
struct Frame {
    margin: f64,
    scale: f64,
    /// Plot width in pixels.
    w: f64,
    /// Plot height (length) in pixels.
    h: f64,
}

impl Frame {
    fn new(plot: &PlotSpec, config: &LayoutConfig) -> Self {
        Self {
            margin: config.margin,
            scale: config.scale,
            w: plot.width * config.scale,
            h: plot.length * config.scale,
        }
    }

    /// Meters from the plot origin to a pixel coordinate.
    fn px(&self, meters: f64) -> f64 {
        self.margin + meters * self.scale
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.margin
            && x <= self.margin + self.w
            && y >= self.margin
            && y <= self.margin + self.h
    }
}

/// Primitives grouped by draw order.
#[derive(Default)]
struct Layers {
    areas: Vec<Primitive>,
    trees: Vec<Primitive>,
    dots: Vec<Primitive>,
}

// ── Entry point ─────────────────────────────────────────────────────────

/// Place zones on the plot for the given formation.
///
/// Pure apart from the draws taken from `rng`; identical inputs and an
/// identically seeded RNG yield identical layouts.
pub fn place<R: Rng + ?Sized>(
    plot: &PlotSpec,
    zones: &[Zone],
    formation: FormationMode,
    config: &LayoutConfig,
    rng: &mut R,
) -> Layout {
    let frame = Frame::new(plot, config);
    let tree_zones: Vec<&Zone> = zones.iter().filter(|z| z.kind == ZoneKind::Tree).collect();
    let crop_zones: Vec<&Zone> = zones.iter().filter(|z| z.kind == ZoneKind::Crop).collect();

    let variant = match (tree_zones.first(), crop_zones.is_empty()) {
        (Some(_), true) => LayoutVariant::TreesOnlyGrid,
        _ => match formation {
            FormationMode::Block => LayoutVariant::Block,
            FormationMode::Intercropping => LayoutVariant::Intercropping,
            FormationMode::Alley => LayoutVariant::Alley,
        },
    };

    let mut layers = Layers::default();
    match variant {
        LayoutVariant::TreesOnlyGrid => {
            if let Some(tree) = tree_zones.first() {
                place_tree_grid(&frame, plot, tree, config, &mut layers);
            }
        }
        LayoutVariant::Block => {
            if let Some(tree) = tree_zones.first() {
                place_border_trees(&frame, plot, tree, config, &mut layers);
            }
            if let Some(crop) = crop_zones.first() {
                place_block_interior(&frame, crop, config, rng, &mut layers);
            }
        }
        LayoutVariant::Intercropping => {
            place_stripes(&frame, &crop_zones, config, rng, &mut layers);
        }
        LayoutVariant::Alley => {
            if let Some(tree) = tree_zones.first() {
                let crop = crop_zones.first().copied();
                place_alleys(&frame, plot, tree, crop, config, rng, &mut layers);
            }
        }
    }

    let mut primitives = Vec::with_capacity(
        layers.areas.len() + layers.trees.len() + layers.dots.len() + 3,
    );
    primitives.push(plot_outline(&frame, config));
    primitives.append(&mut layers.areas);
    primitives.append(&mut layers.trees);
    primitives.append(&mut layers.dots);
    primitives.extend(captions(&frame, plot, formation, variant, config));

    log::debug!(
        "placed {:?} layout: {} primitives for {} zones",
        variant,
        primitives.len(),
        zones.len()
    );

    Layout {
        variant,
        canvas_width: frame.w + 2.0 * frame.margin,
        canvas_height: frame.h + 2.0 * frame.margin,
        primitives,
        legend: legend(zones),
    }
}

// ── Variants ────────────────────────────────────────────────────────────

fn place_tree_grid(
    frame: &Frame,
    plot: &PlotSpec,
    tree: &Zone,
    config: &LayoutConfig,
    layers: &mut Layers,
) {
    let spacing = zone_spacing(tree);
    layers.areas.push(Primitive::Rect {
        role: PrimitiveRole::Background,
        x: frame.margin,
        y: frame.margin,
        width: frame.w,
        height: frame.h,
        fill: tree.color.clone(),
        opacity: 0.3,
        stroke: tree.color.clone(),
        stroke_width: 1.0,
    });

    let (cols, rows) = (grid_count(plot.width, spacing), grid_count(plot.length, spacing));
    for i in 0..cols {
        for j in 0..rows {
            let x = frame.px((i as f64 + 0.5) * spacing);
            let y = frame.px((j as f64 + 0.5) * spacing);
            push_tree(frame, tree, config, 1.0, x, y, layers);
        }
    }
}

fn place_border_trees(
    frame: &Frame,
    plot: &PlotSpec,
    tree: &Zone,
    config: &LayoutConfig,
    layers: &mut Layers,
) {
    let spacing = zone_spacing(tree);
    let band = spacing * frame.scale;
    let (m, w, h) = (frame.margin, frame.w, frame.h);

    // top, bottom, left, right
    for (x, y, width, height) in [
        (m, m, w, band),
        (m, m + h - band, w, band),
        (m, m, band, h),
        (m + w - band, m, band, h),
    ] {
        layers.areas.push(Primitive::Rect {
            role: PrimitiveRole::BorderStrip,
            x,
            y,
            width,
            height,
            fill: tree.color.clone(),
            opacity: 0.5,
            stroke: tree.color.clone(),
            stroke_width: 1.0,
        });
    }

    // Corner trees are counted on both strips.
    for i in 0..grid_count(plot.width, spacing) {
        let x = frame.px((i as f64 + 0.5) * spacing);
        push_tree(frame, tree, config, 1.5, x, m + band / 2.0, layers);
        push_tree(frame, tree, config, 1.5, x, m + h - band / 2.0, layers);
    }
    for j in 0..grid_count(plot.length, spacing) {
        let y = frame.px((j as f64 + 0.5) * spacing);
        push_tree(frame, tree, config, 1.5, m + band / 2.0, y, layers);
        push_tree(frame, tree, config, 1.5, m + w - band / 2.0, y, layers);
    }
}

fn place_block_interior<R: Rng + ?Sized>(
    frame: &Frame,
    crop: &Zone,
    config: &LayoutConfig,
    rng: &mut R,
    layers: &mut Layers,
) {
    let inset = zone_spacing(crop) * frame.scale;
    let x = frame.margin + inset;
    let y = frame.margin + inset;
    let width = frame.w - 2.0 * inset;
    let height = frame.h - 2.0 * inset;
    if width <= 0.0 || height <= 0.0 {
        log::warn!(
            "crop spacing {}m leaves no block interior on a {}x{}px plot",
            crop.spacing_meters,
            frame.w,
            frame.h
        );
        return;
    }

    layers.areas.push(Primitive::Rect {
        role: PrimitiveRole::CropArea,
        x,
        y,
        width,
        height,
        fill: crop.color.clone(),
        opacity: 0.4,
        stroke: config.crop_stroke.clone(),
        stroke_width: 1.0,
    });

    let dots = crop.count.min(BLOCK_MAX_DOTS);
    scatter(rng, (x, y, width, height), dots, crop, config, layers);
}

fn place_stripes<R: Rng + ?Sized>(
    frame: &Frame,
    crops: &[&Zone],
    config: &LayoutConfig,
    rng: &mut R,
    layers: &mut Layers,
) {
    if crops.is_empty() {
        return;
    }
    let stripe_w = frame.w / crops.len() as f64;

    for (k, crop) in crops.iter().enumerate() {
        let x = frame.margin + k as f64 * stripe_w;
        layers.areas.push(Primitive::Rect {
            role: PrimitiveRole::Stripe,
            x,
            y: frame.margin,
            width: stripe_w,
            height: frame.h,
            fill: crop.color.clone(),
            opacity: 0.4,
            stroke: config.crop_stroke.clone(),
            stroke_width: 2.0,
        });

        let dots = crop.count.div_ceil(10).min(STRIPE_MAX_DOTS);
        scatter(rng, (x, frame.margin, stripe_w, frame.h), dots, crop, config, layers);
    }
}

fn place_alleys<R: Rng + ?Sized>(
    frame: &Frame,
    plot: &PlotSpec,
    tree: &Zone,
    crop: Option<&Zone>,
    config: &LayoutConfig,
    rng: &mut R,
    layers: &mut Layers,
) {
    let spacing = zone_spacing(tree);
    let row_px = spacing * frame.scale;
    let rows = grid_count(plot.length, spacing);
    let per_row = grid_count(plot.width, spacing);
    let row_y = |j: usize| frame.margin + j as f64 * row_px;

    for j in 0..rows {
        let y = row_y(j);
        layers.trees.push(Primitive::Line {
            role: PrimitiveRole::TreeRow,
            points: vec![[frame.margin, y], [frame.margin + frame.w, y]],
            stroke: tree.color.clone(),
            stroke_width: 3.0,
            closed: false,
        });
        for i in 0..per_row {
            let x = frame.px((i as f64 + 0.5) * spacing);
            push_tree(frame, tree, config, 1.5, x, y, layers);
        }
    }

    let Some(crop) = crop else {
        return;
    };
    for j in 0..rows.saturating_sub(1) {
        let y = row_y(j);
        layers.areas.push(Primitive::Rect {
            role: PrimitiveRole::AlleyStrip,
            x: frame.margin,
            y,
            width: frame.w,
            height: row_px,
            fill: crop.color.clone(),
            opacity: 0.4,
            stroke: config.crop_stroke.clone(),
            stroke_width: 1.0,
        });

        let dots = crop.count.min(ALLEY_MAX_DOTS);
        scatter(rng, (frame.margin, y, frame.w, row_px), dots, crop, config, layers);
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────

/// Zone spacing, or the kind default if the zone carries a non-positive one.
fn zone_spacing(zone: &Zone) -> f64 {
    if zone.spacing_meters.is_finite() && zone.spacing_meters > 0.0 {
        zone.spacing_meters
    } else {
        default_spacing(zone.kind.is_tree())
    }
}

/// Number of grid steps along `extent_m`, at least 1 and at most [`MAX_GRID_STEPS`].
fn grid_count(extent_m: f64, spacing_m: f64) -> usize {
    let steps = ((extent_m / spacing_m).floor() as usize).max(1);
    if steps > MAX_GRID_STEPS {
        log::warn!(
            "{steps} grid steps for {extent_m}m at {spacing_m}m spacing, capping at {MAX_GRID_STEPS}"
        );
        return MAX_GRID_STEPS;
    }
    steps
}

/// Push a tree marker unless it falls outside the plot.
fn push_tree(
    frame: &Frame,
    tree: &Zone,
    config: &LayoutConfig,
    stroke_width: f64,
    x: f64,
    y: f64,
    layers: &mut Layers,
) {
    if !frame.contains(x, y) {
        return;
    }
    layers.trees.push(Primitive::Circle {
        role: PrimitiveRole::Tree,
        x,
        y,
        radius: config.tree_radius,
        fill: tree.color.clone(),
        opacity: 1.0,
        stroke: Some(config.tree_stroke.clone()),
        stroke_width,
    });
}

/// Scatter `count` crop dots uniformly inside `(x, y, width, height)`.
fn scatter<R: Rng + ?Sized>(
    rng: &mut R,
    (x, y, width, height): (f64, f64, f64, f64),
    count: u32,
    crop: &Zone,
    config: &LayoutConfig,
    layers: &mut Layers,
) {
    for _ in 0..count {
        let dx = rng.gen::<f64>() * width;
        let dy = rng.gen::<f64>() * height;
        layers.dots.push(Primitive::Circle {
            role: PrimitiveRole::CropDot,
            x: x + dx,
            y: y + dy,
            radius: config.dot_radius,
            fill: crop.color.clone(),
            opacity: config.dot_opacity,
            stroke: None,
            stroke_width: 0.0,
        });
    }
}

fn plot_outline(frame: &Frame, config: &LayoutConfig) -> Primitive {
    let (m, w, h) = (frame.margin, frame.w, frame.h);
    Primitive::Line {
        role: PrimitiveRole::PlotOutline,
        points: vec![[m, m], [m + w, m], [m + w, m + h], [m, m + h], [m, m]],
        stroke: config.tree_stroke.clone(),
        stroke_width: 3.0,
        closed: true,
    }
}

fn captions(
    frame: &Frame,
    plot: &PlotSpec,
    formation: FormationMode,
    variant: LayoutVariant,
    config: &LayoutConfig,
) -> Vec<Primitive> {
    let y = frame.margin - config.caption_offset;
    let mut labels = vec![Primitive::Label {
        role: PrimitiveRole::Caption,
        x: frame.margin,
        y,
        text: format!(
            "Scale: 1px ≈ {:.2}m | Plot: {}m W × {}m L | {}",
            1.0 / frame.scale,
            plot.width,
            plot.length,
            formation.label()
        ),
    }];
    if variant == LayoutVariant::TreesOnlyGrid {
        labels.push(Primitive::Label {
            role: PrimitiveRole::Caption,
            x: frame.margin + frame.w - 200.0,
            y,
            text: "Trees Only (Grid Layout)".to_string(),
        });
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::from_manual_selection;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plot_with(width: f64, length: f64, trees: &[&str], crops: &[&str]) -> PlotSpec {
        PlotSpec {
            width,
            length,
            trees: trees.iter().map(|s| s.to_string()).collect(),
            crops: crops.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn layout_for(plot: &PlotSpec, formation: FormationMode, seed: u64) -> Layout {
        let zones = from_manual_selection(plot);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        place(plot, &zones, formation, &LayoutConfig::default(), &mut rng)
    }

    fn rect_bounds(p: &Primitive) -> (f64, f64, f64, f64) {
        match p {
            Primitive::Rect {
                x, y, width, height, ..
            } => (*x, *y, *width, *height),
            other => panic!("expected rect, got {other:?}"),
        }
    }

    fn center(p: &Primitive) -> (f64, f64) {
        match p {
            Primitive::Circle { x, y, .. } => (*x, *y),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn test_block_has_four_borders_and_interior() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let layout = layout_for(&plot, FormationMode::Block, 1);

        assert_eq!(layout.variant, LayoutVariant::Block);
        assert_eq!(layout.count_role(PrimitiveRole::BorderStrip), 4);
        assert_eq!(layout.count_role(PrimitiveRole::CropArea), 1);
        // 5 per top/bottom strip, 8 per left/right strip
        assert_eq!(layout.count_role(PrimitiveRole::Tree), 2 * 5 + 2 * 8);
        assert_eq!(layout.count_role(PrimitiveRole::CropDot), 40);
    }

    #[test]
    fn test_block_geometry() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let layout = layout_for(&plot, FormationMode::Block, 1);

        let strips: Vec<_> = layout
            .with_role(PrimitiveRole::BorderStrip)
            .map(rect_bounds)
            .collect();
        assert_eq!(strips[0], (60.0, 60.0, 90.0, 18.0));
        assert_eq!(strips[1], (60.0, 192.0, 90.0, 18.0));
        assert_eq!(strips[2], (60.0, 60.0, 18.0, 150.0));
        assert_eq!(strips[3], (132.0, 60.0, 18.0, 150.0));

        let (x, y, w, h) = rect_bounds(layout.with_role(PrimitiveRole::CropArea).next().unwrap());
        assert_relative_eq!(x, 62.25);
        assert_relative_eq!(y, 62.25);
        assert_relative_eq!(w, 85.5);
        assert_relative_eq!(h, 145.5);

        for dot in layout.with_role(PrimitiveRole::CropDot) {
            let (dx, dy) = center(dot);
            assert!(dx >= x && dx <= x + w && dy >= y && dy <= y + h);
        }
    }

    #[test]
    fn test_block_dots_capped_by_count() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let mut zones = from_manual_selection(&plot);
        zones[1].count = 12;
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let layout = place(&plot, &zones, FormationMode::Block, &LayoutConfig::default(), &mut rng);
        assert_eq!(layout.count_role(PrimitiveRole::CropDot), 12);
    }

    #[test]
    fn test_intercropping_stripes_fill_width() {
        let plot = plot_with(30.0, 50.0, &["neem"], &["maize", "ragi", "legumes"]);
        let layout = layout_for(&plot, FormationMode::Intercropping, 7);

        assert_eq!(layout.variant, LayoutVariant::Intercropping);
        let stripes: Vec<_> = layout.with_role(PrimitiveRole::Stripe).map(rect_bounds).collect();
        assert_eq!(stripes.len(), 3);
        let total: f64 = stripes.iter().map(|s| s.2).sum();
        assert_relative_eq!(total, 90.0, epsilon = 1e-9);
        assert_eq!(layout.count_role(PrimitiveRole::Tree), 0);
        // every crop count here exceeds 350, so each stripe hits the cap
        assert_eq!(layout.count_role(PrimitiveRole::CropDot), 3 * 35);
    }

    #[test]
    fn test_intercropping_dots_stay_in_stripe() {
        let plot = plot_with(30.0, 50.0, &[], &["maize", "cotton"]);
        let mut zones = from_manual_selection(&plot);
        zones[0].count = 41; // ceil(41 / 10) = 5 dots
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let config = LayoutConfig::default();
        let layout = place(&plot, &zones, FormationMode::Intercropping, &config, &mut rng);

        let dots: Vec<_> = layout.with_role(PrimitiveRole::CropDot).map(center).collect();
        assert_eq!(dots.len(), 5 + 35);
        for (x, _) in &dots[..5] {
            assert!(*x >= 60.0 && *x <= 105.0);
        }
        for (x, _) in &dots[5..] {
            assert!(*x >= 105.0 && *x <= 150.0);
        }
    }

    #[test]
    fn test_alley_rows_and_strips() {
        let plot = plot_with(30.0, 30.0, &["mango"], &["maize"]);
        let layout = layout_for(&plot, FormationMode::Alley, 5);

        assert_eq!(layout.variant, LayoutVariant::Alley);
        assert_eq!(layout.count_role(PrimitiveRole::TreeRow), 5);
        assert_eq!(layout.count_role(PrimitiveRole::AlleyStrip), 4);
        assert_eq!(layout.count_role(PrimitiveRole::Tree), 5 * 5);
        assert_eq!(layout.count_role(PrimitiveRole::CropDot), 4 * 25);

        let strip = rect_bounds(layout.with_role(PrimitiveRole::AlleyStrip).nth(1).unwrap());
        assert_eq!(strip, (60.0, 78.0, 90.0, 18.0));
    }

    #[test]
    fn test_alley_without_crops_uses_grid() {
        let plot = plot_with(30.0, 30.0, &["mango"], &[]);
        let zones = from_manual_selection(&plot);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // no crops → trees-only grid regardless of formation
        let layout = place(&plot, &zones, FormationMode::Alley, &LayoutConfig::default(), &mut rng);
        assert_eq!(layout.variant, LayoutVariant::TreesOnlyGrid);
    }

    #[test]
    fn test_trees_only_grid() {
        let plot = plot_with(30.0, 50.0, &["mango"], &[]);
        for formation in FormationMode::all() {
            let layout = layout_for(&plot, *formation, 9);
            assert_eq!(layout.variant, LayoutVariant::TreesOnlyGrid);
            assert_eq!(layout.count_role(PrimitiveRole::Background), 1);
            assert_eq!(layout.count_role(PrimitiveRole::Tree), 5 * 8);
            assert_eq!(layout.count_role(PrimitiveRole::Caption), 2);
        }
    }

    #[test]
    fn test_points_outside_plot_dropped() {
        // 2m plot with 6m spacing: the single grid point sits at 3m, outside.
        let plot = plot_with(2.0, 2.0, &["mango"], &[]);
        let layout = layout_for(&plot, FormationMode::Block, 0);
        assert_eq!(layout.count_role(PrimitiveRole::Tree), 0);
        assert_eq!(layout.count_role(PrimitiveRole::Background), 1);
    }

    #[test]
    fn test_outline_first_and_canvas_size() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let layout = layout_for(&plot, FormationMode::Block, 2);
        assert_eq!(layout.primitives[0].role(), PrimitiveRole::PlotOutline);
        assert_eq!(layout.canvas_width, 210.0);
        assert_eq!(layout.canvas_height, 270.0);
        assert_eq!(layout.legend.len(), 2);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let a = layout_for(&plot, FormationMode::Block, 42);
        let b = layout_for(&plot, FormationMode::Block, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_only_moves_dots() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let a = layout_for(&plot, FormationMode::Block, 1);
        let b = layout_for(&plot, FormationMode::Block, 2);

        let fixed = |l: &Layout| -> Vec<Primitive> {
            l.primitives
                .iter()
                .filter(|p| p.role() != PrimitiveRole::CropDot)
                .cloned()
                .collect()
        };
        assert_eq!(fixed(&a), fixed(&b));
        assert_ne!(a.primitives, b.primitives);
    }

    #[test]
    fn test_no_zones_draws_frame_only() {
        let plot = plot_with(30.0, 50.0, &[], &[]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let layout = place(&plot, &[], FormationMode::Block, &LayoutConfig::default(), &mut rng);
        assert_eq!(layout.primitives.len(), 2);
        assert!(layout.legend.is_empty());
    }

    #[test]
    fn test_block_crops_only() {
        let plot = plot_with(30.0, 50.0, &[], &["maize"]);
        let layout = layout_for(&plot, FormationMode::Block, 4);

        assert_eq!(layout.variant, LayoutVariant::Block);
        assert_eq!(layout.count_role(PrimitiveRole::BorderStrip), 0);
        assert_eq!(layout.count_role(PrimitiveRole::Tree), 0);
        assert_eq!(layout.count_role(PrimitiveRole::CropArea), 1);
        assert!(layout.count_role(PrimitiveRole::CropDot) <= BLOCK_MAX_DOTS as usize);
    }

    #[test]
    fn test_alley_without_trees_draws_frame_only() {
        let plot = plot_with(30.0, 50.0, &[], &["sorghum"]);
        let layout = layout_for(&plot, FormationMode::Alley, 4);

        assert_eq!(layout.variant, LayoutVariant::Alley);
        assert_eq!(layout.count_role(PrimitiveRole::AlleyStrip), 0);
        assert_eq!(layout.count_role(PrimitiveRole::TreeRow), 0);
        assert_eq!(layout.count_role(PrimitiveRole::CropDot), 0);
        assert_eq!(layout.count_role(PrimitiveRole::PlotOutline), 1);
        assert_eq!(layout.count_role(PrimitiveRole::Caption), 1);
        assert_eq!(layout.primitives.len(), 2);
        assert_eq!(layout.legend.len(), 1);
    }

    #[test]
    fn test_wide_crop_spacing_leaves_no_interior() {
        let plot = plot_with(30.0, 50.0, &["mango"], &["maize"]);
        let mut zones = from_manual_selection(&plot);
        zones[1].spacing_meters = 20.0;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let config = LayoutConfig::default();
        let layout = place(&plot, &zones, FormationMode::Block, &config, &mut rng);

        assert_eq!(layout.count_role(PrimitiveRole::BorderStrip), 4);
        assert_eq!(layout.count_role(PrimitiveRole::CropArea), 0);
        assert_eq!(layout.count_role(PrimitiveRole::CropDot), 0);
    }

    #[test]
    fn test_tiny_tree_spacing_caps_grid() {
        let plot = plot_with(30.0, 50.0, &["tamarind"], &[]);
        let mut zones = from_manual_selection(&plot);
        zones[0].spacing_meters = 0.01;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let config = LayoutConfig::default();
        let layout = place(&plot, &zones, FormationMode::Block, &config, &mut rng);

        assert_eq!(layout.variant, LayoutVariant::TreesOnlyGrid);
        assert_eq!(layout.count_role(PrimitiveRole::Tree), MAX_GRID_STEPS * MAX_GRID_STEPS);
    }

    #[test]
    fn test_grid_count_bounds() {
        assert_eq!(grid_count(30.0, 6.0), 5);
        assert_eq!(grid_count(3.0, 6.0), 1);
        assert_eq!(grid_count(30.0, 0.01), MAX_GRID_STEPS);
    }

    #[test]
    fn test_primitive_json_shape() {
        let json = serde_json::to_value(Primitive::Label {
            role: PrimitiveRole::Caption,
            x: 1.0,
            y: 2.0,
            text: "hi".into(),
        })
        .unwrap();
        assert_eq!(json["shape"], "label");
        assert_eq!(json["role"], "caption");
    }
}
