//! Spacing conversion — advisory spacing values to meters and back.
//!
//! Advisory replies describe plant spacing either as a bare number (meters)
//! or as free text such as `"50cm"` or `"6 m"`. Anything that doesn't carry a
//! recognizable unit falls back to the per-kind default instead of failing.

use serde::{Deserialize, Serialize};

/// Default spacing for trees when none can be parsed.
pub const DEFAULT_TREE_SPACING_M: f64 = 6.0;
/// Default spacing for crops when none can be parsed.
pub const DEFAULT_CROP_SPACING_M: f64 = 0.75;

/// A spacing value as it arrives from an advisory reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpacingValue {
    /// Already in meters.
    Number(f64),
    /// Free text with an optional unit suffix.
    Text(String),
}

/// Per-kind default spacing in meters.
pub fn default_spacing(is_tree: bool) -> f64 {
    if is_tree {
        DEFAULT_TREE_SPACING_M
    } else {
        DEFAULT_CROP_SPACING_M
    }
}

/// Parse a spacing value into meters.
///
/// Numbers pass through unchanged. Missing or blank values, text without a
/// `cm`/`m` unit, and text without a leading number all resolve to the
/// per-kind default.
pub fn parse_spacing(value: Option<&SpacingValue>, is_tree: bool) -> f64 {
    let text = match value {
        Some(SpacingValue::Number(n)) => return *n,
        Some(SpacingValue::Text(s)) if !s.is_empty() => s.to_lowercase(),
        _ => return default_spacing(is_tree),
    };
    let text = text.trim();

    let Some(number) = leading_number(text) else {
        return default_spacing(is_tree);
    };

    if text.contains("cm") {
        number / 100.0
    } else if text.contains('m') {
        number
    } else {
        default_spacing(is_tree)
    }
}

/// Format meters for display: `"6m"`, `"1.5m"`, `"50cm"`.
pub fn format_spacing(meters: f64) -> String {
    if meters >= 1.0 {
        format!("{}m", meters)
    } else {
        format!("{}cm", (meters * 100.0).round() as i64)
    }
}

/// Extract the leading decimal number of `text`, if any.
fn leading_number(text: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    text[..end].trim_end_matches('.').parse().ok()
}
