//! Advisory boundary — what we send to the recommendation service and how we
//! read what comes back.
//!
//! The service itself is external; this module only models the exchange:
//! - [`AdvisoryRequest`]: parameters derived from a [`PlotSpec`]
//! - [`AdvisoryResponse`]: a tolerant model of the JSON reply
//! - [`RequestTracker`]: generation tokens so a superseded reply is never applied
//! - [`AdvisoryClient`]: the seam where a real service plugs in
//!
//! Replies are produced by a language model, so parsing is forgiving: code
//! fences are stripped, unknown fields ignored, and a malformed zone entry
//! degrades to an empty entry instead of failing the whole reply.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::plot::{FormationMode, PlotSpec, SoilType, WaterSource};
use crate::spacing::SpacingValue;

/// Failure of the advisory call itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisoryError {
    /// The service could not be reached or is not configured.
    #[error("advisory service unavailable: {0}")]
    Unavailable(String),
    /// The reply was not a JSON object.
    #[error("advisory reply is not valid JSON: {0}")]
    Malformed(String),
}

// ============================================================================
// REQUEST
// ============================================================================

/// Parameters sent to the advisory service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryRequest {
    pub district: String,
    pub width: f64,
    pub length: f64,
    pub area: f64,
    pub soil: SoilType,
    pub rainfall: f64,
    pub water_source: WaterSource,
    pub formation: FormationMode,
    pub tree_types: u32,
    pub crop_types: u32,
}

impl AdvisoryRequest {
    pub fn from_plot(plot: &PlotSpec) -> Self {
        let district = plot
            .district
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("Not specified")
            .to_string();
        Self {
            district,
            width: plot.width,
            length: plot.length,
            area: plot.area(),
            soil: plot.soil,
            rainfall: plot.rainfall,
            water_source: plot.water_source,
            formation: plot.formation,
            tree_types: plot.num_trees,
            crop_types: plot.num_crops,
        }
    }
}

/// Something that can answer an [`AdvisoryRequest`] with raw reply text.
pub trait AdvisoryClient {
    fn recommend(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError>;
}

/// Client that always returns the same reply. Used by tests and the harness.
#[derive(Debug, Clone)]
pub struct CannedAdvisor {
    reply: Result<String, AdvisoryError>,
}

impl CannedAdvisor {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
        }
    }

    pub fn failing(error: AdvisoryError) -> Self {
        Self { reply: Err(error) }
    }
}

impl AdvisoryClient for CannedAdvisor {
    fn recommend(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        log::debug!(
            "canned advisory reply for {} ({}m × {}m)",
            request.district,
            request.width,
            request.length
        );
        self.reply.clone()
    }
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Parsed advisory reply. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdvisoryResponse {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub zones: Vec<RawZoneEntry>,
    #[serde(default, deserialize_with = "lenient_formation")]
    pub formation: Option<FormationMode>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub tips: Vec<Value>,
    #[serde(default)]
    pub water_assessment: Option<Value>,
    #[serde(default)]
    pub regional_insights: Option<Value>,
    #[serde(default)]
    pub economic: Option<Value>,
}

/// One element of the reply's `zones` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawZoneEntry {
    #[serde(default, deserialize_with = "lenient_details")]
    pub tree_details: Option<RawPlantDetails>,
    #[serde(default, deserialize_with = "lenient_details")]
    pub crop_details: Option<RawPlantDetails>,
    #[serde(default, deserialize_with = "lenient_formation")]
    pub formation: Option<FormationMode>,
}

/// Species details as described by the advisory service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlantDetails {
    /// Free-text species name.
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub species: Option<String>,
    #[serde(default, deserialize_with = "lenient_spacing")]
    pub spacing_meters: Option<SpacingValue>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: Option<String>,
}

impl AdvisoryResponse {
    /// Formation requested by the reply, if any. The last zone-level
    /// override wins over the top-level field.
    pub fn formation_override(&self) -> Option<FormationMode> {
        self.zones
            .iter()
            .rev()
            .find_map(|z| z.formation)
            .or(self.formation)
    }

    /// Tips as display strings, empty ones removed.
    pub fn normalized_tips(&self) -> Vec<String> {
        self.tips
            .iter()
            .map(|tip| match tip {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    /// The `economic.crop` yield note, when the reply carries one.
    pub fn yield_note(&self) -> Option<String> {
        self.economic
            .as_ref()?
            .get("crop")?
            .as_str()
            .map(str::to_string)
    }
}

/// Parse raw reply text into an [`AdvisoryResponse`].
///
/// Markdown code fences around the JSON are removed first. Anything that
/// isn't a JSON object is [`AdvisoryError::Malformed`].
pub fn parse_response(text: &str) -> Result<AdvisoryResponse, AdvisoryError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let value: Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(AdvisoryError::Malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    let response: AdvisoryResponse =
        serde_json::from_value(value).map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
    log::debug!(
        "parsed advisory reply: {} zone entries, {} tips",
        response.zones.len(),
        response.tips.len()
    );
    Ok(response)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Lenient field readers ───────────────────────────────────────────────
//
// Each reader accepts any JSON value and keeps what it can use.

fn lenient_entries<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<RawZoneEntry>, D::Error> {
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).unwrap_or_else(|e| {
                log::warn!("ignoring malformed zone entry: {e}");
                RawZoneEntry::default()
            })
        })
        .collect())
}

fn lenient_details<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawPlantDetails>, D::Error> {
    let value = Value::deserialize(d)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

fn lenient_formation<'de, D: Deserializer<'de>>(d: D) -> Result<Option<FormationMode>, D::Error> {
    let value = Value::deserialize(d)?;
    let Some(text) = value.as_str() else {
        return Ok(None);
    };
    let formation = FormationMode::from_id(text);
    if formation.is_none() {
        log::warn!("ignoring unknown formation override {text:?}");
    }
    Ok(formation)
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite()))
}

fn lenient_spacing<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SpacingValue>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().map(SpacingValue::Number),
        Value::String(s) => Some(SpacingValue::Text(s)),
        _ => None,
    })
}

// ============================================================================
// REQUEST GENERATIONS
// ============================================================================

/// Identifies one advisory request. Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Hands out request tokens and tells whether a reply is still current.
///
/// Each submission calls [`issue`](Self::issue) before starting its advisory
/// call; when the reply arrives, [`resolve`](Self::resolve) passes it through
/// only if no newer submission has been issued since.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; all earlier tokens become stale.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// True if `token` is the most recently issued one.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }

    /// Return `result` if `token` is current, otherwise drop it.
    pub fn resolve<T>(&self, token: RequestToken, result: T) -> Option<T> {
        if self.is_current(token) {
            Some(result)
        } else {
            log::debug!(
                "discarding stale advisory reply (generation {}, latest {})",
                token.0,
                self.latest.load(Ordering::Acquire)
            );
            None
        }
    }
}
