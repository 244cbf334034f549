//! Machine-readable directives embedded in the model's free-text reply.
//!
//! The model signals structured side effects by terminating a reply with
//! a marker literal followed by a single-line JSON payload. Extraction is
//! a pure string transform: find the first marker, parse the first line
//! after it, and strip the directive from the display text. A malformed
//! payload never fails the turn — the reply is returned untouched,
//! marker included, so the artifact stays visible for debugging.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::coach::model::MealEntry;

/// Marker terminating the onboarding conversation.
pub const SETUP_MARKER: &str = "SETUP_COMPLETE:";

/// Marker confirming a meal was validated.
pub const MEAL_MARKER: &str = "MEAL_LOGGED:";

fn default_setup_calories() -> i64 {
    2000
}
fn default_setup_protein() -> i64 {
    150
}
fn default_setup_carbs() -> i64 {
    200
}
fn default_setup_fat() -> i64 {
    70
}

/// Payload of a `SETUP_COMPLETE:` directive.
///
/// Missing numeric fields fall back to sensible defaults rather than
/// rejecting the directive. `first_name` also accepts the legacy
/// snake_case key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetupPayload {
    #[serde(default = "default_setup_calories")]
    pub calories: i64,
    #[serde(default = "default_setup_protein")]
    pub protein: i64,
    #[serde(default = "default_setup_carbs")]
    pub carbs: i64,
    #[serde(default = "default_setup_fat")]
    pub fat: i64,
    #[serde(default, rename = "firstName", alias = "first_name")]
    pub first_name: String,
}

/// Payload of a `MEAL_LOGGED:` directive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MealPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: i64,
    #[serde(default)]
    pub protein: i64,
    #[serde(default)]
    pub carbs: i64,
    #[serde(default)]
    pub fat: i64,
}

impl From<MealPayload> for MealEntry {
    fn from(payload: MealPayload) -> Self {
        MealEntry {
            name: payload.name,
            calories: payload.calories,
            protein: payload.protein,
            carbs: payload.carbs,
            fat: payload.fat,
        }
    }
}

/// Extract a `SETUP_COMPLETE:` directive from a raw reply.
///
/// Returns the payload (if present and well-formed) and the text to show
/// the user.
pub fn extract_setup(reply: &str) -> (Option<SetupPayload>, String) {
    extract_directive(reply, SETUP_MARKER)
}

/// Extract a `MEAL_LOGGED:` directive from a raw reply.
pub fn extract_meal(reply: &str) -> (Option<MealPayload>, String) {
    extract_directive(reply, MEAL_MARKER)
}

/// Shared marker algorithm for both directive kinds.
///
/// The candidate payload is the first line after the first marker
/// occurrence. On any parse failure the original text is returned
/// verbatim so the turn never fails on a malformed directive.
fn extract_directive<T: DeserializeOwned>(reply: &str, marker: &str) -> (Option<T>, String) {
    let Some(idx) = reply.find(marker) else {
        return (None, reply.to_string());
    };

    let before = &reply[..idx];
    let after = &reply[idx + marker.len()..];
    let candidate = after.trim().lines().next().unwrap_or("");

    match serde_json::from_str::<T>(candidate) {
        Ok(payload) => (Some(payload), before.trim().to_string()),
        Err(e) => {
            tracing::warn!(marker, error = %e, "Malformed directive payload, leaving reply untouched");
            (None, reply.to_string())
        }
    }
}
