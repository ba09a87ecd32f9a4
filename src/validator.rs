//! Pure schema validation for candidate service output.
//!
//! The validator runs on the generic [`serde_json::Value`] produced by each
//! extraction attempt, after the normalizer's repair pass. It reports the
//! *first* violation only; the repair loop feeds that single violation back
//! to the service, keeping the correction message focused. A value this
//! module accepts is guaranteed to deserialize into [`crate::schema::RfqItems`].

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::{Form, MaterialType, Qualification};
use crate::schema::{quantity_regex, ITEMS_KEY};

/// A single divergence from the line-item contract: where, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSONPath-style location, e.g. `$.items[1].quantity`.
    pub path: String,
    /// Human-readable statement of the expected contract.
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for SchemaViolation {}

const REQUIRED_FIELDS: [&str; 7] = [
    "material_type",
    "material_spec",
    "form",
    "dimensions",
    "quantity",
    "qualification",
    "notes",
];

const KNOWN_FIELDS: [&str; 9] = [
    "material_type",
    "material_spec",
    "form",
    "dimensions",
    "quantity",
    "qualification",
    "notes",
    "confidence",
    "item_index",
];

/// Checks a candidate value against the line-item contract.
///
/// Check order: root shape, items cardinality, then per entry: required
/// fields present, field values conform, no unexpected fields. Returns the
/// first violation found.
pub fn validate_items(value: &Value) -> Result<(), SchemaViolation> {
    let root = value.as_object().ok_or_else(|| {
        SchemaViolation::new("$", "expected a JSON object with an 'items' array")
    })?;

    let items = root.get(ITEMS_KEY).ok_or_else(|| {
        SchemaViolation::new("$", "missing required root key 'items'")
    })?;

    let items = items.as_array().ok_or_else(|| {
        SchemaViolation::new("$.items", "'items' must be an array of line item objects")
    })?;

    if items.is_empty() {
        return Err(SchemaViolation::new(
            "$.items",
            "'items' must contain at least one line item",
        ));
    }

    for key in root.keys() {
        if key != ITEMS_KEY {
            return Err(SchemaViolation::new(
                format!("$.{key}"),
                "unexpected root field; the only root key is 'items'",
            ));
        }
    }

    for (idx, entry) in items.iter().enumerate() {
        validate_entry(idx, entry)?;
    }

    Ok(())
}

fn validate_entry(idx: usize, entry: &Value) -> Result<(), SchemaViolation> {
    let at = |field: &str| format!("$.items[{idx}].{field}");

    let obj = entry.as_object().ok_or_else(|| {
        SchemaViolation::new(format!("$.items[{idx}]"), "each item must be a JSON object")
    })?;

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(field) {
            return Err(SchemaViolation::new(
                at(field),
                format!("missing required field '{field}'"),
            ));
        }
    }

    let material = &obj["material_type"];
    if MaterialType::deserialize(material).is_err() {
        return Err(SchemaViolation::new(
            at("material_type"),
            format!("must be one of: {}", enum_names(&MaterialType::ALL.map(|m| m.as_str()))),
        ));
    }

    check_nonempty_string(&obj["material_spec"], at("material_spec"))?;

    if Form::deserialize(&obj["form"]).is_err() {
        return Err(SchemaViolation::new(
            at("form"),
            format!("must be one of: {}", enum_names(&Form::ALL.map(|f| f.as_str()))),
        ));
    }

    check_nonempty_string(&obj["dimensions"], at("dimensions"))?;

    match obj["quantity"].as_str() {
        Some(quantity) if quantity_regex().is_match(quantity) => {}
        _ => {
            return Err(SchemaViolation::new(
                at("quantity"),
                "must be a string of a number followed by a unit, e.g. '10 pcs'",
            ));
        }
    }

    if Qualification::deserialize(&obj["qualification"]).is_err() {
        return Err(SchemaViolation::new(
            at("qualification"),
            format!(
                "must be one of: {}",
                enum_names(&Qualification::ALL.map(|q| q.as_str()))
            ),
        ));
    }

    if !obj["notes"].is_string() {
        return Err(SchemaViolation::new(at("notes"), "must be a string"));
    }

    if let Some(confidence) = obj.get("confidence") {
        match confidence.as_f64() {
            Some(c) if (0.0..=1.0).contains(&c) => {}
            _ => {
                return Err(SchemaViolation::new(
                    at("confidence"),
                    "must be a number between 0.0 and 1.0",
                ));
            }
        }
    }

    if let Some(item_index) = obj.get("item_index") {
        if item_index.as_u64().is_none() {
            return Err(SchemaViolation::new(
                at("item_index"),
                "must be a non-negative integer",
            ));
        }
    }

    for key in obj.keys() {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            return Err(SchemaViolation::new(
                at(key),
                format!("unexpected field '{key}'"),
            ));
        }
    }

    Ok(())
}

fn check_nonempty_string(value: &Value, path: String) -> Result<(), SchemaViolation> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SchemaViolation::new(path, "must be a non-empty string")),
    }
}

fn enum_names(names: &[&str]) -> String {
    names.join(", ")
}
