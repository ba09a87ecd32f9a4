//! The line-item contract.
//!
//! These types are both the deserialization target for validated service
//! output and the source of the JSON Schema rendered into the extraction
//! prompt, so the contract the service is shown and the contract the
//! validator enforces can never drift apart.

use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::{Form, MaterialType, Qualification};

/// Canonical root key of a service response.
pub const ITEMS_KEY: &str = "items";

/// A quantity is a number followed by a unit, e.g. `"10 pcs"`.
pub const QUANTITY_PATTERN: &str = r"^[0-9.,]+\s*[A-Za-z]+$";

/// Compiled form of [`QUANTITY_PATTERN`].
pub fn quantity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(QUANTITY_PATTERN).expect("quantity pattern is a valid regex"))
}

fn default_confidence() -> f64 {
    0.9
}

/// One structured material requirement extracted from inquiry text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LineItem {
    #[schemars(description = "Must match the system's material list exactly.")]
    pub material_type: MaterialType,

    #[schemars(description = "The raw material specification string, e.g. '316L'.")]
    pub material_spec: String,

    pub form: Form,

    #[schemars(description = "Original dimension string, preserving symbols and order.")]
    pub dimensions: String,

    #[schemars(
        description = "Number followed by unit, e.g. '10 pcs'. One line item per quantity tier."
    )]
    pub quantity: String,

    #[serde(default)]
    pub qualification: Qualification,

    #[schemars(description = "Inference logic, assumptions, or raw constraints.")]
    pub notes: String,

    #[serde(default = "default_confidence")]
    #[schemars(description = "Extraction confidence between 0.0 and 1.0.")]
    pub confidence: f64,

    #[serde(default)]
    #[schemars(description = "Zero-based position of this item within the inquiry.")]
    pub item_index: usize,
}

/// The canonical root shape: `{"items": [...]}` with at least one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RfqItems {
    pub items: Vec<LineItem>,
}

impl RfqItems {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RfqItems)
    }

    /// Pretty-printed schema for embedding in the extraction prompt.
    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
