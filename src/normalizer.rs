//! Best-effort structural repair for near-miss service output.
//!
//! Generative services routinely mislabel the root key, alias field names,
//! or return a bare object where a list is expected. This pass reshapes
//! those cosmetic divergences into the canonical `{"items": [...]}` form
//! using only declared, statically-ordered alias tables — it never guesses
//! domain semantics and never rewrites a value (a `"10"` stays `"10"` and
//! fails validation honestly). Normalizing an already-canonical value is a
//! byte-for-byte no-op.

use serde_json::{Map, Value};

use crate::schema::ITEMS_KEY;

/// Root keys accepted as standing in for `items`, probed in order.
pub const ROOT_KEY_ALIASES: [&str; 7] = [
    "items",
    "Items",
    "ITEMS",
    "rfq_items",
    "RFQ_items",
    "line_items",
    "lineItems",
];

/// Alternate field spellings, remapped to the canonical name only when the
/// canonical field is absent. Order is the consultation order.
pub const FIELD_ALIASES: [(&str, &str); 10] = [
    ("material", "material_type"),
    ("form_type", "form"),
    ("shape", "form"),
    ("spec", "material_spec"),
    ("size", "dimensions"),
    ("dimension", "dimensions"),
    ("qty", "quantity"),
    ("remarks", "notes"),
    ("note", "notes"),
    ("qualification_level", "qualification"),
];

/// Fields whose presence marks an object as "looks like a line item", used
/// to decide whether a bare root object should be wrapped into a list.
const MATERIAL_MARKERS: [&str; 2] = ["material_type", "material"];

const DEFAULT_CONFIDENCE: f64 = 0.9;
const DEFAULT_QUALIFICATION: &str = "ISO";

/// Reshapes `value` toward the canonical `{"items": [...]}` form.
///
/// Values that cannot be safely recognized are returned unchanged so they
/// fail validation with an honest diagnostic instead of a masked one.
pub fn normalize(value: &Value) -> Value {
    let Some(items) = resolve_items(value) else {
        return value.clone();
    };

    let items = items
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| normalize_entry(idx, entry))
        .collect();

    let mut root = Map::new();
    root.insert(ITEMS_KEY.to_string(), Value::Array(items));
    Value::Object(root)
}

/// Locates the items list: canonical key, alias keys, a bare array root, or
/// a root object that is itself a single line item.
fn resolve_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(entries) => Some(entries.clone()),
        Value::Object(root) => {
            for key in ROOT_KEY_ALIASES {
                match root.get(key) {
                    Some(Value::Array(entries)) => return Some(entries.clone()),
                    // Scalar-to-list coercion: a lone object under the items
                    // key becomes a one-element list, never the reverse.
                    Some(Value::Object(single)) => {
                        return Some(vec![Value::Object(single.clone())]);
                    }
                    _ => {}
                }
            }

            if MATERIAL_MARKERS.iter().any(|marker| root.contains_key(*marker)) {
                return Some(vec![value.clone()]);
            }

            None
        }
        _ => None,
    }
}

fn normalize_entry(idx: usize, entry: Value) -> Value {
    let mut obj = match entry {
        Value::Object(obj) => obj,
        other => return other,
    };

    for (alias, canonical) in FIELD_ALIASES {
        if !obj.contains_key(alias) {
            continue;
        }
        // Canonical wins: a recognized alias sitting next to its canonical
        // field is redundant and is dropped rather than consulted.
        if obj.contains_key(canonical) {
            obj.remove(alias);
            continue;
        }
        // `spec` started life as a nested object in early service output;
        // only a plain string can stand in for `material_spec`.
        if alias == "spec" && !obj[alias].is_string() {
            continue;
        }
        if let Some(aliased) = obj.remove(alias) {
            obj.insert(canonical.to_string(), aliased);
        }
    }

    // Optional fields only; a missing required field stays missing and is
    // reported by the validator as a genuine contract violation.
    obj.entry("confidence")
        .or_insert_with(|| Value::from(DEFAULT_CONFIDENCE));
    obj.entry("qualification")
        .or_insert_with(|| Value::from(DEFAULT_QUALIFICATION));
    obj.entry("item_index")
        .or_insert_with(|| Value::from(idx as u64));

    Value::Object(obj)
}
