//! Deterministic prompt construction.
//!
//! Everything here is a pure function of (catalog, input text): identical
//! inputs always produce identical payloads, so prompt regressions are
//! testable even though the downstream service is not deterministic.

use crate::catalog::OptionCatalog;
use crate::llm::client::ChatMessage;
use crate::schema::RfqItems;
use crate::validator::SchemaViolation;

/// Language used for the parenthetical display names in option lists.
const OPTION_LANG: &str = "zh";

pub const SYSTEM_PROMPT: &str = "You are a professional procurement assistant. \
    You convert raw inquiry text into precise JSON data that conforms exactly to the provided schema.";

/// Builds the user instruction: inquiry text, the allowed enumerations, the
/// domain rules, and the full JSON Schema of the expected output.
pub fn build_user_prompt(catalog: &OptionCatalog, raw_text: &str) -> String {
    let material_opts = catalog.material_options(OPTION_LANG);
    let form_opts = catalog.form_options(OPTION_LANG);
    let schema = RfqItems::schema_as_json().unwrap_or_default();

    format!(
        "Analyze the following inquiry text:\n{raw_text}\n\n\
        Valid materials: {material_opts}\n\
        Valid forms: {form_opts}\n\n\
        *** EXECUTION RULES ***\n\
        1. **Thickness and form**: find the smallest value among the dimensions. \
        If the smallest edge is >= 10mm, or the item is described as a 'Block', set form to 'Plate'.\n\
        2. **Dimensions**: extract the dimensions verbatim as a single string \
        (e.g. '30mm*30mm*40mm') into the 'dimensions' field.\n\
        3. **Quantity splitting**: if the inquiry asks for several quantity tiers \
        (e.g. 10pcs and 2000pcs), emit one line item per quantity tier. \
        'quantity' is always one number followed by a unit (e.g. '10 pcs').\n\
        4. **Material aliasing**: map grade designations to their material family, \
        e.g. '316L' is 'Stainless Steel'.\n\
        5. **Qualification**: 'ISO' is the baseline; use 'Automotive' or 'Aerospace' \
        only when the text demands that certification.\n\
        6. **Output**: return a single JSON object whose root key is 'items'. \
        Field values must use the English codes listed above. \
        Return ONLY the JSON — no commentary, no code fences.\n\n\
        The output must conform to this JSON Schema:\n{schema}"
    )
}

/// The opening conversation for a session: system role, then instructions.
pub fn initial_conversation(catalog: &OptionCatalog, raw_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(catalog, raw_text)),
    ]
}

/// The correction turn appended after a schema violation, citing the exact
/// path and the expected contract. One violation per retry keeps the
/// service focused on a single fix.
pub fn build_correction_prompt(violation: &SchemaViolation) -> String {
    format!(
        "The JSON you returned failed validation.\n\n\
        VIOLATION at {path}: {reason}\n\n\
        TASK: return the FULL corrected JSON object again, with the root key 'items'. \
        Fix exactly what the violation describes and keep every other field value unchanged. \
        Return ONLY the JSON — no commentary, no code fences.",
        path = violation.path,
        reason = violation.reason,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_is_deterministic() {
        let catalog = OptionCatalog::default();
        let a = build_user_prompt(&catalog, "316L block 30mm×30mm×40mm, 10pcs");
        let b = build_user_prompt(&catalog, "316L block 30mm×30mm×40mm, 10pcs");
        assert_eq!(a, b);
    }

    #[test]
    fn user_prompt_carries_enumerations_and_schema() {
        let catalog = OptionCatalog::default();
        let prompt = build_user_prompt(&catalog, "copper tube");
        assert!(prompt.contains("copper tube"));
        assert!(prompt.contains("Stainless Steel (不鏽鋼)"));
        assert!(prompt.contains("Plate (厚板)"));
        assert!(prompt.contains("material_type"));
        assert!(prompt.contains("quantity"));
    }

    #[test]
    fn conversation_opens_with_system_then_user() {
        let catalog = OptionCatalog::default();
        let conversation = initial_conversation(&catalog, "titanium forging");
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].content, SYSTEM_PROMPT);
        assert!(conversation[1].content.contains("titanium forging"));
    }

    #[test]
    fn correction_prompt_cites_path_and_reason() {
        let violation = SchemaViolation {
            path: "$.items[0].quantity".to_string(),
            reason: "must be a string of a number followed by a unit, e.g. '10 pcs'".to_string(),
        };
        let prompt = build_correction_prompt(&violation);
        assert!(prompt.contains("$.items[0].quantity"));
        assert!(prompt.contains("followed by a unit"));
    }
}
