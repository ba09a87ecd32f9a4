//! Fixed option lists and display translations.
//!
//! Everything downstream — the prompt builder, the validator, the matching
//! engine — consumes these enumerations. The catalog is constructed once and
//! passed by reference; there is no process-wide mutable state.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Material families a line item may be classified as.
///
/// Grade designations ("316L", "6061-T6") belong in `material_spec`; this
/// enum is the family the grade resolves to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum MaterialType {
    Aluminum,
    Copper,
    #[serde(rename = "Carbon Steel")]
    CarbonSteel,
    #[serde(rename = "Stainless Steel")]
    StainlessSteel,
    #[serde(rename = "Tool Steel")]
    ToolSteel,
    #[serde(rename = "Nickel Alloy")]
    NickelAlloy,
    #[serde(rename = "Titanium Alloy")]
    TitaniumAlloy,
    Plastic,
    Other,
}

impl MaterialType {
    pub const ALL: [MaterialType; 9] = [
        MaterialType::Aluminum,
        MaterialType::Copper,
        MaterialType::CarbonSteel,
        MaterialType::StainlessSteel,
        MaterialType::ToolSteel,
        MaterialType::NickelAlloy,
        MaterialType::TitaniumAlloy,
        MaterialType::Plastic,
        MaterialType::Other,
    ];

    /// Canonical spelling as it appears on the wire and in supplier records.
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Aluminum => "Aluminum",
            MaterialType::Copper => "Copper",
            MaterialType::CarbonSteel => "Carbon Steel",
            MaterialType::StainlessSteel => "Stainless Steel",
            MaterialType::ToolSteel => "Tool Steel",
            MaterialType::NickelAlloy => "Nickel Alloy",
            MaterialType::TitaniumAlloy => "Titanium Alloy",
            MaterialType::Plastic => "Plastic",
            MaterialType::Other => "Other",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product forms a line item may be requested in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Form {
    Bar,
    Tube,
    Sheet,
    Plate,
    Forging,
    Stamping,
    Other,
}

impl Form {
    pub const ALL: [Form; 7] = [
        Form::Bar,
        Form::Tube,
        Form::Sheet,
        Form::Plate,
        Form::Forging,
        Form::Stamping,
        Form::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Form::Bar => "Bar",
            Form::Tube => "Tube",
            Form::Sheet => "Sheet",
            Form::Plate => "Plate",
            Form::Forging => "Forging",
            Form::Stamping => "Stamping",
            Form::Other => "Other",
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certification tier required to source a line item.
///
/// Tiers are totally ordered: ISO < Automotive < Aerospace. The derived
/// `Ord` follows declaration order, which is what the matching engine's
/// max-over-group computation relies on.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum Qualification {
    #[default]
    #[serde(rename = "ISO")]
    #[schemars(description = "Baseline quality system certification (ISO 9001). The default tier.")]
    Iso,

    #[schemars(description = "Automotive quality system certification (IATF 16949).")]
    Automotive,

    #[schemars(description = "Aerospace quality system certification (AS9100). The highest tier.")]
    Aerospace,
}

impl Qualification {
    pub const ALL: [Qualification; 3] = [
        Qualification::Iso,
        Qualification::Automotive,
        Qualification::Aerospace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Qualification::Iso => "ISO",
            Qualification::Automotive => "Automotive",
            Qualification::Aerospace => "Aerospace",
        }
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of a stored inquiry session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RfqStatus {
    New,
    Sent,
    Received,
    Analyzed,
    Approved,
    Rejected,
}

/// The immutable option catalog handed to the prompt builder and normalizer.
///
/// Holds the full enumeration lists plus a `lang -> (english name -> display
/// name)` translation table used to render bilingual option lists in prompts.
#[derive(Debug, Clone)]
pub struct OptionCatalog {
    materials: Vec<MaterialType>,
    forms: Vec<Form>,
    qualifications: Vec<Qualification>,
    translations: BTreeMap<String, BTreeMap<String, String>>,
}

impl OptionCatalog {
    pub fn new(
        materials: Vec<MaterialType>,
        forms: Vec<Form>,
        qualifications: Vec<Qualification>,
        translations: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        Self {
            materials,
            forms,
            qualifications,
            translations,
        }
    }

    pub fn materials(&self) -> &[MaterialType] {
        &self.materials
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn qualifications(&self) -> &[Qualification] {
        &self.qualifications
    }

    /// Display name for `key` in `lang`, falling back to the key itself when
    /// no translation is recorded.
    pub fn display_name<'a>(&'a self, lang: &str, key: &'a str) -> &'a str {
        self.translations
            .get(lang)
            .and_then(|table| table.get(key))
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// Renders the material list as `"Aluminum (鋁), Copper (銅), ..."`.
    ///
    /// When a name has no translation the parenthetical repeats the English
    /// name, matching how the prompt has always been built.
    pub fn material_options(&self, lang: &str) -> String {
        self.bilingual_list(lang, self.materials.iter().map(MaterialType::as_str))
    }

    /// Renders the form list the same way as [`Self::material_options`].
    pub fn form_options(&self, lang: &str) -> String {
        self.bilingual_list(lang, self.forms.iter().map(Form::as_str))
    }

    fn bilingual_list<'a>(&self, lang: &str, names: impl Iterator<Item = &'a str>) -> String {
        names
            .map(|name| format!("{} ({})", name, self.display_name(lang, name)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for OptionCatalog {
    fn default() -> Self {
        let mut zh = BTreeMap::new();
        for (en, display) in [
            ("Aluminum", "鋁"),
            ("Copper", "銅"),
            ("Carbon Steel", "碳鋼"),
            ("Stainless Steel", "不鏽鋼"),
            ("Tool Steel", "工具鋼"),
            ("Nickel Alloy", "鎳合金"),
            ("Titanium Alloy", "鈦合金"),
            ("Plastic", "塑膠"),
            ("Other", "其他"),
            ("Bar", "棒材"),
            ("Tube", "管材"),
            ("Sheet", "薄板"),
            ("Plate", "厚板"),
            ("Forging", "鍛件"),
            ("Stamping", "沖壓件"),
        ] {
            zh.insert(en.to_string(), display.to_string());
        }

        let mut translations = BTreeMap::new();
        translations.insert("zh".to_string(), zh);

        Self {
            materials: MaterialType::ALL.to_vec(),
            forms: Form::ALL.to_vec(),
            qualifications: Qualification::ALL.to_vec(),
            translations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualification_tiers_are_totally_ordered() {
        assert!(Qualification::Iso < Qualification::Automotive);
        assert!(Qualification::Automotive < Qualification::Aerospace);
        assert_eq!(
            Qualification::ALL.iter().max(),
            Some(&Qualification::Aerospace)
        );
        assert_eq!(Qualification::default(), Qualification::Iso);
    }

    #[test]
    fn spaced_spellings_round_trip_through_serde() {
        let json = serde_json::to_string(&MaterialType::StainlessSteel).unwrap();
        assert_eq!(json, "\"Stainless Steel\"");
        let back: MaterialType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MaterialType::StainlessSteel);
    }

    #[test]
    fn display_name_falls_back_to_key() {
        let catalog = OptionCatalog::default();
        assert_eq!(catalog.display_name("zh", "Aluminum"), "鋁");
        assert_eq!(catalog.display_name("zh", "Unknown Thing"), "Unknown Thing");
        assert_eq!(catalog.display_name("fr", "Aluminum"), "Aluminum");
    }

    #[test]
    fn bilingual_option_lists_are_deterministic() {
        let catalog = OptionCatalog::default();
        let first = catalog.material_options("zh");
        let second = catalog.material_options("zh");
        assert_eq!(first, second);
        assert!(first.starts_with("Aluminum (鋁), Copper (銅)"));
        assert!(catalog.form_options("zh").contains("Plate (厚板)"));
    }
}
