//! # RFQ Analyzer
//!
//! A library for converting free-form procurement inquiry text into
//! validated, structured RFQ line items (via an LLM treated as an untrusted
//! black box) and matching those items against supplier capability records.
//!
//! ## Core Concepts
//!
//! - **Line Item**: one material/form/spec/quantity/qualification record,
//!   guaranteed to conform to the contract in [`schema`] — downstream code
//!   never sees a partially valid item.
//! - **Repair Loop**: the generative service mislabels root keys, invents
//!   field names, and omits units; each schema violation is fed back as a
//!   correction turn, up to a fixed retry bound.
//! - **Normalizer**: cosmetic divergences (aliased keys, bare objects) are
//!   reshaped structurally before validation; genuine violations fail
//!   honestly.
//! - **Matching**: items are grouped by material, each group carries the
//!   maximum certification tier over its members, and suppliers are
//!   filtered on material + tier membership.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rfq_analyzer::*;
//!
//! # async fn run() {
//! let client = OpenAiClient::from_env();
//! let extractor = RfqExtractor::new(client, OptionCatalog::default());
//!
//! // Valid list or empty — never an error, never a partial structure.
//! let items = extractor.analyze("316L block 30mm×30mm×40mm, 10pcs and 2000pcs").await;
//!
//! let pool: Vec<SupplierProfile> = load_suppliers();
//! for (group, suppliers) in match_items(&items, &pool) {
//!     println!(
//!         "{} ({} items) requires {} — {} eligible supplier(s)",
//!         group.material,
//!         group.items.len(),
//!         group.required_qualification,
//!         suppliers.len()
//!     );
//! }
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod matching;
pub mod normalizer;
pub mod schema;
pub mod store;
pub mod validator;

#[cfg(feature = "openai")]
pub mod llm;

pub use catalog::{Form, MaterialType, OptionCatalog, Qualification, RfqStatus};
pub use error::{Result, RfqError};
pub use matching::{eligible_suppliers, group_by_material, match_items, MatchGroup, SupplierProfile};
pub use normalizer::normalize;
pub use schema::{quantity_regex, LineItem, RfqItems, ITEMS_KEY, QUANTITY_PATTERN};
pub use store::{
    CapabilityStore, InMemoryCapabilityStore, InMemoryInquiryStore, InquiryStore, SessionId,
    StoredItemMatch, StoredSession,
};
pub use validator::{validate_items, SchemaViolation};

#[cfg(feature = "openai")]
pub use llm::{
    AttemptRecord, ChatMessage, ChatService, ExtractionEvent, ExtractionSession, FailureKind,
    OpenAiClient, RfqExtractor, Role, SessionOutcome, SessionState, DEFAULT_MAX_ATTEMPTS,
};

/// One-call convenience entry: reads `OPENAI_API_KEY`, uses the default
/// catalog and retry bound. A missing credential fails the session before
/// any network interaction and yields an empty list.
#[cfg(feature = "openai")]
pub async fn analyze_inquiry(raw_text: &str) -> Vec<LineItem> {
    let client = OpenAiClient::from_env();
    let extractor = RfqExtractor::new(client, OptionCatalog::default());
    extractor.analyze(raw_text).await
}
