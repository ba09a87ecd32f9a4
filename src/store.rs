//! Collaborator boundaries for supplier capability lookup and inquiry
//! persistence, plus in-memory implementations.
//!
//! The relational mechanics behind these traits (tables, migrations) belong
//! to the embedding application; this crate only fixes the interface the
//! core needs: an intersect-query over capability profiles, and a
//! single-append record of an accepted session and its per-item matches.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{Form, MaterialType, RfqStatus};
use crate::error::Result;
use crate::matching::SupplierProfile;
use crate::schema::LineItem;

pub type SessionId = u64;

/// Read-only source of supplier capability profiles.
pub trait CapabilityStore {
    /// Profiles whose material *or* form sets intersect the query. The
    /// qualification filter is applied afterwards by the matching engine,
    /// not here.
    fn find_candidates(
        &self,
        materials: &BTreeSet<MaterialType>,
        forms: &BTreeSet<Form>,
    ) -> Vec<SupplierProfile>;
}

/// Append-only sink for accepted extraction sessions.
pub trait InquiryStore {
    /// Records the raw inquiry text and its validated items; performed once,
    /// after acceptance, never interleaved with retries.
    fn record_session(&mut self, raw_text: &str, items: &[LineItem]) -> Result<SessionId>;

    /// Records one item's match result against the supplier pool.
    fn record_item_match(
        &mut self,
        session: SessionId,
        item: &LineItem,
        supplier_ids: &[u64],
    ) -> Result<()>;
}

/// A stored inquiry session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: SessionId,
    pub raw_text: String,
    pub items_json: String,
    pub status: RfqStatus,
    pub created_at: NaiveDateTime,
}

/// One item's recorded match result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItemMatch {
    pub session_id: SessionId,
    pub item_index: usize,
    pub material: MaterialType,
    pub form: Form,
    pub spec_json: String,
    pub supplier_ids: Vec<u64>,
}

/// In-memory capability store; the starting point for tests and embedding
/// applications without their own backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCapabilityStore {
    suppliers: Vec<SupplierProfile>,
}

impl InMemoryCapabilityStore {
    pub fn new(suppliers: Vec<SupplierProfile>) -> Self {
        Self { suppliers }
    }

    pub fn add_supplier(&mut self, supplier: SupplierProfile) {
        self.suppliers.push(supplier);
    }

    pub fn suppliers(&self) -> &[SupplierProfile] {
        &self.suppliers
    }
}

impl CapabilityStore for InMemoryCapabilityStore {
    fn find_candidates(
        &self,
        materials: &BTreeSet<MaterialType>,
        forms: &BTreeSet<Form>,
    ) -> Vec<SupplierProfile> {
        self.suppliers
            .iter()
            .filter(|supplier| {
                supplier.materials.intersection(materials).next().is_some()
                    || supplier.forms.intersection(forms).next().is_some()
            })
            .cloned()
            .collect()
    }
}

/// In-memory inquiry store with monotonically increasing session ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInquiryStore {
    next_id: SessionId,
    sessions: Vec<StoredSession>,
    item_matches: Vec<StoredItemMatch>,
}

impl InMemoryInquiryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[StoredSession] {
        &self.sessions
    }

    pub fn item_matches(&self) -> &[StoredItemMatch] {
        &self.item_matches
    }
}

impl InquiryStore for InMemoryInquiryStore {
    fn record_session(&mut self, raw_text: &str, items: &[LineItem]) -> Result<SessionId> {
        let id = self.next_id;
        self.next_id += 1;

        let items_json = serde_json::to_string(items)?;
        self.sessions.push(StoredSession {
            id,
            raw_text: raw_text.to_string(),
            items_json,
            status: RfqStatus::Analyzed,
            created_at: chrono::Utc::now().naive_utc(),
        });

        Ok(id)
    }

    fn record_item_match(
        &mut self,
        session: SessionId,
        item: &LineItem,
        supplier_ids: &[u64],
    ) -> Result<()> {
        let spec_json = serde_json::to_string(item)?;
        self.item_matches.push(StoredItemMatch {
            session_id: session,
            item_index: item.item_index,
            material: item.material_type,
            form: item.form,
            spec_json,
            supplier_ids: supplier_ids.to_vec(),
        });
        Ok(())
    }
}
