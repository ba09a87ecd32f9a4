//! Grouping validated line items by material and filtering the supplier
//! pool per group.
//!
//! The qualification requirement is computed per *group*, not per item: a
//! group containing any Aerospace-tier item requires Aerospace-capable
//! suppliers for all of its items, including the ISO-tier ones. Form is
//! deliberately not a hard filter; form-level fit is left to manual review.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{Form, MaterialType, Qualification};
use crate::schema::LineItem;

/// What a supplier is recorded as able to fulfill. Read-only to this crate;
/// owned by the capability store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub id: u64,
    pub name: String,
    pub materials: BTreeSet<MaterialType>,
    pub forms: BTreeSet<Form>,
    pub qualifications: BTreeSet<Qualification>,
}

/// Line items sharing a material, with the single certification tier the
/// whole group must be sourced at.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchGroup {
    pub material: MaterialType,
    pub items: Vec<LineItem>,
    pub required_qualification: Qualification,
}

/// Partitions items by material. Groups come back in material enum order;
/// each group's `required_qualification` is the maximum tier over its
/// members (ISO when a member carries the default).
pub fn group_by_material(items: &[LineItem]) -> Vec<MatchGroup> {
    let mut buckets: BTreeMap<MaterialType, Vec<LineItem>> = BTreeMap::new();
    for item in items {
        buckets
            .entry(item.material_type)
            .or_default()
            .push(item.clone());
    }

    buckets
        .into_iter()
        .map(|(material, items)| {
            let required_qualification = items
                .iter()
                .map(|item| item.qualification)
                .max()
                .unwrap_or_default();
            MatchGroup {
                material,
                items,
                required_qualification,
            }
        })
        .collect()
}

/// Suppliers eligible for a group: the supplier's material set must contain
/// the group's material and its qualification set must contain the group's
/// required tier. No ranking; ties are the caller's to break.
pub fn eligible_suppliers<'a>(
    group: &MatchGroup,
    pool: &'a [SupplierProfile],
) -> Vec<&'a SupplierProfile> {
    pool.iter()
        .filter(|supplier| {
            supplier.materials.contains(&group.material)
                && supplier
                    .qualifications
                    .contains(&group.required_qualification)
        })
        .collect()
}

/// Grouping and filtering in one pass, the shape the caller consumes.
pub fn match_items<'a>(
    items: &[LineItem],
    pool: &'a [SupplierProfile],
) -> Vec<(MatchGroup, Vec<&'a SupplierProfile>)> {
    group_by_material(items)
        .into_iter()
        .map(|group| {
            let suppliers = eligible_suppliers(&group, pool);
            (group, suppliers)
        })
        .collect()
}
