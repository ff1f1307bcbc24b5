/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Offer-side data model.
//!
//! A [`ResourceOffer`] is what the resource manager hands us: a bundle of
//! resources on one node, valid for a bounded time.  Resources are either
//! scalars (`cpus`, `mem` in MB) or ranges (ports); node attributes carry the
//! operator-assigned metadata that constraint expressions match against.
//!
//! ```text
//! resource manager ──(offer batch)──► ResourceOffer ──► backend admission gate
//!                                          │
//!                                          └── attributes ──► constraints
//! ```
//!
//! All strings are owned: offers outlive the driver callback that delivered
//! them because accepted offers are consumed inside the state lock.

use std::collections::{BTreeMap, BTreeSet};

/// Resource name for cpu shares.
pub const CPUS: &str = "cpus";

/// Resource name for memory, in MB.
pub const MEM: &str = "mem";

// ── Resources ─────────────────────────────────────────────────────────────────

/// Value of a single offered resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    /// Fractional quantity (cpus, memory MB).
    Scalar(f64),

    /// Inclusive `(begin, end)` ranges (ports).
    Ranges(Vec<(u64, u64)>),
}

/// One named resource inside an offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub value: ResourceValue,
}

impl Resource {
    /// Convenience constructor for a scalar resource.
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Scalar(value),
        }
    }

    /// The scalar quantity, or `None` for range resources.
    pub fn scalar_value(&self) -> Option<f64> {
        match &self.value {
            ResourceValue::Scalar(v) => Some(*v),
            ResourceValue::Ranges(_) => None,
        }
    }
}

/// Sum of all scalar entries named `name`.
///
/// Offers may carry the same resource under several entries (one per
/// reservation role); admission always works on the total.
pub fn scalar_total(resources: &[Resource], name: &str) -> f64 {
    resources
        .iter()
        .filter(|r| r.name == name)
        .filter_map(Resource::scalar_value)
        .sum()
}

/// Carve `amount` units of the scalar resource `name` out of `resources`.
///
/// Walks the entries in order, taking up to `amount` in total across them.
/// Returns `(consumed, remaining)`; entries of other names pass through to
/// `remaining` untouched.  If the offer holds less than `amount`, everything
/// available is consumed; callers gate on [`scalar_total`] first.
pub fn partition_resources(
    resources: &[Resource],
    name: &str,
    amount: f64,
) -> (Vec<Resource>, Vec<Resource>) {
    let mut consumed = Vec::new();
    let mut remaining = Vec::new();
    let mut needed = amount;

    for resource in resources {
        match resource.scalar_value() {
            Some(available) if resource.name == name && needed > 0.0 => {
                let take = available.min(needed);
                needed -= take;
                consumed.push(Resource::scalar(name, take));
                let leftover = available - take;
                if leftover > 0.0 {
                    remaining.push(Resource::scalar(name, leftover));
                }
            }
            _ => remaining.push(resource.clone()),
        }
    }

    (consumed, remaining)
}

// ── Attributes ────────────────────────────────────────────────────────────────

/// Value of a node attribute, as assigned by the cluster operator.
///
/// The variant decides how constraint values compare: scalars as numbers,
/// text as a single string, sets as string collections, ranges by point
/// containment.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Scalar(f64),
    Text(String),
    Set(BTreeSet<String>),
    Ranges(Vec<(u64, u64)>),
}

// ── ResourceOffer ─────────────────────────────────────────────────────────────

/// A resource offer from one node, as delivered by the driver.
#[derive(Debug, Clone)]
pub struct ResourceOffer {
    /// Offer identifier, echoed back on launch or decline.
    pub id: String,

    /// Opaque identifier of the physical host, assigned by the resource
    /// manager.
    pub node_id: String,

    /// Resolvable hostname of the node (used for shuffle-service
    /// registration).
    pub hostname: String,

    /// Offered resources; at least `cpus` and `mem` for a usable offer.
    pub resources: Vec<Resource>,

    /// Operator-assigned node attributes.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl ResourceOffer {
    /// Total offered cpus.
    pub fn cpus(&self) -> f64 {
        scalar_total(&self.resources, CPUS)
    }

    /// Total offered memory in MB.
    pub fn mem_mb(&self) -> f64 {
        scalar_total(&self.resources, MEM)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
