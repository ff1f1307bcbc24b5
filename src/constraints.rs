/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Offer attribute constraint matching.
//!
//! A constraint expression restricts which nodes the backend will launch
//! executors on.  The syntax is a `;`-separated list of clauses:
//!
//! ```text
//! zone:us-east-1,us-east-2;rack
//! ```
//!
//! Each clause is an attribute name, optionally followed by `:` and a
//! `,`-separated value list.  A clause without values requires the attribute
//! to be *present* with any value.  An offer matches when **every** clause is
//! satisfied by its attribute map.
//!
//! How values compare depends on the offered attribute's type:
//!
//! | Offered type | Match rule |
//! |---|---|
//! | Text | offered value is one of the required values |
//! | Scalar | some required value parses to the same number |
//! | Set | every required value is present in the offered set |
//! | Ranges | some required value is a point inside some offered range |

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::offer::AttributeValue;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A constraint expression that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    /// A clause did not have the `attribute` or `attribute:v1,v2` shape.
    #[error("malformed constraint clause '{clause}' (expected 'attribute' or 'attribute:v1,v2')")]
    MalformedClause { clause: String },
}

// ── ConstraintSet ─────────────────────────────────────────────────────────────

/// Parsed constraint expression: attribute name → acceptable values.
///
/// An empty value set means "present with any value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    required: BTreeMap<String, BTreeSet<String>>,
}

impl ConstraintSet {
    /// Parse a constraint expression.  The empty string yields an empty set
    /// that matches every offer.
    pub fn parse(expr: &str) -> Result<Self, ConstraintError> {
        let mut required = BTreeMap::new();

        for clause in expr.split(';').map(str::trim).filter(|c| !c.is_empty()) {
            if clause.chars().filter(|c| *c == ':').count() > 1 {
                return Err(ConstraintError::MalformedClause {
                    clause: clause.to_string(),
                });
            }

            let (name, values) = match clause.split_once(':') {
                None => (clause, BTreeSet::new()),
                Some((name, list)) => {
                    let values = list
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect();
                    (name.trim(), values)
                }
            };

            if name.is_empty() {
                return Err(ConstraintError::MalformedClause {
                    clause: clause.to_string(),
                });
            }

            required.insert(name.to_string(), values);
        }

        Ok(Self { required })
    }

    /// `true` when no clauses were configured.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// Does the offered attribute map satisfy every clause?
    pub fn matches(&self, attributes: &BTreeMap<String, AttributeValue>) -> bool {
        self.required.iter().all(|(name, values)| {
            let Some(offered) = attributes.get(name) else {
                return false;
            };
            if values.is_empty() {
                return true;
            }
            match offered {
                AttributeValue::Text(text) => values.contains(text),
                AttributeValue::Scalar(scalar) => values
                    .iter()
                    .filter_map(|v| v.parse::<f64>().ok())
                    .any(|v| (v - scalar).abs() < f64::EPSILON),
                AttributeValue::Set(offered_set) => {
                    values.iter().all(|v| offered_set.contains(v))
                }
                AttributeValue::Ranges(ranges) => values
                    .iter()
                    .filter_map(|v| v.parse::<u64>().ok())
                    .any(|point| ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&point))),
            }
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
