/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Backend error and diagnostic types.
//!
//! Two layers, deliberately kept apart:
//!
//! * [`DeclineReason`]: why one offer failed the admission gate.  Not an
//!   error: declining offers is the normal steady state of a framework that
//!   has what it needs.  Carries the exact numbers behind each decision so
//!   the `debug!` line is enough to diagnose an offer storm after the fact.
//! * [`BackendError`]: lifecycle failures surfaced to the caller of
//!   `new`/`start`.  Configuration problems abort start-up; nothing else
//!   does.

use thiserror::Error;

use crate::config::ConfigError;

// ── DeclineReason ─────────────────────────────────────────────────────────────

/// Why an offer was declined by the admission gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// `stop()` has been called; nothing launches any more.
    ShutdownInProgress,

    /// The allocation controller's executor limit is already reached.
    ExecutorLimitReached { live: usize, limit: usize },

    /// The configured core budget is exhausted.
    CoreCapReached { acquired: u32, max: u32 },

    /// The node's attributes do not satisfy the configured constraints.
    ConstraintMismatch,

    /// The sizer found no feasible executor within the offered resources.
    InsufficientResources { cpus: u32, mem_mb: u64 },

    /// The node has failed too many executors and is blacklisted.
    NodeBlacklisted { failures: u32 },

    /// The node already hosts a live executor (one executor per node).
    NodeAlreadyInUse,
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclineReason::ShutdownInProgress => write!(f, "shutdown in progress"),

            DeclineReason::ExecutorLimitReached { live, limit } => {
                write!(f, "executor limit reached ({live} live, limit {limit})")
            }

            DeclineReason::CoreCapReached { acquired, max } => {
                write!(f, "core budget exhausted ({acquired} of {max} acquired)")
            }

            DeclineReason::ConstraintMismatch => {
                write!(f, "node attributes do not satisfy the configured constraints")
            }

            DeclineReason::InsufficientResources { cpus, mem_mb } => write!(
                f,
                "no feasible executor within {cpus} grantable cpus and {mem_mb}MB"
            ),

            DeclineReason::NodeBlacklisted { failures } => {
                write!(f, "node blacklisted after {failures} executor failures")
            }

            DeclineReason::NodeAlreadyInUse => {
                write!(f, "node already hosts a live executor")
            }
        }
    }
}

// ── BackendError ──────────────────────────────────────────────────────────────

/// Lifecycle failures surfaced to the hosting application.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The configuration failed its start-up checks.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `start()` was called twice.
    #[error("backend already started")]
    AlreadyStarted,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decline_reasons_render_their_numbers() {
        let rendered = DeclineReason::CoreCapReached {
            acquired: 8,
            max: 8,
        }
        .to_string();
        assert!(rendered.contains("8 of 8"));

        let rendered = DeclineReason::InsufficientResources {
            cpus: 2,
            mem_mb: 256,
        }
        .to_string();
        assert!(rendered.contains("2 grantable cpus"));
        assert!(rendered.contains("256MB"));

        let rendered = DeclineReason::NodeBlacklisted { failures: 2 }.to_string();
        assert!(rendered.contains("2 executor failures"));
    }
}
