/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Upstream application adapter.
//!
//! The backend is embedded inside a larger compute application; this trait
//! is the full capability set the backend requires from it.  The hosting
//! application may take its own locks inside these methods; the backend
//! therefore never calls them while expecting re-entry, and long operations
//! belong on the host's side of the seam.

use std::collections::BTreeMap;

/// What the hosting application provides to the backend.
pub trait ApplicationHost: Send + Sync {
    /// Memory overhead (MB) reserved on top of every executor heap.
    fn memory_overhead_mb(&self) -> u64;

    /// Environment bindings every executor process inherits.
    fn executor_environment(&self) -> BTreeMap<String, String>;

    /// Framework registration completed; the application may start
    /// submitting work.
    fn mark_registered(&self);

    /// An executor reached the end of its life.  `executor_id` is the
    /// composite `<node>/<task>` form.
    fn remove_executor(&self, executor_id: &str, reason: &str);

    /// Unrecoverable error from the resource manager; the application
    /// typically tears itself down.
    fn report_fatal(&self, message: &str);

    /// Upstream stop procedure, invoked at the beginning of shutdown before
    /// the executor drain.
    fn stop(&self);

    /// Called after the backend asks the driver to revive offers.
    fn offers_revived(&self) {}
}
