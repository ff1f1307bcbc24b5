/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Bookkeeping state for live executors.
//!
//! Every field lives behind the backend's single state lock; nothing here is
//! independently synchronised.  The task↔node association is a bijection
//! maintained as two hash maps so both directions stay O(1):
//!
//! | Map / counter | Written at | Cleared at |
//! |---|---|---|
//! | `cores_by_task_id`, `total_cores_acquired` | launch | terminal status |
//! | `task_id_to_node_id` / `node_id_to_task_id` | launch | executor teardown |
//! | `nodes_with_executors` | launch | executor teardown |
//! | `node_id_to_host` | launch | first RUNNING status |
//! | `failures_by_node_id` | failure status | never (monotonic) |
//! | `pending_removed_node_ids` | kill request | executor teardown |
//!
//! Consistency between the maps is asserted after mutating operations in
//! debug builds.

use std::collections::{HashMap, HashSet};

/// A node is blacklisted once this many of its executors have failed.
pub const MAX_NODE_FAILURES: u32 = 2;

/// All mutable backend bookkeeping; guarded by the backend's state lock.
#[derive(Debug, Default)]
pub(crate) struct BookkeepingState {
    cores_by_task_id: HashMap<u64, u32>,
    total_cores_acquired: u32,
    nodes_with_executors: HashSet<String>,
    node_id_to_host: HashMap<String, String>,
    task_id_to_node_id: HashMap<u64, String>,
    node_id_to_task_id: HashMap<String, u64>,
    failures_by_node_id: HashMap<String, u32>,
    executor_limit: Option<usize>,
    pending_removed_node_ids: HashSet<String>,
    next_task_id: u64,
}

impl BookkeepingState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Task ids ──────────────────────────────────────────────────────────────

    /// Hand out the next task id.  Ids are monotonic and never reused.
    pub fn mint_task_id(&mut self) -> u64 {
        let id = self.next_task_id;
        self.next_task_id += 1;
        id
    }

    // ── Launch / teardown ─────────────────────────────────────────────────────

    /// Record a newly issued launch.
    pub fn record_launch(&mut self, task_id: u64, node_id: &str, hostname: &str, cores: u32) {
        self.cores_by_task_id.insert(task_id, cores);
        self.total_cores_acquired += cores;
        self.nodes_with_executors.insert(node_id.to_string());
        self.node_id_to_host
            .insert(node_id.to_string(), hostname.to_string());
        self.task_id_to_node_id.insert(task_id, node_id.to_string());
        self.node_id_to_task_id.insert(node_id.to_string(), task_id);
        #[cfg(debug_assertions)]
        self.assert_consistent();
    }

    /// Release the cores booked for `task_id`, if any remain booked.
    pub fn release_cores(&mut self, task_id: u64) -> Option<u32> {
        let cores = self.cores_by_task_id.remove(&task_id)?;
        self.total_cores_acquired -= cores;
        Some(cores)
    }

    /// Drop the task↔node association for `node_id`, returning the task id
    /// that was bound to it.
    pub fn remove_binding(&mut self, node_id: &str) -> Option<u64> {
        let task_id = self.node_id_to_task_id.remove(node_id)?;
        self.task_id_to_node_id.remove(&task_id);
        Some(task_id)
    }

    /// Remove `node_id` from the live set and from any pending-kill record.
    pub fn mark_node_free(&mut self, node_id: &str) {
        self.nodes_with_executors.remove(node_id);
        self.pending_removed_node_ids.remove(node_id);
        #[cfg(debug_assertions)]
        self.assert_consistent();
    }

    /// Consume the hostname recorded at launch (first RUNNING status only).
    pub fn take_host(&mut self, node_id: &str) -> Option<String> {
        self.node_id_to_host.remove(node_id)
    }

    // ── Lookups ───────────────────────────────────────────────────────────────

    pub fn node_for_task(&self, task_id: u64) -> Option<&str> {
        self.task_id_to_node_id.get(&task_id).map(String::as_str)
    }

    pub fn task_for_node(&self, node_id: &str) -> Option<u64> {
        self.node_id_to_task_id.get(node_id).copied()
    }

    pub fn node_in_use(&self, node_id: &str) -> bool {
        self.nodes_with_executors.contains(node_id)
    }

    /// Number of live executors (size of the bijection).
    pub fn executor_count(&self) -> usize {
        self.task_id_to_node_id.len()
    }

    /// Number of nodes still hosting an executor; drives the shutdown drain.
    pub fn live_nodes(&self) -> usize {
        self.nodes_with_executors.len()
    }

    pub fn total_cores_acquired(&self) -> u32 {
        self.total_cores_acquired
    }

    // ── Executor limit ────────────────────────────────────────────────────────

    /// Current limit; unbounded until the allocation controller first sets it.
    pub fn executor_limit(&self) -> usize {
        self.executor_limit.unwrap_or(usize::MAX)
    }

    pub fn set_executor_limit(&mut self, limit: usize) {
        self.executor_limit = Some(limit);
    }

    // ── Failures / blacklist ──────────────────────────────────────────────────

    /// Count one executor failure against `node_id`; returns the new total.
    /// The counter is monotonic; blacklisting is never undone.
    pub fn record_failure(&mut self, node_id: &str) -> u32 {
        let count = self.failures_by_node_id.entry(node_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn failures(&self, node_id: &str) -> u32 {
        self.failures_by_node_id.get(node_id).copied().unwrap_or(0)
    }

    pub fn is_blacklisted(&self, node_id: &str) -> bool {
        self.failures(node_id) >= MAX_NODE_FAILURES
    }

    // ── Pending kills ─────────────────────────────────────────────────────────

    pub fn mark_pending_removal(&mut self, node_id: &str) {
        self.pending_removed_node_ids.insert(node_id.to_string());
    }

    pub fn pending_removals(&self) -> usize {
        self.pending_removed_node_ids.len()
    }

    // ── Consistency ───────────────────────────────────────────────────────────

    /// Panics unless the cross-map relationships hold: the core total equals
    /// the per-task sum, the two direction maps mirror each other, and every
    /// bound node is in the live set.
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(
            self.total_cores_acquired,
            self.cores_by_task_id.values().sum::<u32>(),
            "total cores diverged from the per-task ledger"
        );
        assert_eq!(
            self.task_id_to_node_id.len(),
            self.node_id_to_task_id.len(),
            "task↔node maps have different sizes"
        );
        for (task_id, node_id) in &self.task_id_to_node_id {
            assert_eq!(
                self.node_id_to_task_id.get(node_id),
                Some(task_id),
                "task↔node maps disagree for node {node_id}"
            );
        }
        for node_id in self.task_id_to_node_id.values() {
            assert!(
                self.nodes_with_executors.contains(node_id),
                "bound node {node_id} missing from the live set"
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
