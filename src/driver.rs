/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resource-manager driver contract.
//!
//! The driver library owns the wire protocol to the resource manager; this
//! module pins down the two seams the backend touches:
//!
//! ```text
//!                 ┌────────────────────┐
//!  driver threads │ FrameworkCallbacks │  inbound: offers, statuses, lifecycle
//!  ─────────────► │   (the backend)    │
//!                 └─────────┬──────────┘
//!                           │ outbound: launch / decline / kill / revive / stop
//!                           ▼
//!                 ┌────────────────────┐
//!                 │  SchedulerDriver   │
//!                 └────────────────────┘
//! ```
//!
//! Driver methods are assumed thread-safe; callbacks may arrive from any
//! driver thread and are serialised by the backend's state lock.

use crate::command::{CommandSpec, ContainerSpec};
use crate::offer::ResourceOffer;

/// How long a declined-after-launch offer is withheld from this framework.
pub const LAUNCH_REFUSE_SECONDS: f64 = 5.0;

// ── Task states ───────────────────────────────────────────────────────────────

/// Executor task state as reported by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl TaskState {
    /// Terminal states free the task's resources.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Finished
                | TaskState::Failed
                | TaskState::Killed
                | TaskState::Lost
                | TaskState::Error
        )
    }

    /// Failure states count towards a node's blacklist threshold.
    /// `Finished` and `Killed` are orderly exits and do not.
    pub fn is_failure(self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Lost | TaskState::Error)
    }
}

/// One task status update from the resource manager.
#[derive(Debug, Clone)]
pub struct TaskStatus {
    /// Task identifier as carried on the wire (decimal string).
    pub task_id: String,

    /// Node the status originated from; may be absent for some terminal
    /// states, in which case the backend's own bookkeeping is authoritative.
    pub node_id: Option<String>,

    pub state: TaskState,

    /// Free-form diagnostic from the resource manager.
    pub message: String,
}

// ── Offer filters ─────────────────────────────────────────────────────────────

/// Filter attached to a launch or decline, asking the resource manager not
/// to re-offer the same resources for a while.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfferFilter {
    pub refuse_seconds: f64,
}

impl Default for OfferFilter {
    fn default() -> Self {
        Self {
            refuse_seconds: LAUNCH_REFUSE_SECONDS,
        }
    }
}

// ── LaunchSpec ────────────────────────────────────────────────────────────────

/// One executor launch, handed to the driver against a specific offer.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub task_id: u64,

    /// Human-readable task name for cluster UIs.
    pub name: String,

    pub node_id: String,

    /// Cpu share reported to the resource manager (granted cpus plus the
    /// configured oversubscription).
    pub cpu_share: u32,

    /// Memory share reported to the resource manager, in MB.
    pub mem_share_mb: u64,

    pub command: CommandSpec,

    pub container: Option<ContainerSpec>,
}

// ── Executor ids ──────────────────────────────────────────────────────────────

/// Render the externally visible executor id: `<node>/<task>`.
pub fn format_executor_id(node_id: &str, task_id: u64) -> String {
    format!("{node_id}/{task_id}")
}

/// Split an executor id back into `(node_id, task_id)`.
///
/// The node part is everything before the **first** `/`; returns `None` when
/// either part is missing or the task part is not a decimal integer.
pub fn parse_executor_id(executor_id: &str) -> Option<(&str, u64)> {
    let (node_id, task) = executor_id.split_once('/')?;
    if node_id.is_empty() {
        return None;
    }
    let task_id = task.parse().ok()?;
    Some((node_id, task_id))
}

// ── Traits ────────────────────────────────────────────────────────────────────

/// Outbound operations on the resource-manager driver.
///
/// Implementations wrap the actual driver library; all methods must be safe
/// to call from any thread.
pub trait SchedulerDriver: Send + Sync {
    /// Begin framework registration and offer delivery.
    fn start(&self);

    /// Launch one executor against `offer_id`, filtering re-offers.
    fn launch_task(&self, offer_id: &str, spec: LaunchSpec, filter: OfferFilter);

    /// Decline an offer, optionally filtering re-offers.
    fn decline_offer(&self, offer_id: &str, filter: Option<OfferFilter>);

    /// Ask the resource manager to kill a task.
    fn kill_task(&self, task_id: u64);

    /// Clear any standing filters so declined offers come back.
    fn revive_offers(&self);

    /// Unregister and stop delivering callbacks.
    fn stop(&self);
}

/// Inbound callbacks the driver delivers to the backend.
///
/// Invoked from driver-owned threads; the implementation serialises them
/// internally and never panics across this boundary.
pub trait FrameworkCallbacks: Send + Sync {
    /// Framework registration completed; `framework_id` is the application's
    /// identity with the resource manager.
    fn registered(&self, framework_id: &str);

    /// Re-registered after a resource-manager failover.
    fn reregistered(&self);

    /// Connection to the resource manager lost.
    fn disconnected(&self);

    /// A batch of resource offers.
    fn resource_offers(&self, offers: Vec<ResourceOffer>);

    /// A task changed state.
    fn status_update(&self, status: TaskStatus);

    /// A node was lost wholesale (agent termination).
    fn node_lost(&self, node_id: &str);

    /// An executor process on a still-live node exited.
    fn executor_lost(&self, executor_id: &str, node_id: &str, exit_status: i32);

    /// Unrecoverable driver error.
    fn error(&self, message: &str);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
