/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The coarse-grained scheduler backend.
//!
//! [`CoarseGrainedBackend`] couples the hosting application to the resource
//! manager: it weighs incoming offers against outstanding demand, launches
//! one long-lived executor per accepted node, tracks executor lifecycles as
//! statuses arrive, and honours scale requests from the application's
//! allocation controller.  Resources, once acquired, are held until the
//! application shuts down.
//!
//! # Concurrency model
//!
//! | Concern | Decision |
//! |---|---|
//! | Callback threads | Driver-owned; the backend runs no threads itself |
//! | Mutual exclusion | One non-reentrant state lock around every mutator |
//! | Offer batches | The whole batch is evaluated under one lock hold |
//! | Shutdown | CAS on an atomic flag, then a polled drain outside the lock |
//! | `app_id` / driver handle | Write-once cells, readable without the lock |
//!
//! The lock is private to the backend; upstream may take its own locks
//! inside adapter calls, and the ordering is always backend-lock first.
//! Terminal-status handling therefore completes (including the upstream
//! `remove_executor` and the offer revival) before any later offer batch for
//! the same node can be admitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::command::{build_executor_command, ContainerSpec};
use crate::config::{ClusterConf, ConfigError};
use crate::constraints::ConstraintSet;
use crate::driver::{
    format_executor_id, parse_executor_id, FrameworkCallbacks, LaunchSpec, OfferFilter,
    SchedulerDriver, TaskState, TaskStatus,
};
use crate::offer::{partition_resources, scalar_total, ResourceOffer, CPUS, MEM};
use crate::shuffle::ShuffleClient;
use crate::sizing::{size_executor, ExecutorSizing};
use crate::upstream::ApplicationHost;

pub mod error;
mod state;

pub use error::{BackendError, DeclineReason};
pub use state::MAX_NODE_FAILURES;

use state::BookkeepingState;

/// Sleep between drain polls while `stop()` waits for executors to finish.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ── CoarseGrainedBackend ──────────────────────────────────────────────────────

/// The offer-matching, resource-sizing and executor-lifecycle state machine.
///
/// Constructed once per application run, then driven entirely by external
/// callers: the driver's callback threads, the allocation controller, and
/// the main thread's `start`/`stop`.
pub struct CoarseGrainedBackend {
    conf: ClusterConf,
    constraints: ConstraintSet,
    driver_url: String,
    host: Arc<dyn ApplicationHost>,
    shuffle: Arc<dyn ShuffleClient>,
    driver: OnceLock<Arc<dyn SchedulerDriver>>,
    state: Mutex<BookkeepingState>,
    stop_called: AtomicBool,
    app_id: OnceLock<String>,
}

impl CoarseGrainedBackend {
    /// Validate the configuration and build a backend.
    ///
    /// # Errors
    /// Any [`ConfigError`] from validation; nothing else fails construction.
    pub fn new(
        conf: ClusterConf,
        host: Arc<dyn ApplicationHost>,
        shuffle: Arc<dyn ShuffleClient>,
    ) -> Result<Self, BackendError> {
        let constraints = conf.validate()?;
        let driver_url = conf.driver_url()?;
        Ok(Self {
            conf,
            constraints,
            driver_url,
            host,
            shuffle,
            driver: OnceLock::new(),
            state: Mutex::new(BookkeepingState::new()),
            stop_called: AtomicBool::new(false),
            app_id: OnceLock::new(),
        })
    }

    // ── Lifecycle (C7) ────────────────────────────────────────────────────────

    /// Attach the driver and begin registration.
    ///
    /// The driver must have been built with this backend as its callback
    /// sink.
    pub fn start(&self, driver: Arc<dyn SchedulerDriver>) -> Result<(), BackendError> {
        if self.driver.set(driver).is_err() {
            return Err(BackendError::AlreadyStarted);
        }
        info!(driver_url = %self.driver_url, "starting coarse-grained backend");
        if let Some(driver) = self.driver() {
            driver.start();
        }
        Ok(())
    }

    /// Shut down: stop admitting, run the upstream stop procedure, wait for
    /// live executors to drain (bounded by `mesos.coarse.shutdown.ms`), then
    /// stop the driver.  Idempotent: concurrent or repeated calls return
    /// immediately.
    pub fn stop(&self) {
        if self
            .stop_called
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("stop already in progress");
            return;
        }
        info!("stopping coarse-grained backend");
        {
            let _state = self.locked_state();
            self.host.stop();
        }

        // Drain outside the lock so status updates can still tear nodes down.
        let deadline = Instant::now() + Duration::from_millis(self.conf.shutdown_timeout_ms);
        loop {
            let live = self.locked_state().live_nodes();
            if live == 0 {
                debug!("all executors drained");
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    live,
                    timeout_ms = self.conf.shutdown_timeout_ms,
                    "shutdown drain timed out with executors still live"
                );
                break;
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }

        if let Some(driver) = self.driver() {
            driver.stop();
        }
    }

    /// Allocation controller: cap the number of live executors at `total`.
    /// Enforcement happens in the offer handler; running executors are not
    /// killed by lowering the limit.
    pub fn do_request_total_executors(&self, total: usize) -> bool {
        info!(total, "executor limit updated by allocation controller");
        self.locked_state().set_executor_limit(total);
        true
    }

    /// Allocation controller: kill specific executors by their composite
    /// `<node>/<task>` ids.  Teardown completes when the matching terminal
    /// status arrives.
    pub fn do_kill_executors(&self, executor_ids: &[String]) -> bool {
        let Some(driver) = self.driver() else {
            warn!("kill request before the backend was started");
            return false;
        };
        let mut state = self.locked_state();
        for executor_id in executor_ids {
            match parse_executor_id(executor_id) {
                Some((node_id, task_id)) => {
                    if state.node_in_use(node_id) {
                        info!(executor_id = %executor_id, "killing executor");
                        driver.kill_task(task_id);
                        state.mark_pending_removal(node_id);
                    } else {
                        debug!(executor_id = %executor_id, "kill requested for unknown executor");
                    }
                }
                None => warn!(executor_id = %executor_id, "unparseable executor id in kill request"),
            }
        }
        debug!(pending = state.pending_removals(), "pending executor removals");
        true
    }

    /// Has the framework acquired enough of its core budget for the upstream
    /// scheduler to start placing work?
    pub fn sufficient_resources_registered(&self) -> bool {
        let acquired = self.locked_state().total_cores_acquired();
        acquired as f64 >= self.conf.max_cores as f64 * self.conf.min_registered_ratio
    }

    // ── Read-only accessors ───────────────────────────────────────────────────

    /// Framework id assigned at registration, once available.
    pub fn application_id(&self) -> Option<&str> {
        self.app_id.get().map(String::as_str)
    }

    /// Endpoint executors connect back to.
    pub fn driver_url(&self) -> &str {
        &self.driver_url
    }

    pub fn total_cores_acquired(&self) -> u32 {
        self.locked_state().total_cores_acquired()
    }

    pub fn executor_count(&self) -> usize {
        self.locked_state().executor_count()
    }

    pub fn node_blacklisted(&self, node_id: &str) -> bool {
        self.locked_state().is_blacklisted(node_id)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn driver(&self) -> Option<&Arc<dyn SchedulerDriver>> {
        self.driver.get()
    }

    /// Acquire the state lock.  A poisoned lock is recovered: mutations keep
    /// the maps consistent before any call that could panic, so the held
    /// snapshot is coherent.
    fn locked_state(&self) -> MutexGuard<'_, BookkeepingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The per-offer admission gate.  Every check must pass for a launch;
    /// the first failing check names the decline.
    fn evaluate_offer(
        &self,
        state: &BookkeepingState,
        offer: &ResourceOffer,
    ) -> Result<ExecutorSizing, DeclineReason> {
        let live = state.executor_count();
        let limit = state.executor_limit();
        if live >= limit {
            return Err(DeclineReason::ExecutorLimitReached { live, limit });
        }

        let acquired = state.total_cores_acquired();
        if acquired >= self.conf.max_cores {
            return Err(DeclineReason::CoreCapReached {
                acquired,
                max: self.conf.max_cores,
            });
        }

        if !self.constraints.matches(&offer.attributes) {
            return Err(DeclineReason::ConstraintMismatch);
        }

        let offer_cpus = offer.cpus().floor() as u32;
        let offer_mem = offer.mem_mb().floor() as u64;
        let grantable_cpus = offer_cpus.min(self.conf.max_cores - acquired);
        let sizing = size_executor(
            grantable_cpus,
            offer_mem,
            self.host.memory_overhead_mb(),
            &self.conf,
        )
        .ok_or(DeclineReason::InsufficientResources {
            cpus: grantable_cpus,
            mem_mb: offer_mem,
        })?;

        let failures = state.failures(&offer.node_id);
        if failures >= MAX_NODE_FAILURES {
            return Err(DeclineReason::NodeBlacklisted { failures });
        }

        if state.node_in_use(&offer.node_id) {
            return Err(DeclineReason::NodeAlreadyInUse);
        }

        Ok(sizing)
    }

    /// Book the launch and hand it to the driver.  The 5 s filter keeps the
    /// resource manager from re-offering the node's remainder immediately.
    fn launch_on_offer(
        &self,
        state: &mut BookkeepingState,
        driver: &dyn SchedulerDriver,
        offer: &ResourceOffer,
        sizing: ExecutorSizing,
    ) -> Result<(), ConfigError> {
        let task_id = state.mint_task_id();
        let cpu_share = sizing.cpu_share(self.conf.extra_cores_per_node);
        let app_id = self.app_id.get().map(String::as_str).unwrap_or("");

        let command = build_executor_command(
            &self.conf,
            &self.host.executor_environment(),
            &self.driver_url,
            app_id,
            &offer.node_id,
            task_id,
            &offer.hostname,
            cpu_share,
            sizing.heap_mem_mb,
        )?;

        state.record_launch(task_id, &offer.node_id, &offer.hostname, sizing.cpus);

        // Carve the granted share out of the offer: cpus first, then memory
        // from what is left.
        let (_, rest) = partition_resources(&offer.resources, CPUS, sizing.cpus as f64);
        let (_, rest) = partition_resources(&rest, MEM, sizing.total_mem_mb as f64);
        debug!(
            offer_id = %offer.id,
            remaining_cpus = scalar_total(&rest, CPUS),
            remaining_mem_mb = scalar_total(&rest, MEM),
            "offer remainder after launch"
        );

        let spec = LaunchSpec {
            task_id,
            name: format!("executor {task_id}"),
            node_id: offer.node_id.clone(),
            cpu_share,
            mem_share_mb: sizing.total_mem_mb,
            command,
            container: self
                .conf
                .docker_image
                .clone()
                .map(|image| ContainerSpec { image }),
        };

        info!(
            task_id,
            node_id = %offer.node_id,
            hostname = %offer.hostname,
            cpus = sizing.cpus,
            cpu_share,
            mem_mb = sizing.total_mem_mb,
            heap_mb = sizing.heap_mem_mb,
            "launching executor"
        );
        driver.launch_task(&offer.id, spec, OfferFilter::default());
        Ok(())
    }

    /// Tear down the executor association for `node_id` and notify upstream.
    /// Idempotent: a node without a live executor is left untouched, so a
    /// lost node followed by its terminal status produces exactly one
    /// `remove_executor`.
    fn executor_terminated(&self, state: &mut BookkeepingState, node_id: &str, reason: &str) {
        if !state.node_in_use(node_id) {
            return;
        }
        if let Some(task_id) = state.remove_binding(node_id) {
            let executor_id = format_executor_id(node_id, task_id);
            info!(executor_id = %executor_id, reason, "removing executor");
            self.host.remove_executor(&executor_id, reason);
        }
        state.mark_node_free(node_id);
    }

    #[cfg(test)]
    pub(crate) fn assert_state_consistent(&self) {
        self.locked_state().assert_consistent();
    }
}

// ── Driver callbacks (C5 / C6 / parts of C7) ──────────────────────────────────

impl FrameworkCallbacks for CoarseGrainedBackend {
    fn registered(&self, framework_id: &str) {
        info!(app_id = %framework_id, "registered with the resource manager");
        if self.app_id.set(framework_id.to_string()).is_err() {
            warn!("duplicate registration callback ignored");
            return;
        }
        if self.conf.shuffle_service_enabled {
            self.shuffle.init(framework_id);
        }
        self.host.mark_registered();
    }

    fn reregistered(&self) {
        // TODO: reconcile executor state with the resource manager after a
        // master failover instead of assuming nothing changed
        info!("re-registered with the resource manager");
    }

    fn disconnected(&self) {
        info!("disconnected from the resource manager");
    }

    fn resource_offers(&self, offers: Vec<ResourceOffer>) {
        let Some(driver) = self.driver() else {
            warn!(count = offers.len(), "offers received before the driver was attached");
            return;
        };

        if self.stop_called.load(Ordering::SeqCst) {
            debug!(
                count = offers.len(),
                reason = %DeclineReason::ShutdownInProgress,
                "declining offer batch"
            );
            for offer in &offers {
                driver.decline_offer(&offer.id, None);
            }
            return;
        }

        let mut state = self.locked_state();
        for offer in offers {
            match self.evaluate_offer(&state, &offer) {
                Ok(sizing) => {
                    if let Err(err) = self.launch_on_offer(&mut state, driver.as_ref(), &offer, sizing)
                    {
                        warn!(
                            offer_id = %offer.id,
                            error = %err,
                            "could not build launch command; declining offer"
                        );
                        driver.decline_offer(&offer.id, None);
                    }
                }
                Err(reason) => {
                    debug!(
                        offer_id = %offer.id,
                        node_id = %offer.node_id,
                        cpus = offer.cpus(),
                        mem_mb = offer.mem_mb(),
                        %reason,
                        "declining offer"
                    );
                    driver.decline_offer(&offer.id, None);
                }
            }
        }
    }

    fn status_update(&self, status: TaskStatus) {
        let task_id: u64 = match status.task_id.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(task_id = %status.task_id, "unparseable task id in status update");
                return;
            }
        };
        info!(task_id, state = ?status.state, message = %status.message, "task status update");

        let mut state = self.locked_state();

        if status.state == TaskState::Running && self.conf.shuffle_service_enabled {
            let node_id = status
                .node_id
                .clone()
                .or_else(|| state.node_for_task(task_id).map(str::to_string));
            if let Some(node_id) = node_id {
                if let Some(host) = state.take_host(&node_id) {
                    // Synchronous call while the lock is held: the removal of
                    // the host entry makes the registration exactly-once per
                    // (application, host).
                    info!(host = %host, port = self.conf.shuffle_service_port, "registering driver with shuffle service");
                    if let Err(err) = self
                        .shuffle
                        .register_driver(&host, self.conf.shuffle_service_port)
                    {
                        warn!(host = %host, error = %err, "shuffle service registration failed");
                    }
                }
            }
        }

        if status.state.is_terminal() {
            if let Some(cores) = state.release_cores(task_id) {
                debug!(task_id, cores, "released cores");
            }
            // The bijection is authoritative for the node: the status may not
            // carry one, and a binding already gone means teardown has run.
            match state.node_for_task(task_id).map(str::to_string) {
                Some(node_id) => {
                    if status.state.is_failure() {
                        let failures = state.record_failure(&node_id);
                        if failures >= MAX_NODE_FAILURES {
                            warn!(
                                node_id = %node_id,
                                failures,
                                "node blacklisted after repeated executor failures"
                            );
                        }
                    }
                    let reason = format!("executor finished with state {:?}", status.state);
                    self.executor_terminated(&mut state, &node_id, &reason);
                }
                None => debug!(task_id, "terminal status for a task with no live binding"),
            }
            // Capacity freed: previously declined offers may fit now.
            if let Some(driver) = self.driver() {
                driver.revive_offers();
                self.host.offers_revived();
            }
        }
    }

    fn node_lost(&self, node_id: &str) {
        warn!(node_id = %node_id, "node lost");
        let mut state = self.locked_state();
        self.executor_terminated(&mut state, node_id, "node lost");
    }

    fn executor_lost(&self, executor_id: &str, node_id: &str, exit_status: i32) {
        warn!(
            executor_id = %executor_id,
            node_id = %node_id,
            exit_status,
            "executor process lost"
        );
        let mut state = self.locked_state();
        self.executor_terminated(&mut state, node_id, "executor lost");
    }

    fn error(&self, message: &str) {
        error!(message, "resource-manager driver error");
        self.host.report_fatal(message);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
