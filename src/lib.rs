/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Coarse-grained cluster scheduler backend.
//!
//! Couples a long-running compute application to a Mesos-style two-level
//! resource manager: registers the application as a framework, weighs
//! resource offers against outstanding demand, launches one long-lived
//! executor per accepted node, tracks executor lifecycles as status updates
//! arrive, and honours scale requests from the application's allocation
//! controller.  Resources, once accepted, are held for the lifetime of the
//! application.
//!
//! ```text
//! lib.rs
//! ├── config/      – ClusterConf: typed keys, YAML loading, validation
//! ├── offer        – resource offers, attributes, resource partitioning
//! ├── constraints  – offer attribute constraint matching
//! ├── sizing       – cpu/memory sizing policy for one executor
//! ├── command      – executor launch command assembly
//! ├── driver       – resource-manager driver contract (traits + wire types)
//! ├── upstream     – hosting-application adapter
//! ├── shuffle      – shuffle-service registration seam
//! └── backend/     – the lock-guarded offer/status/lifecycle state machine
//! ```
//!
//! The backend runs no threads of its own: the driver's callback threads,
//! the allocation controller and the main thread drive it, serialised on a
//! single state lock.  See [`backend::CoarseGrainedBackend`] for the
//! concurrency discipline.

pub mod backend;
pub mod command;
pub mod config;
pub mod constraints;
pub mod driver;
pub mod offer;
pub mod shuffle;
pub mod sizing;
pub mod upstream;

pub use backend::{BackendError, CoarseGrainedBackend, DeclineReason, MAX_NODE_FAILURES};
pub use config::{ClusterConf, ConfigError};
pub use driver::{
    FrameworkCallbacks, LaunchSpec, OfferFilter, SchedulerDriver, TaskState, TaskStatus,
};
pub use offer::ResourceOffer;
pub use shuffle::{NoopShuffleClient, ShuffleClient};
pub use sizing::ExecutorSizing;
pub use upstream::ApplicationHost;
