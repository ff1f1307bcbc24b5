/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shuffle-service registration seam.
//!
//! When the external shuffle service is enabled, every node that hosts an
//! executor must learn the driver's identity so it can clean up shuffle
//! state when the application exits.  The transport lives in the hosting
//! application; the backend only needs these two calls.

use thiserror::Error;

/// Registration failure against one node's shuffle service.
#[derive(Debug, Error)]
pub enum ShuffleError {
    #[error("shuffle service at {host}:{port} rejected driver registration: {reason}")]
    RegistrationFailed {
        host: String,
        port: u16,
        reason: String,
    },
}

/// Client for the per-node external shuffle service.
pub trait ShuffleClient: Send + Sync {
    /// Bind the client to the registered application id.  Called once,
    /// before any registration.
    fn init(&self, app_id: &str);

    /// Synchronously register the driver with the shuffle service on `host`.
    ///
    /// The backend calls this at most once per (application, host) pair.
    fn register_driver(&self, host: &str, port: u16) -> Result<(), ShuffleError>;
}

/// Client used when the shuffle service is disabled.
#[derive(Debug, Default)]
pub struct NoopShuffleClient;

impl ShuffleClient for NoopShuffleClient {
    fn init(&self, _app_id: &str) {}

    fn register_driver(&self, _host: &str, _port: u16) -> Result<(), ShuffleError> {
        Ok(())
    }
}
