/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Executor launch command assembly.
//!
//! Builds the [`CommandSpec`] the driver ships inside a launch: environment
//! bindings, URIs to fetch into the sandbox, and the shell line that starts
//! the executor process.  Two launch paths exist:
//!
//! * **Installed**: `executor.home` names a directory already present on
//!   every node; the launcher is invoked by absolute path.
//! * **Fetched**: `executor.uri` names a distribution archive; the resource
//!   manager unpacks it into the sandbox and the launcher is invoked relative
//!   to the unpacked directory (located by globbing the archive basename).
//!
//! The `--executor-id` flag differs between the two paths: bare node id when
//! installed, composite `<node>/<task>` when fetched.

use std::collections::BTreeMap;

use crate::config::{ClusterConf, ConfigError};

/// Launcher script, relative to the executor distribution root.
pub const EXECUTOR_LAUNCHER: &str = "bin/executor-backend";

// ── Specs ─────────────────────────────────────────────────────────────────────

/// Everything the driver needs to start the executor process.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Environment bindings for the executor process.
    pub environment: BTreeMap<String, String>,

    /// URIs fetched into the sandbox before the command runs.
    pub uris: Vec<String>,

    /// The shell command line.
    pub shell: String,
}

/// Container the executor runs inside, when `mesos.executor.docker.image`
/// is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub image: String,
}

// ── build_executor_command ────────────────────────────────────────────────────

/// Assemble the launch command for one executor.
///
/// `cores` is the cpu share the executor advertises (including the extra
/// oversubscribed cores); `heap_mem_mb` is the JVM heap from the sizer.
///
/// # Errors
/// [`ConfigError::MissingExecutorHome`] when neither launch path is
/// configured; normally caught earlier by configuration validation.
#[allow(clippy::too_many_arguments)]
pub fn build_executor_command(
    conf: &ClusterConf,
    executor_env: &BTreeMap<String, String>,
    driver_url: &str,
    app_id: &str,
    node_id: &str,
    task_id: u64,
    hostname: &str,
    cores: u32,
    heap_mem_mb: u64,
) -> Result<CommandSpec, ConfigError> {
    let mut environment = BTreeMap::new();
    environment.insert(
        "EXECUTOR_OPTS".to_string(),
        conf.extra_java_options.clone().unwrap_or_default(),
    );
    if let Some(class_path) = &conf.extra_class_path {
        environment.insert("CLASSPATH".to_string(), class_path.clone());
    }
    environment.insert("EXECUTOR_MEMORY".to_string(), format!("{heap_mem_mb}M"));
    for (key, value) in executor_env {
        environment.insert(key.clone(), value.clone());
    }

    let prefix = match &conf.extra_library_path {
        Some(path) => format!("LD_LIBRARY_PATH=\"{path}:$LD_LIBRARY_PATH\" "),
        None => String::new(),
    };

    let mut uris = conf.uris.clone();

    let shell = match &conf.executor_uri {
        None => {
            let home = conf
                .executor_home
                .as_deref()
                .ok_or(ConfigError::MissingExecutorHome)?;
            format!(
                "{prefix}\"{home}/{EXECUTOR_LAUNCHER}\" \
                 --driver-url {driver_url} --executor-id {node_id} \
                 --hostname {hostname} --cores {cores} --app-id {app_id}"
            )
        }
        Some(uri) => {
            uris.push(uri.clone());
            // the fetcher unpacks the archive next to the sandbox cwd; glob
            // the basename to find it regardless of version suffix
            let filename = uri.rsplit('/').next().unwrap_or(uri);
            let basename = filename.split('.').next().unwrap_or(filename);
            // composite executor id on this path; the installed path passes
            // the bare node id (kept asymmetric)
            format!(
                "cd {basename}*; {prefix}./{EXECUTOR_LAUNCHER} \
                 --driver-url {driver_url} --executor-id {node_id}/{task_id} \
                 --hostname {hostname} --cores {cores} --app-id {app_id}"
            )
        }
    };

    Ok(CommandSpec {
        environment,
        uris,
        shell,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
