//! Cluster configuration loading and validation.
//!
//! [`ClusterConf`] carries every tunable the backend reads, frozen at
//! construction.  The YAML file format is a flat mapping whose keys are the
//! dotted configuration names:
//!
//! ```yaml
//! cores.max: 8
//! cores.mb.min: 512
//! mesos.constraints: "zone:us-east-1"
//! shuffle.service.enabled: true
//! executor.home: /opt/executor
//! driver.host: 10.0.0.7
//! driver.port: 7077
//! ```
//!
//! Absent keys fall back to their documented defaults.  [`ClusterConf::validate`]
//! performs the start-up checks; a backend is never constructed from an
//! invalid configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::constraints::{ConstraintError, ConstraintSet};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Configuration problems that abort start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `executor.home` nor `executor.uri` is set, so there is no way
    /// to invoke the executor launcher on a node.
    #[error("executor.home must be set when no executor.uri is configured")]
    MissingExecutorHome,

    /// The driver endpoint that executors connect back to is unknown.
    #[error("driver.host and driver.port must be set (or `testing` enabled)")]
    MissingDriverAddress,

    /// `scheduler.min.registered.ratio` outside `[0, 1]`.
    #[error("scheduler.min.registered.ratio must be within [0, 1], got {0}")]
    RatioOutOfRange(f64),

    /// `cores.mb.min` / `cores.mb.max` do not describe a valid interval.
    #[error("cores.mb.min ({min}) must be non-negative and at most cores.mb.max ({max})")]
    InvalidMemoryBounds { min: f64, max: f64 },

    /// `mesos.constraints` could not be parsed.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

// ── ClusterConf ───────────────────────────────────────────────────────────────

/// Backend configuration, frozen at construction.
///
/// Field names follow the code; serde renames map them onto the dotted
/// configuration keys consumed from the YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConf {
    /// Cap on the total cpus acquired across all executors.
    #[serde(rename = "cores.max")]
    pub max_cores: u32,

    /// Minimum executor heap MB per acquired core.  Offers that cannot give
    /// every core this much memory have cores shed by the sizer.
    #[serde(rename = "cores.mb.min")]
    pub min_mb_per_core: f64,

    /// Maximum executor heap MB per acquired core.  Memory beyond this cap
    /// is left on the offer.
    #[serde(rename = "cores.mb.max")]
    pub max_mb_per_core: f64,

    /// How long `stop()` waits for live executors to drain, in ms.
    #[serde(rename = "mesos.coarse.shutdown.ms")]
    pub shutdown_timeout_ms: u64,

    /// Extra cpu shares advertised to the resource manager on top of the
    /// cpus the sizer granted (deliberate oversubscription).
    #[serde(rename = "mesos.extra.cores")]
    pub extra_cores_per_node: u32,

    /// Constraint expression restricting eligible nodes; see
    /// [`ConstraintSet`](crate::constraints::ConstraintSet).
    #[serde(rename = "mesos.constraints")]
    pub constraints: String,

    /// Register every executor's host with the external shuffle service.
    #[serde(rename = "shuffle.service.enabled")]
    pub shuffle_service_enabled: bool,

    /// Port the shuffle service listens on, on every node.
    #[serde(rename = "shuffle.service.port")]
    pub shuffle_service_port: u16,

    /// Executor installation directory on the nodes.  Required unless
    /// `executor.uri` is set.
    #[serde(rename = "executor.home")]
    pub executor_home: Option<String>,

    /// URI of an executor distribution archive fetched into the sandbox.
    #[serde(rename = "executor.uri")]
    pub executor_uri: Option<String>,

    /// Extra entries for the executor's `CLASSPATH`.
    #[serde(rename = "executor.extraClassPath")]
    pub extra_class_path: Option<String>,

    /// Extra JVM options passed through `EXECUTOR_OPTS`.
    #[serde(rename = "executor.extraJavaOptions")]
    pub extra_java_options: Option<String>,

    /// Native library path prepended to the launch command.
    #[serde(rename = "executor.extraLibraryPath")]
    pub extra_library_path: Option<String>,

    /// Additional URIs fetched into every executor sandbox.
    #[serde(rename = "mesos.uris")]
    pub uris: Vec<String>,

    /// Container image executors run inside, when containerised.
    #[serde(rename = "mesos.executor.docker.image")]
    pub docker_image: Option<String>,

    /// Host part of the driver endpoint executors connect back to.
    #[serde(rename = "driver.host")]
    pub driver_host: Option<String>,

    /// Port part of the driver endpoint.
    #[serde(rename = "driver.port")]
    pub driver_port: Option<u16>,

    /// Fraction of `cores.max` that must be acquired before the upstream
    /// scheduler considers registration sufficient.
    #[serde(rename = "scheduler.min.registered.ratio")]
    pub min_registered_ratio: f64,

    /// Relaxes the driver-address requirement for test rigs.
    pub testing: bool,
}

impl Default for ClusterConf {
    fn default() -> Self {
        Self {
            max_cores: u32::MAX,
            min_mb_per_core: 0.0,
            max_mb_per_core: f64::INFINITY,
            shutdown_timeout_ms: 10_000,
            extra_cores_per_node: 0,
            constraints: String::new(),
            shuffle_service_enabled: false,
            shuffle_service_port: 7337,
            executor_home: None,
            executor_uri: None,
            extra_class_path: None,
            extra_java_options: None,
            extra_library_path: None,
            uris: Vec::new(),
            docker_image: None,
            driver_host: None,
            driver_port: None,
            min_registered_ratio: 0.0,
            testing: false,
        }
    }
}

impl ClusterConf {
    /// Load a configuration file, leaving absent keys at their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is
    /// structurally invalid.  Semantic validation happens separately in
    /// [`validate`](Self::validate).
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        info!("Loading cluster configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let conf: ClusterConf = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        debug!(
            max_cores = conf.max_cores,
            min_mb_per_core = conf.min_mb_per_core,
            max_mb_per_core = conf.max_mb_per_core,
            shutdown_timeout_ms = conf.shutdown_timeout_ms,
            shuffle_service_enabled = conf.shuffle_service_enabled,
            "configuration loaded"
        );

        Ok(conf)
    }

    /// Run the start-up checks and parse the constraint expression.
    ///
    /// Returns the parsed [`ConstraintSet`] so the caller does not parse the
    /// expression twice.
    pub fn validate(&self) -> Result<ConstraintSet, ConfigError> {
        if self.executor_uri.is_none() && self.executor_home.is_none() {
            return Err(ConfigError::MissingExecutorHome);
        }
        if !self.testing && (self.driver_host.is_none() || self.driver_port.is_none()) {
            return Err(ConfigError::MissingDriverAddress);
        }
        if !(0.0..=1.0).contains(&self.min_registered_ratio) {
            return Err(ConfigError::RatioOutOfRange(self.min_registered_ratio));
        }
        if self.min_mb_per_core < 0.0 || self.min_mb_per_core > self.max_mb_per_core {
            return Err(ConfigError::InvalidMemoryBounds {
                min: self.min_mb_per_core,
                max: self.max_mb_per_core,
            });
        }
        Ok(ConstraintSet::parse(&self.constraints)?)
    }

    /// The driver endpoint advertised to executors.
    pub fn driver_url(&self) -> Result<String, ConfigError> {
        match (&self.driver_host, self.driver_port) {
            (Some(host), Some(port)) => Ok(format!("driver://{host}:{port}")),
            _ if self.testing => Ok("driver://localhost:0".to_string()),
            _ => Err(ConfigError::MissingDriverAddress),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn defaults_match_documented_values() {
        let conf = ClusterConf::default();
        assert_eq!(conf.max_cores, u32::MAX);
        assert_eq!(conf.min_mb_per_core, 0.0);
        assert_eq!(conf.max_mb_per_core, f64::INFINITY);
        assert_eq!(conf.shutdown_timeout_ms, 10_000);
        assert_eq!(conf.extra_cores_per_node, 0);
        assert!(!conf.shuffle_service_enabled);
        assert_eq!(conf.shuffle_service_port, 7337);
        assert_eq!(conf.min_registered_ratio, 0.0);
        assert!(conf.constraints.is_empty());
        assert!(conf.uris.is_empty());
    }

    // ── from_yaml_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
cores.max: 8
cores.mb.min: 512
cores.mb.max: 2048
mesos.coarse.shutdown.ms: 5000
mesos.extra.cores: 1
mesos.constraints: "zone:us-east-1"
shuffle.service.enabled: true
shuffle.service.port: 7447
executor.home: /opt/executor
executor.extraClassPath: /opt/libs/extra.jar
executor.extraJavaOptions: "-Dverbose=true"
executor.extraLibraryPath: /opt/native
mesos.uris:
  - http://repo/archive.tgz
mesos.executor.docker.image: registry/executor:1.4
driver.host: 10.0.0.7
driver.port: 7077
scheduler.min.registered.ratio: 0.5
"#;
        let f = yaml_tempfile(yaml);
        let conf = ClusterConf::from_yaml_file(f.path()).unwrap();

        assert_eq!(conf.max_cores, 8);
        assert_eq!(conf.min_mb_per_core, 512.0);
        assert_eq!(conf.max_mb_per_core, 2048.0);
        assert_eq!(conf.shutdown_timeout_ms, 5000);
        assert_eq!(conf.extra_cores_per_node, 1);
        assert_eq!(conf.constraints, "zone:us-east-1");
        assert!(conf.shuffle_service_enabled);
        assert_eq!(conf.shuffle_service_port, 7447);
        assert_eq!(conf.executor_home.as_deref(), Some("/opt/executor"));
        assert_eq!(conf.uris, vec!["http://repo/archive.tgz".to_string()]);
        assert_eq!(conf.docker_image.as_deref(), Some("registry/executor:1.4"));
        assert_eq!(conf.driver_host.as_deref(), Some("10.0.0.7"));
        assert_eq!(conf.driver_port, Some(7077));
        assert_eq!(conf.min_registered_ratio, 0.5);
    }

    #[test]
    fn absent_keys_fall_back_to_defaults() {
        let f = yaml_tempfile("cores.max: 4\n");
        let conf = ClusterConf::from_yaml_file(f.path()).unwrap();
        assert_eq!(conf.max_cores, 4);
        assert_eq!(conf.shutdown_timeout_ms, 10_000);
        assert_eq!(conf.max_mb_per_core, f64::INFINITY);
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ClusterConf::from_yaml_file(Path::new("/nonexistent/cluster.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("cores.max: [not: a: number:::");
        assert!(ClusterConf::from_yaml_file(f.path()).is_err());
    }

    // ── validate ──────────────────────────────────────────────────────────────

    fn valid_conf() -> ClusterConf {
        ClusterConf {
            executor_home: Some("/opt/executor".into()),
            driver_host: Some("10.0.0.7".into()),
            driver_port: Some(7077),
            ..ClusterConf::default()
        }
    }

    #[test]
    fn valid_configuration_passes() {
        assert!(valid_conf().validate().is_ok());
    }

    #[test]
    fn missing_executor_home_and_uri_fails() {
        let conf = ClusterConf {
            executor_home: None,
            ..valid_conf()
        };
        assert!(matches!(
            conf.validate(),
            Err(ConfigError::MissingExecutorHome)
        ));
    }

    #[test]
    fn executor_uri_alone_is_sufficient() {
        let conf = ClusterConf {
            executor_home: None,
            executor_uri: Some("http://repo/executor-1.4.tgz".into()),
            ..valid_conf()
        };
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn missing_driver_address_fails_unless_testing() {
        let conf = ClusterConf {
            driver_host: None,
            ..valid_conf()
        };
        assert!(matches!(
            conf.validate(),
            Err(ConfigError::MissingDriverAddress)
        ));

        let conf = ClusterConf {
            driver_host: None,
            driver_port: None,
            testing: true,
            ..valid_conf()
        };
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn ratio_out_of_range_fails() {
        let conf = ClusterConf {
            min_registered_ratio: 1.5,
            ..valid_conf()
        };
        assert!(matches!(conf.validate(), Err(ConfigError::RatioOutOfRange(_))));
    }

    #[test]
    fn inverted_memory_bounds_fail() {
        let conf = ClusterConf {
            min_mb_per_core: 2048.0,
            max_mb_per_core: 512.0,
            ..valid_conf()
        };
        assert!(matches!(
            conf.validate(),
            Err(ConfigError::InvalidMemoryBounds { .. })
        ));
    }

    #[test]
    fn malformed_constraints_fail_validation() {
        let conf = ClusterConf {
            constraints: "zone:a:b".into(),
            ..valid_conf()
        };
        assert!(matches!(conf.validate(), Err(ConfigError::Constraint(_))));
    }

    // ── driver_url ────────────────────────────────────────────────────────────

    #[test]
    fn driver_url_renders_host_and_port() {
        assert_eq!(valid_conf().driver_url().unwrap(), "driver://10.0.0.7:7077");
    }

    #[test]
    fn driver_url_placeholder_in_testing() {
        let conf = ClusterConf {
            driver_host: None,
            driver_port: None,
            testing: true,
            ..valid_conf()
        };
        assert_eq!(conf.driver_url().unwrap(), "driver://localhost:0");
    }
}
