// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Node Configuration
//!
//! YAML configuration for the `spawnerd` daemon. Every section and field has
//! a working default, so an empty file (or no file) yields a usable local
//! node: SQLite store next to the working directory, local Docker daemon,
//! control channel on 127.0.0.1:7070.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use spawner_drone_core::application::FleetConfig;
use spawner_drone_core::domain::runtime::ResourceLimits;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Control channel listen address.
    pub listen: SocketAddr,
    pub store: StoreConfig,
    pub docker: DockerConfig,
    pub fleet: FleetSection,
    pub drone: DroneSection,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 7070)),
            store: StoreConfig::default(),
            docker: DockerConfig::default(),
            fleet: FleetSection::default(),
            drone: DroneSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database path; ignored by the memory backend.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("spawner.db"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    /// Volatile store; fleet state does not survive a restart.
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerConfig {
    /// Unix socket path of the Docker daemon. `None` uses the local default.
    pub socket: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetSection {
    pub max_fleet: usize,
    pub min_fleet: usize,
    pub max_task_retries: u32,
    #[serde(with = "humantime_serde")]
    pub heartbeat_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub suspect_grace: Duration,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub idle_retire_after: Option<Duration>,
}

impl Default for FleetSection {
    fn default() -> Self {
        let defaults = FleetConfig::default();
        Self {
            max_fleet: defaults.max_fleet,
            min_fleet: defaults.min_fleet,
            max_task_retries: defaults.max_task_retries,
            heartbeat_timeout: defaults.heartbeat_timeout,
            suspect_grace: defaults.suspect_grace,
            tick_interval: defaults.tick_interval,
            idle_retire_after: defaults.idle_retire_after,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DroneSection {
    pub image: String,
    pub command: Vec<String>,
    pub env: HashMap<String, String>,
    pub cpu_millis: Option<u32>,
    /// Human-readable memory limit, e.g. "512Mi" or "2Gi".
    pub memory: Option<String>,
}

impl Default for DroneSection {
    fn default() -> Self {
        Self {
            image: FleetConfig::default().drone_image,
            command: Vec::new(),
            env: HashMap::new(),
            cpu_millis: None,
            memory: None,
        }
    }
}

impl NodeConfig {
    /// Load from a YAML file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn fleet_config(&self) -> Result<FleetConfig> {
        let memory_bytes = match &self.drone.memory {
            Some(size) => match ResourceLimits::parse_size_to_bytes(size) {
                Some(bytes) => Some(bytes),
                None => bail!("invalid drone.memory value: {size}"),
            },
            None => None,
        };
        Ok(FleetConfig {
            max_fleet: self.fleet.max_fleet,
            min_fleet: self.fleet.min_fleet,
            max_task_retries: self.fleet.max_task_retries,
            heartbeat_timeout: self.fleet.heartbeat_timeout,
            suspect_grace: self.fleet.suspect_grace,
            tick_interval: self.fleet.tick_interval,
            idle_retire_after: self.fleet.idle_retire_after,
            drone_image: self.drone.image.clone(),
            drone_env: self.drone.env.clone(),
            drone_command: self.drone.command.clone(),
            resources: ResourceLimits {
                cpu_millis: self.drone.cpu_millis,
                memory_bytes,
            },
            ..FleetConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = NodeConfig::load(None).unwrap();
        assert_eq!(config.listen.port(), 7070);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert!(config.docker.socket.is_none());
        let fleet = config.fleet_config().unwrap();
        assert_eq!(fleet.max_fleet, 8);
    }

    #[test]
    fn test_load_overrides() {
        let yaml = r#"
listen: "0.0.0.0:9000"
store:
  backend: memory
fleet:
  max_fleet: 4
  heartbeat_timeout: 10s
  idle_retire_after: 5m
drone:
  image: "spawner/drone:v2"
  memory: "512Mi"
  cpu_millis: 500
  env:
    LOG_LEVEL: debug
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = NodeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.store.backend, StoreBackend::Memory);

        let fleet = config.fleet_config().unwrap();
        assert_eq!(fleet.max_fleet, 4);
        assert_eq!(fleet.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(fleet.idle_retire_after, Some(Duration::from_secs(300)));
        assert_eq!(fleet.drone_image, "spawner/drone:v2");
        assert_eq!(fleet.resources.memory_bytes, Some(512 * 1024 * 1024));
        assert_eq!(fleet.resources.cpu_millis, Some(500));
        assert_eq!(fleet.drone_env.get("LOG_LEVEL").unwrap(), "debug");
        // unset fields keep their defaults
        assert_eq!(fleet.min_fleet, 0);
    }

    #[test]
    fn test_invalid_memory_rejected() {
        let config = NodeConfig {
            drone: DroneSection {
                memory: Some("lots".to_string()),
                ..DroneSection::default()
            },
            ..NodeConfig::default()
        };
        assert!(config.fleet_config().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = "fleet:\n  max_drones: 4\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        assert!(NodeConfig::load(Some(file.path())).is_err());
    }
}
