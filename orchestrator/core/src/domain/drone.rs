// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::task::TaskId;

/// Prefix applied to every container resource the orchestrator owns, so that
/// managed containers can be recognized after a restart.
pub const RESOURCE_PREFIX: &str = "spawner-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DroneId(pub Uuid);

impl DroneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for DroneId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DroneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque backend container identifier returned by the runtime adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(pub String);

impl ContainerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Drone lifecycle states.
///
/// `Pending → Starting → Idle ⇄ Busy → Retiring → Retired`, with
/// `Starting/Idle/Busy → Suspect → Failed` on heartbeat timeout and
/// `Failed → Retiring` once container teardown has been requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneState {
    Pending,
    Starting,
    Idle,
    Busy,
    Suspect,
    Failed,
    Retiring,
    Retired,
}

impl DroneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DroneState::Pending => "pending",
            DroneState::Starting => "starting",
            DroneState::Idle => "idle",
            DroneState::Busy => "busy",
            DroneState::Suspect => "suspect",
            DroneState::Failed => "failed",
            DroneState::Retiring => "retiring",
            DroneState::Retired => "retired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DroneState::Pending),
            "starting" => Some(DroneState::Starting),
            "idle" => Some(DroneState::Idle),
            "busy" => Some(DroneState::Busy),
            "suspect" => Some(DroneState::Suspect),
            "failed" => Some(DroneState::Failed),
            "retiring" => Some(DroneState::Retiring),
            "retired" => Some(DroneState::Retired),
            _ => None,
        }
    }

    /// A drone counts against fleet capacity while it is active.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DroneState::Pending
                | DroneState::Starting
                | DroneState::Idle
                | DroneState::Busy
                | DroneState::Suspect
        )
    }

    pub fn can_transition(self, next: DroneState) -> bool {
        use DroneState::*;
        matches!(
            (self, next),
            (Pending, Starting)
                | (Pending, Retired)
                | (Starting, Idle)
                | (Starting, Suspect)
                | (Starting, Retiring)
                | (Idle, Busy)
                | (Idle, Suspect)
                | (Idle, Retiring)
                | (Busy, Idle)
                | (Busy, Suspect)
                | (Busy, Retiring)
                | (Suspect, Idle)
                | (Suspect, Busy)
                | (Suspect, Failed)
                | (Failed, Retiring)
                | (Retiring, Retired)
        )
    }
}

#[derive(Debug, Error)]
#[error("invalid drone transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: DroneState,
    pub to: DroneState,
}

/// A unit of isolated compute capacity.
///
/// The durable record in the state store is authoritative; the orchestrator's
/// in-memory copy is derived from it and rebuilt on startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub id: DroneId,
    pub state: DroneState,
    pub container: Option<ContainerHandle>,
    pub assigned_task: Option<TaskId>,
    pub last_heartbeat: DateTime<Utc>,
    /// When the drone last entered Idle. Heartbeats do not touch this, so it
    /// measures true idleness; cleared on any transition away from Idle.
    pub idle_since: Option<DateTime<Utc>>,
    /// Highest per-drone event sequence number applied so far. Status events
    /// at or below this are duplicates and must not be re-applied.
    pub last_seq: u64,
    pub exit_code: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Drone {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: DroneId::new(),
            state: DroneState::Pending,
            container: None,
            assigned_task: None,
            last_heartbeat: now,
            idle_since: None,
            last_seq: 0,
            exit_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Container name under which this drone's backend resource is created.
    pub fn resource_name(&self) -> String {
        format!("{}{}", RESOURCE_PREFIX, self.id.0)
    }

    pub fn transition(&mut self, next: DroneState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.updated_at = Utc::now();
        self.idle_since = if next == DroneState::Idle {
            Some(self.updated_at)
        } else {
            None
        };
        Ok(())
    }

    pub fn heartbeat(&mut self, at: DateTime<Utc>) {
        self.last_heartbeat = at;
        self.updated_at = at;
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

impl Default for Drone {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut drone = Drone::new();
        assert_eq!(drone.state, DroneState::Pending);
        drone.transition(DroneState::Starting).unwrap();
        drone.transition(DroneState::Idle).unwrap();
        drone.transition(DroneState::Busy).unwrap();
        drone.transition(DroneState::Idle).unwrap();
        drone.transition(DroneState::Retiring).unwrap();
        drone.transition(DroneState::Retired).unwrap();
        assert!(!drone.is_active());
    }

    #[test]
    fn test_failure_path_transitions() {
        let mut drone = Drone::new();
        drone.transition(DroneState::Starting).unwrap();
        drone.transition(DroneState::Idle).unwrap();
        drone.transition(DroneState::Suspect).unwrap();
        drone.transition(DroneState::Failed).unwrap();
        drone.transition(DroneState::Retiring).unwrap();
        drone.transition(DroneState::Retired).unwrap();
    }

    #[test]
    fn test_suspect_recovers_on_heartbeat() {
        let mut drone = Drone::new();
        drone.transition(DroneState::Starting).unwrap();
        drone.transition(DroneState::Idle).unwrap();
        drone.transition(DroneState::Suspect).unwrap();
        drone.transition(DroneState::Idle).unwrap();
        assert_eq!(drone.state, DroneState::Idle);
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut drone = Drone::new();
        let err = drone.transition(DroneState::Busy).unwrap_err();
        assert_eq!(err.from, DroneState::Pending);
        assert_eq!(err.to, DroneState::Busy);
        // Retired is terminal
        drone.transition(DroneState::Retired).unwrap();
        assert!(drone.transition(DroneState::Starting).is_err());
    }

    #[test]
    fn test_heartbeat_preserves_idle_marker() {
        let mut drone = Drone::new();
        drone.transition(DroneState::Starting).unwrap();
        assert!(drone.idle_since.is_none());
        drone.transition(DroneState::Idle).unwrap();
        let entered_idle = drone.idle_since.unwrap();

        drone.heartbeat(Utc::now());
        assert_eq!(drone.idle_since, Some(entered_idle));

        drone.transition(DroneState::Busy).unwrap();
        assert!(drone.idle_since.is_none());
        drone.transition(DroneState::Idle).unwrap();
        assert!(drone.idle_since.unwrap() >= entered_idle);
    }

    #[test]
    fn test_resource_name_carries_prefix() {
        let drone = Drone::new();
        assert!(drone.resource_name().starts_with(RESOURCE_PREFIX));
    }
}
