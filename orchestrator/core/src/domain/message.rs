// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Bus message vocabulary between the orchestrator and drones.
//!
//! Assignments travel orchestrator → drone on a per-drone subject; status
//! events travel drone → orchestrator on the shared status subject. Every
//! status event carries a per-drone monotonically increasing sequence number
//! so that at-least-once delivery can be consumed idempotently.

use serde::{Deserialize, Serialize};

use crate::domain::drone::DroneId;
use crate::domain::task::TaskId;

/// Subject on which all drones publish status events.
pub const STATUS_SUBJECT: &str = "drone.status";

/// Per-drone subject on which the orchestrator publishes assignments.
pub fn assign_subject(drone_id: &DroneId) -> String {
    format!("drone.{}.assign", drone_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: TaskId,
    pub drone_id: DroneId,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DroneEventKind {
    Heartbeat,
    TaskStarted,
    TaskCompleted {
        exit_code: i64,
        result: Option<serde_json::Value>,
    },
    TaskFailed {
        reason: String,
    },
    ShuttingDown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneStatusEvent {
    pub drone_id: DroneId,
    pub task_id: Option<TaskId>,
    /// Monotonically increasing per drone. Events at or below the drone's
    /// stored `last_seq` are duplicates.
    pub seq: u64,
    #[serde(flatten)]
    pub kind: DroneEventKind,
}
