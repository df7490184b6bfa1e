// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

use crate::domain::drone::DroneId;

/// Caller-supplied task identity. Opaque text, unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "assigned" => Some(TaskStatus::Assigned),
            "running" => Some(TaskStatus::Running),
            "succeeded" => Some(TaskStatus::Succeeded),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses are immutable once recorded.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[derive(Debug, Error)]
pub enum TaskStateError {
    #[error("task {0} is terminal ({1:?}) and cannot be mutated")]
    Terminal(TaskId, TaskStatus),

    #[error("task {0} is {1:?}, expected {2:?}")]
    UnexpectedStatus(TaskId, TaskStatus, TaskStatus),
}

/// A unit of work executed by some drone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub payload: serde_json::Value,
    pub status: TaskStatus,
    /// Exactly one drone while Assigned/Running; cleared before reassignment.
    pub assigned_drone: Option<DroneId>,
    /// Number of times the task has been returned to Pending after losing
    /// its drone. Bounded by the fleet configuration.
    pub retries: u32,
    pub result: Option<serde_json::Value>,
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            payload,
            status: TaskStatus::Pending,
            assigned_drone: None,
            retries: 0,
            result: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn guard_not_terminal(&self) -> Result<(), TaskStateError> {
        if self.status.is_terminal() {
            return Err(TaskStateError::Terminal(self.id.clone(), self.status));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn assign(&mut self, drone: DroneId) -> Result<(), TaskStateError> {
        self.guard_not_terminal()?;
        if self.status != TaskStatus::Pending {
            return Err(TaskStateError::UnexpectedStatus(
                self.id.clone(),
                self.status,
                TaskStatus::Pending,
            ));
        }
        self.status = TaskStatus::Assigned;
        self.assigned_drone = Some(drone);
        self.touch();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), TaskStateError> {
        self.guard_not_terminal()?;
        if self.status != TaskStatus::Assigned {
            return Err(TaskStateError::UnexpectedStatus(
                self.id.clone(),
                self.status,
                TaskStatus::Assigned,
            ));
        }
        self.status = TaskStatus::Running;
        self.touch();
        Ok(())
    }

    pub fn succeed(&mut self, result: Option<serde_json::Value>) -> Result<(), TaskStateError> {
        self.guard_not_terminal()?;
        self.status = TaskStatus::Succeeded;
        self.result = result;
        self.assigned_drone = None;
        self.touch();
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TaskStateError> {
        self.guard_not_terminal()?;
        self.status = TaskStatus::Failed;
        self.failure = Some(reason.into());
        self.assigned_drone = None;
        self.touch();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), TaskStateError> {
        self.guard_not_terminal()?;
        self.status = TaskStatus::Cancelled;
        self.assigned_drone = None;
        self.touch();
        Ok(())
    }

    /// Return the task to Pending after its drone was lost, counting one
    /// reassignment against the retry bound.
    pub fn release(&mut self) -> Result<(), TaskStateError> {
        self.guard_not_terminal()?;
        if !matches!(self.status, TaskStatus::Assigned | TaskStatus::Running) {
            return Err(TaskStateError::UnexpectedStatus(
                self.id.clone(),
                self.status,
                TaskStatus::Assigned,
            ));
        }
        self.status = TaskStatus::Pending;
        self.assigned_drone = None;
        self.retries += 1;
        self.touch();
        Ok(())
    }
}
