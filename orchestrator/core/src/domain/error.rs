// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Orchestrator error taxonomy.
//!
//! Infrastructure errors (`StoreUnavailable`, `SchedulingFailure`) are
//! retried with backoff and never surfaced as task failure. Task-level
//! errors (`ExhaustedRetries`) are terminal. `DuplicateTask` is rejected
//! synchronously to the submitter.

use thiserror::Error;

use crate::domain::drone::{DroneId, InvalidTransition};
use crate::domain::runtime::RuntimeError;
use crate::domain::store::StoreError;
use crate::domain::task::{TaskId, TaskStateError};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("duplicate task: {0}")]
    DuplicateTask(TaskId),

    #[error("state store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("scheduling failure: {0}")]
    SchedulingFailure(String),

    #[error("task {0} exhausted its retry budget")]
    ExhaustedRetries(TaskId),

    #[error("drone {0} is unresponsive")]
    DroneUnresponsive(DroneId),

    #[error("drone not found: {0}")]
    DroneNotFound(DroneId),

    #[error("invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    #[error("orchestrator is shutting down")]
    Shutdown,
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        OrchestratorError::StoreUnavailable(err.to_string())
    }
}

impl From<RuntimeError> for OrchestratorError {
    fn from(err: RuntimeError) -> Self {
        OrchestratorError::SchedulingFailure(err.to_string())
    }
}

impl From<InvalidTransition> for OrchestratorError {
    fn from(err: InvalidTransition) -> Self {
        OrchestratorError::InvalidTransition(err.to_string())
    }
}

impl From<TaskStateError> for OrchestratorError {
    fn from(err: TaskStateError) -> Self {
        OrchestratorError::InvalidTransition(err.to_string())
    }
}
