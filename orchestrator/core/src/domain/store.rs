// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # State Store Contract
//!
//! Durable, crash-consistent persistence for `Drone` and `Task` records.
//! The store is the single authoritative source of fleet state: the
//! orchestrator writes every transition here *before* acting on the runtime
//! or the bus, and rebuilds its in-memory view from here on startup.
//!
//! | Trait | Implementations |
//! |-------|----------------|
//! | `StateStore` | `SqliteStateStore`, `MemoryStateStore` |
//!
//! Transitions that touch a drone and a task together (assignment, failure
//! handling) go through `transactionally`, which applies a `WriteBatch`
//! atomically: either every upsert/removal lands, or none do.

use async_trait::async_trait;

use crate::domain::drone::{Drone, DroneId};
use crate::domain::task::{Task, TaskId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// A set of writes applied atomically by `StateStore::transactionally`.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub drones: Vec<Drone>,
    pub tasks: Vec<Task>,
    pub removed_drones: Vec<DroneId>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drone(mut self, drone: Drone) -> Self {
        self.drones.push(drone);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_removed_drone(mut self, id: DroneId) -> Self {
        self.removed_drones.push(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty() && self.tasks.is_empty() && self.removed_drones.is_empty()
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_drone(&self, id: DroneId) -> Result<Option<Drone>, StoreError>;

    async fn list_drones(&self) -> Result<Vec<Drone>, StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn upsert_drone(&self, drone: &Drone) -> Result<(), StoreError>;

    async fn upsert_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Remove a drone row. Only called after `Retired` has been durably
    /// recorded, or to discard a `Pending` row whose container never spawned.
    async fn remove_drone(&self, id: DroneId) -> Result<(), StoreError>;

    /// Apply the batch atomically: all writes land or none do.
    async fn transactionally(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
