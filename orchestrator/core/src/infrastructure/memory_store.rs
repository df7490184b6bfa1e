// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! In-memory `StateStore` for development and tests.
//!
//! All maps live behind one mutex, so `transactionally` is trivially atomic.
//! Cloning the store shares the underlying state, which lets tests simulate
//! a crash-and-restart by building a fresh orchestrator over the same store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::drone::{Drone, DroneId};
use crate::domain::store::{StateStore, StoreError, WriteBatch};
use crate::domain::task::{Task, TaskId};

#[derive(Default)]
struct Inner {
    drones: HashMap<DroneId, Drone>,
    tasks: HashMap<TaskId, Task>,
}

#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_drone(&self, id: DroneId) -> Result<Option<Drone>, StoreError> {
        Ok(self.inner.lock().drones.get(&id).cloned())
    }

    async fn list_drones(&self) -> Result<Vec<Drone>, StoreError> {
        let mut drones: Vec<Drone> = self.inner.lock().drones.values().cloned().collect();
        drones.sort_by_key(|d| d.created_at);
        Ok(drones)
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.inner.lock().tasks.get(id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.inner.lock().tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn upsert_drone(&self, drone: &Drone) -> Result<(), StoreError> {
        self.inner.lock().drones.insert(drone.id, drone.clone());
        Ok(())
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.inner.lock().tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn remove_drone(&self, id: DroneId) -> Result<(), StoreError> {
        self.inner.lock().drones.remove(&id);
        Ok(())
    }

    async fn transactionally(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        for drone in batch.drones {
            inner.drones.insert(drone.id, drone);
        }
        for task in batch.tasks {
            inner.tasks.insert(task.id.clone(), task);
        }
        for id in batch.removed_drones {
            inner.drones.remove(&id);
        }
        Ok(())
    }
}
