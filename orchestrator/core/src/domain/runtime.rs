// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::drone::ContainerHandle;

/// Spawn specification handed to the runtime adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container resource name (carries the managed `spawner-` prefix).
    pub name: String,
    pub image: String,
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub resources: ResourceLimits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_millis: Option<u32>,
    pub memory_bytes: Option<u64>,
}

impl ResourceLimits {
    /// Parse a human-readable size string (e.g. "512Mi", "1Gi") to bytes.
    pub fn parse_size_to_bytes(size_str: &str) -> Option<u64> {
        let size_str = size_str.trim();
        if let Some(v) = size_str.strip_suffix("Gi") {
            v.parse::<u64>().ok().map(|v| v * 1024 * 1024 * 1024)
        } else if let Some(v) = size_str.strip_suffix("Mi") {
            v.parse::<u64>().ok().map(|v| v * 1024 * 1024)
        } else if let Some(v) = size_str.strip_suffix("Ki") {
            v.parse::<u64>().ok().map(|v| v * 1024)
        } else {
            size_str.parse::<u64>().ok()
        }
    }
}

/// Lifecycle notifications translated from the isolation backend into the
/// orchestrator's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEvent {
    pub handle: ContainerHandle,
    pub kind: ContainerEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerEventKind {
    Created,
    Started,
    Exited(i64),
    Removed,
}

pub type ContainerEventStream = Pin<Box<dyn Stream<Item = ContainerEvent> + Send>>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Infrastructure-level spawn failure (image pull, resource exhaustion).
    /// Surfaces to the orchestrator as a scheduling failure, never as a task
    /// failure.
    #[error("failed to spawn container: {0}")]
    SpawnFailed(String),

    #[error("failed to stop container: {0}")]
    StopFailed(String),

    #[error("failed to remove container: {0}")]
    RemoveFailed(String),

    #[error("failed to watch container events: {0}")]
    WatchFailed(String),

    #[error("failed to list containers: {0}")]
    ListFailed(String),

    #[error("container not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn spawn(&self, spec: ContainerSpec) -> Result<ContainerHandle, RuntimeError>;

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), RuntimeError>;

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError>;

    /// Lazy, restartable stream of lifecycle events for every managed
    /// container. Infinite until the watch is dropped.
    async fn watch(&self) -> Result<ContainerEventStream, RuntimeError>;

    /// Handles of every managed container the backend knows about, running
    /// or stopped. Reconciliation uses this to find containers that survived
    /// a crash without a matching durable record.
    async fn list_managed(&self) -> Result<Vec<ContainerHandle>, RuntimeError>;
}
