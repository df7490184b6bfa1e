// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod bus;
pub mod drone;
pub mod error;
pub mod message;
pub mod runtime;
pub mod store;
pub mod task;

pub use bus::{BusError, BusMessage, BusSubscription, MessageBus};
pub use drone::{ContainerHandle, Drone, DroneId, DroneState, InvalidTransition};
pub use error::OrchestratorError;
pub use message::{assign_subject, DroneEventKind, DroneStatusEvent, TaskAssignment, STATUS_SUBJECT};
pub use runtime::{
    ContainerEvent, ContainerEventKind, ContainerEventStream, ContainerRuntime, ContainerSpec,
    ResourceLimits, RuntimeError,
};
pub use store::{StateStore, StoreError, WriteBatch};
pub use task::{Task, TaskId, TaskStateError, TaskStatus};
