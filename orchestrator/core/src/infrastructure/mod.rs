// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod bus;
pub mod docker;
pub mod event_bus;
pub mod memory_store;
pub mod sqlite_store;

pub use bus::BroadcastBus;
pub use docker::DockerRuntime;
pub use event_bus::{FleetEvent, FleetEventReceiver, FleetEvents};
pub use memory_store::MemoryStateStore;
pub use sqlite_store::SqliteStateStore;
