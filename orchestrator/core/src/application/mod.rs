// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: the orchestrator loop and its command handle.

pub mod orchestrator;

pub use orchestrator::{FleetConfig, FleetSnapshot, Orchestrator, OrchestratorHandle};
