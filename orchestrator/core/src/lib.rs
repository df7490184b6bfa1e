// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # spawner-drone-core
//!
//! Orchestration core for a fleet of containerized workers ("drones").
//!
//! # Architecture
//!
//! - **domain** — drone/task aggregates, lifecycle state machines, and the
//!   contracts for the effectful collaborators (state store, container
//!   runtime, message bus)
//! - **application** — the orchestrator: the single authority for lifecycle
//!   transitions, fed by one ordered command queue
//! - **infrastructure** — SQLite/in-memory state stores, Docker runtime
//!   adapter, in-process message bus, fleet event broadcaster
//! - **presentation** — WebSocket control channel (snapshot-then-stream)

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
