// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Presentation layer: the WebSocket control channel.

pub mod control;

pub use control::{router, ClientFrame, ControlState, ServerFrame};
