// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("message bus is closed")]
    Closed,

    #[error("subscriber lagged by {0} messages (messages were dropped)")]
    Lagged(u64),

    #[error("publish failed: {0}")]
    Publish(String),
}

pub type BusSubscription = Pin<Box<dyn Stream<Item = BusMessage> + Send>>;

/// Publish/subscribe transport between the orchestrator and drones.
///
/// Delivery is at-least-once: consumers must treat every message as
/// potentially duplicated and apply it idempotently (per-drone sequence
/// numbers, see `domain::message`). Publish is fire-and-forget from the
/// caller's perspective.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError>;

    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError>;
}
