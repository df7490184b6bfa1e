// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
// In-process Message Bus - Pub/Sub over named subjects
//
// Provides at-least-once messaging between the orchestrator and drones
// using one tokio broadcast channel per subject. Subjects are created on
// first use by either side, so publish before subscribe never errors.
//
// Delivery drops only under subscriber lag. Assignments are re-driven by
// scheduling and status by heartbeats, so dropped messages are recoverable.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::domain::bus::{BusError, BusMessage, BusSubscription, MessageBus};

pub struct BroadcastBus {
    subjects: Mutex<HashMap<String, broadcast::Sender<BusMessage>>>,
    capacity: usize,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subjects: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn sender(&self, subject: &str) -> broadcast::Sender<BusMessage> {
        let mut subjects = self.subjects.lock();
        subjects
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MessageBus for BroadcastBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let message = BusMessage {
            subject: subject.to_string(),
            payload,
        };
        let receivers = self.sender(subject).send(message).unwrap_or(0);
        if receivers == 0 {
            debug!(subject, "no subscribers on subject");
        }
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError> {
        let receiver = self.sender(subject).subscribe();
        let subject = subject.to_string();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| {
            let subject = subject.clone();
            async move {
                match item {
                    Ok(message) => Some(message),
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!(subject, lagged = n, "bus subscriber lagged, messages dropped");
                        None
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }
}
