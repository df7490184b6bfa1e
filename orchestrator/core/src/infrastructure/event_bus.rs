// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
// Fleet Event Broadcaster - state-change notifications for observers
//
// Every durable transition the orchestrator commits is mirrored here so that
// control-channel clients (and the daemon's log surface) see fleet changes in
// real time. Events are derived from the state store, never authoritative.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::drone::{Drone, DroneId};
use crate::domain::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    DroneChanged(Drone),
    TaskChanged(Task),
    DroneRemoved(DroneId),
}

#[derive(Clone)]
pub struct FleetEvents {
    sender: Arc<broadcast::Sender<FleetEvent>>,
}

impl FleetEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: FleetEvent) {
        // send() fails only when no receiver exists, which is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> FleetEventReceiver {
        FleetEventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FleetEvents {
    fn default() -> Self {
        Self::new(1024)
    }
}

pub struct FleetEventReceiver {
    receiver: broadcast::Receiver<FleetEvent>,
}

impl FleetEventReceiver {
    pub async fn recv(&mut self) -> Result<FleetEvent, FleetEventError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => FleetEventError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("fleet event receiver lagged by {} events", n);
                FleetEventError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<FleetEvent, FleetEventError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => FleetEventError::Empty,
            broadcast::error::TryRecvError::Closed => FleetEventError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => FleetEventError::Lagged(n),
        })
    }
}

#[derive(Debug, Error)]
pub enum FleetEventError {
    #[error("fleet event channel is closed")]
    Closed,

    #[error("no events available")]
    Empty,

    #[error("receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
