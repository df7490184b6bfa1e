// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Control Channel
//!
//! Bidirectional WebSocket surface for operators and embedding programs.
//! On connect a client receives one `snapshot` frame with the full fleet
//! state, then a live stream of `event` frames. The subscription is taken
//! *before* the snapshot is read, so no transition can fall between the two.
//!
//! Client commands (`submit`, `retire`, `list`) are forwarded to the
//! orchestrator and answered inline with `accepted`, `snapshot` or `error`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::OrchestratorHandle;
use crate::domain::drone::{Drone, DroneId};
use crate::domain::task::{Task, TaskId};
use crate::infrastructure::event_bus::{FleetEvent, FleetEventError, FleetEvents};

#[derive(Clone)]
pub struct ControlState {
    pub handle: OrchestratorHandle,
    pub events: FleetEvents,
}

/// Frames sent by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Submit {
        id: String,
        payload: serde_json::Value,
    },
    Retire {
        drone_id: String,
    },
    List,
}

/// Frames sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Snapshot { drones: Vec<Drone>, tasks: Vec<Task> },
    Event { event: FleetEvent },
    Accepted,
    Error { message: String },
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/control", get(control_socket))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn control_socket(
    ws: WebSocketUpgrade,
    State(state): State<ControlState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session(socket: WebSocket, state: ControlState) {
    let (mut outgoing, mut incoming) = socket.split();
    run_session(&mut incoming, &mut outgoing, state).await;
}

/// The session protocol, generic over the transport so that the
/// snapshot-then-stream sequencing can be exercised without a live socket.
async fn run_session<In, Out, E>(incoming: &mut In, outgoing: &mut Out, state: ControlState)
where
    In: Stream<Item = Result<Message, E>> + Unpin,
    Out: Sink<Message> + Unpin,
    E: std::fmt::Display,
{
    // subscribe first so the snapshot and the stream leave no gap
    let mut events = state.events.subscribe();
    if send_snapshot(outgoing, &state).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_frame(outgoing, &ServerFrame::Event { event }).await.is_err() {
                        break;
                    }
                }
                Err(FleetEventError::Lagged(n)) => {
                    // dropped events; resync the client from scratch
                    warn!(lagged = n, "control client lagged, resending snapshot");
                    if send_snapshot(outgoing, &state).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let response = apply_client_frame(&state, text.as_str()).await;
                    if send_frame(outgoing, &response).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%err, "control socket error");
                    break;
                }
            },
        }
    }
}

async fn send_snapshot<Out>(outgoing: &mut Out, state: &ControlState) -> Result<(), ()>
where
    Out: Sink<Message> + Unpin,
{
    let snapshot = state.handle.list().await.map_err(|_| ())?;
    send_frame(
        outgoing,
        &ServerFrame::Snapshot {
            drones: snapshot.drones,
            tasks: snapshot.tasks,
        },
    )
    .await
}

async fn send_frame<Out>(outgoing: &mut Out, frame: &ServerFrame) -> Result<(), ()>
where
    Out: Sink<Message> + Unpin,
{
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    outgoing.send(Message::Text(json.into())).await.map_err(|_| ())
}

async fn apply_client_frame(state: &ControlState, text: &str) -> ServerFrame {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            return ServerFrame::Error {
                message: format!("malformed frame: {err}"),
            }
        }
    };
    match frame {
        ClientFrame::Submit { id, payload } => {
            match state.handle.submit(Task::new(TaskId::new(id), payload)).await {
                Ok(()) => ServerFrame::Accepted,
                Err(err) => ServerFrame::Error {
                    message: err.to_string(),
                },
            }
        }
        ClientFrame::Retire { drone_id } => {
            let id = match DroneId::from_string(&drone_id) {
                Ok(id) => id,
                Err(_) => {
                    return ServerFrame::Error {
                        message: format!("not a drone id: {drone_id}"),
                    }
                }
            };
            match state.handle.retire(id).await {
                Ok(()) => ServerFrame::Accepted,
                Err(err) => ServerFrame::Error {
                    message: err.to_string(),
                },
            }
        }
        ClientFrame::List => match state.handle.list().await {
            Ok(snapshot) => ServerFrame::Snapshot {
                drones: snapshot.drones,
                tasks: snapshot.tasks,
            },
            Err(err) => ServerFrame::Error {
                message: err.to_string(),
            },
        },
    }
}
