// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Fleet Orchestrator
//!
//! Single owner of all fleet state transitions. Every input - submissions,
//! drone status events, container lifecycle events, retirement requests,
//! the periodic tick - arrives on one ordered command channel and is applied
//! by one loop, so no transition ever races another.
//!
//! Durability discipline: every transition is written to the state store
//! *before* any runtime or bus side effect. If the daemon dies between the
//! write and the side effect, reconciliation repairs the difference on the
//! next start.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::bus::MessageBus;
use crate::domain::drone::{Drone, DroneId, DroneState};
use crate::domain::error::OrchestratorError;
use crate::domain::message::{assign_subject, DroneEventKind, DroneStatusEvent, TaskAssignment};
use crate::domain::runtime::{
    ContainerEvent, ContainerEventKind, ContainerRuntime, ContainerSpec, ResourceLimits,
};
use crate::domain::store::{StateStore, WriteBatch};
use crate::domain::task::{Task, TaskId, TaskStatus};
use crate::infrastructure::event_bus::{FleetEvent, FleetEvents};

const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Tunables governing fleet sizing, failure detection and retry bounds.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Hard ceiling on concurrently active drones.
    pub max_fleet: usize,
    /// Warm floor kept alive even when the queue is empty.
    pub min_fleet: usize,
    /// How many times a task may lose its drone before it is failed.
    pub max_task_retries: u32,
    /// Silence longer than this marks a drone Suspect.
    pub heartbeat_timeout: Duration,
    /// Time a Suspect drone gets to recover before it is declared Failed.
    pub suspect_grace: Duration,
    pub tick_interval: Duration,
    /// Retire idle drones after this long with no queued work. `None`
    /// disables idle collection.
    pub idle_retire_after: Option<Duration>,
    pub store_retry_base: Duration,
    pub store_retry_cap: Duration,
    pub store_retry_attempts: u32,
    pub drone_image: String,
    pub drone_env: HashMap<String, String>,
    pub drone_command: Vec<String>,
    pub resources: ResourceLimits,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_fleet: 8,
            min_fleet: 0,
            max_task_retries: 3,
            heartbeat_timeout: Duration::from_secs(30),
            suspect_grace: Duration::from_secs(15),
            tick_interval: Duration::from_secs(5),
            idle_retire_after: None,
            store_retry_base: Duration::from_millis(100),
            store_retry_cap: Duration::from_secs(5),
            store_retry_attempts: 5,
            drone_image: "spawner/drone:latest".to_string(),
            drone_env: HashMap::new(),
            drone_command: Vec::new(),
            resources: ResourceLimits::default(),
        }
    }
}

/// Point-in-time view of the fleet, served to control-channel clients before
/// they start consuming the live event stream.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FleetSnapshot {
    pub drones: Vec<Drone>,
    pub tasks: Vec<Task>,
}

enum Command {
    Submit {
        task: Task,
        reply: oneshot::Sender<Result<(), OrchestratorError>>,
    },
    Retire {
        drone_id: DroneId,
        reply: oneshot::Sender<Result<(), OrchestratorError>>,
    },
    List {
        reply: oneshot::Sender<FleetSnapshot>,
    },
    DroneEvent(DroneStatusEvent),
    ContainerEvent(ContainerEvent),
    Shutdown,
}

/// Cheap, clonable entry point into the orchestrator loop.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<Command>,
}

impl OrchestratorHandle {
    pub async fn submit(&self, task: Task) -> Result<(), OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Submit { task, reply })
            .await
            .map_err(|_| OrchestratorError::Shutdown)?;
        rx.await.map_err(|_| OrchestratorError::Shutdown)?
    }

    pub async fn retire(&self, drone_id: DroneId) -> Result<(), OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Retire { drone_id, reply })
            .await
            .map_err(|_| OrchestratorError::Shutdown)?;
        rx.await.map_err(|_| OrchestratorError::Shutdown)?
    }

    pub async fn list(&self) -> Result<FleetSnapshot, OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::List { reply })
            .await
            .map_err(|_| OrchestratorError::Shutdown)?;
        rx.await.map_err(|_| OrchestratorError::Shutdown)
    }

    pub async fn drone_event(&self, event: DroneStatusEvent) -> Result<(), OrchestratorError> {
        self.tx
            .send(Command::DroneEvent(event))
            .await
            .map_err(|_| OrchestratorError::Shutdown)
    }

    pub async fn container_event(&self, event: ContainerEvent) -> Result<(), OrchestratorError> {
        self.tx
            .send(Command::ContainerEvent(event))
            .await
            .map_err(|_| OrchestratorError::Shutdown)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

pub struct Orchestrator {
    store: Arc<dyn StateStore>,
    runtime: Arc<dyn ContainerRuntime>,
    bus: Arc<dyn MessageBus>,
    events: FleetEvents,
    config: FleetConfig,
    rx: mpsc::Receiver<Command>,
    fleet: HashMap<DroneId, Drone>,
    tasks: HashMap<TaskId, Task>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        bus: Arc<dyn MessageBus>,
        events: FleetEvents,
        config: FleetConfig,
    ) -> (Self, OrchestratorHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let orchestrator = Self {
            store,
            runtime,
            bus,
            events,
            config,
            rx,
            fleet: HashMap::new(),
            tasks: HashMap::new(),
        };
        (orchestrator, OrchestratorHandle { tx })
    }

    /// Rebuild the in-memory view from the store and repair inconsistencies
    /// left by a crash. Must run before `run`.
    pub async fn reconcile(&mut self) -> Result<(), OrchestratorError> {
        self.fleet = self
            .store
            .list_drones()
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();
        self.tasks = self
            .store
            .list_tasks()
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        info!(
            drones = self.fleet.len(),
            tasks = self.tasks.len(),
            "reconciling fleet state from store"
        );

        let mut batch = WriteBatch::new();

        // Pending rows whose container was never created are leftovers from
        // a crash between the write-ahead and the spawn call. Retired rows
        // are terminal and only linger if pruning was interrupted.
        for drone in self.fleet.values() {
            if drone.state == DroneState::Pending && drone.container.is_none() {
                warn!(drone = %drone.id, "discarding pending drone with no container");
                batch = batch.with_removed_drone(drone.id);
            }
            if drone.state == DroneState::Retired {
                batch = batch.with_removed_drone(drone.id);
            }
        }

        // Tasks attached to a drone that is gone or no longer working go
        // back to the queue, counting against their retry budget.
        for task in self.tasks.values().cloned().collect::<Vec<_>>() {
            if !matches!(task.status, TaskStatus::Assigned | TaskStatus::Running) {
                continue;
            }
            let holder_alive = task
                .assigned_drone
                .and_then(|id| self.fleet.get(&id))
                .map(|d| matches!(d.state, DroneState::Busy | DroneState::Suspect))
                .unwrap_or(false);
            if !holder_alive {
                let mut task = task;
                warn!(task = %task.id, "task lost its drone, returning to queue");
                self.release_or_exhaust(&mut task)?;
                batch = batch.with_task(task);
            }
        }

        // Busy drones whose task is gone or already terminal return to Idle.
        for drone in self.fleet.values().cloned().collect::<Vec<_>>() {
            if drone.state != DroneState::Busy {
                continue;
            }
            let task_live = drone
                .assigned_task
                .as_ref()
                .and_then(|id| self.tasks.get(id))
                .map(|t| {
                    matches!(t.status, TaskStatus::Assigned | TaskStatus::Running)
                        && t.assigned_drone == Some(drone.id)
                })
                .unwrap_or(false);
            if !task_live {
                let mut drone = drone;
                drone.assigned_task = None;
                drone.transition(DroneState::Idle)?;
                batch = batch.with_drone(drone);
            }
        }

        self.persist(batch).await?;

        // Re-issue teardown for drones whose removal may not have completed.
        for drone in self.fleet.values().cloned().collect::<Vec<_>>() {
            if matches!(drone.state, DroneState::Retiring | DroneState::Failed) {
                self.teardown(&drone).await;
            }
        }

        // Managed containers with no drone row survived a crash between the
        // spawn call and the container-handle persist. Remove them.
        match self.runtime.list_managed().await {
            Ok(handles) => {
                for handle in handles {
                    let known = self
                        .fleet
                        .values()
                        .any(|d| d.container.as_ref() == Some(&handle));
                    if !known {
                        warn!(container = %handle, "removing orphaned container");
                        if let Err(err) = self.runtime.stop(&handle).await {
                            warn!(%err, container = %handle, "failed to stop orphaned container");
                        }
                        if let Err(err) = self.runtime.remove(&handle).await {
                            warn!(%err, container = %handle, "failed to remove orphaned container");
                        }
                    }
                }
            }
            Err(err) => {
                warn!(%err, "could not list managed containers, skipping orphan sweep");
            }
        }

        self.schedule().await
    }

    /// Drive the command loop until shutdown. Consumes the orchestrator.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("orchestrator loop started");
        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(Command::Submit { task, reply }) => {
                        let _ = reply.send(self.submit(task).await);
                    }
                    Some(Command::Retire { drone_id, reply }) => {
                        let _ = reply.send(self.retire(drone_id).await);
                    }
                    Some(Command::List { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Command::DroneEvent(event)) => {
                        if let Err(err) = self.on_drone_event(event).await {
                            error!(%err, "failed to apply drone status event");
                        }
                    }
                    Some(Command::ContainerEvent(event)) => {
                        if let Err(err) = self.on_container_event(event).await {
                            error!(%err, "failed to apply container event");
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = ticker.tick() => {
                    if let Err(err) = self.tick().await {
                        error!(%err, "tick failed");
                    }
                }
            }
        }
        info!("orchestrator loop stopped");
    }

    fn snapshot(&self) -> FleetSnapshot {
        let mut drones: Vec<Drone> = self.fleet.values().cloned().collect();
        drones.sort_by_key(|d| d.created_at);
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        FleetSnapshot { drones, tasks }
    }

    /// Commit a batch to the store with bounded retry, then mirror it into
    /// the in-memory view and the fleet event stream. Nothing observes a
    /// transition before it is durable.
    async fn persist(&mut self, batch: WriteBatch) -> Result<(), OrchestratorError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut delay = self.config.store_retry_base;
        let mut attempt: u32 = 1;
        loop {
            match self.store.transactionally(batch.clone()).await {
                Ok(()) => break,
                Err(err) => {
                    if attempt >= self.config.store_retry_attempts {
                        error!(%err, attempt, "state store write failed, giving up");
                        return Err(err.into());
                    }
                    warn!(%err, attempt, "state store write failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.store_retry_cap);
                    attempt += 1;
                }
            }
        }
        for drone in batch.drones {
            self.fleet.insert(drone.id, drone.clone());
            self.events.publish(FleetEvent::DroneChanged(drone));
        }
        for task in batch.tasks {
            self.tasks.insert(task.id.clone(), task.clone());
            self.events.publish(FleetEvent::TaskChanged(task));
        }
        for id in batch.removed_drones {
            self.fleet.remove(&id);
            self.events.publish(FleetEvent::DroneRemoved(id));
        }
        Ok(())
    }

    async fn submit(&mut self, task: Task) -> Result<(), OrchestratorError> {
        if self.tasks.contains_key(&task.id) {
            return Err(OrchestratorError::DuplicateTask(task.id));
        }
        info!(task = %task.id, "task submitted");
        self.persist(WriteBatch::new().with_task(task)).await?;
        self.schedule().await
    }

    /// Pair queued tasks with idle drones, oldest task first onto the drone
    /// idle the longest, then grow the fleet toward the remaining demand.
    async fn schedule(&mut self) -> Result<(), OrchestratorError> {
        let mut pending: Vec<_> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| (t.created_at, t.id.clone()))
            .collect();
        pending.sort_by_key(|(created_at, _)| *created_at);

        let mut idle: Vec<_> = self
            .fleet
            .values()
            .filter(|d| d.state == DroneState::Idle)
            .map(|d| (d.updated_at, d.id))
            .collect();
        idle.sort_by_key(|(updated_at, _)| *updated_at);

        let mut assigned = 0usize;
        for ((_, task_id), (_, drone_id)) in pending.iter().zip(idle.iter()) {
            let (Some(mut task), Some(mut drone)) = (
                self.tasks.get(task_id).cloned(),
                self.fleet.get(drone_id).cloned(),
            ) else {
                continue;
            };
            task.assign(drone.id)?;
            drone.transition(DroneState::Busy)?;
            drone.assigned_task = Some(task.id.clone());

            let assignment = TaskAssignment {
                task_id: task.id.clone(),
                drone_id: drone.id,
                payload: task.payload.clone(),
            };
            self.persist(WriteBatch::new().with_drone(drone).with_task(task))
                .await?;

            // durable first, then tell the drone
            let payload = serde_json::to_vec(&assignment)
                .map_err(|e| OrchestratorError::SchedulingFailure(e.to_string()))?;
            if let Err(err) = self
                .bus
                .publish(&assign_subject(&assignment.drone_id), payload)
                .await
            {
                warn!(%err, drone = %assignment.drone_id, "failed to publish assignment");
            }
            info!(task = %assignment.task_id, drone = %assignment.drone_id, "task assigned");
            assigned += 1;
        }

        // Grow toward the backlog and the warm floor, bounded by max_fleet.
        // Tasks beyond the ceiling simply wait in the queue.
        let active = self.fleet.values().filter(|d| d.is_active()).count();
        let incoming = self
            .fleet
            .values()
            .filter(|d| matches!(d.state, DroneState::Pending | DroneState::Starting))
            .count();
        let backlog = pending.len().saturating_sub(assigned).saturating_sub(incoming);
        let floor = self.config.min_fleet.saturating_sub(active);
        let headroom = self.config.max_fleet.saturating_sub(active);
        for _ in 0..backlog.max(floor).min(headroom) {
            if let Err(err) = self.spawn_drone().await {
                warn!(%err, "drone spawn failed, queued tasks will wait");
                break;
            }
        }
        Ok(())
    }

    async fn spawn_drone(&mut self) -> Result<DroneId, OrchestratorError> {
        let drone = Drone::new();
        // write-ahead: the row exists before the container does
        self.persist(WriteBatch::new().with_drone(drone.clone()))
            .await?;

        let spec = ContainerSpec {
            name: drone.resource_name(),
            image: self.config.drone_image.clone(),
            env: self.config.drone_env.clone(),
            command: self.config.drone_command.clone(),
            resources: self.config.resources.clone(),
        };
        match self.runtime.spawn(spec).await {
            Ok(handle) => {
                let mut drone = drone;
                drone.container = Some(handle);
                drone.transition(DroneState::Starting)?;
                let id = drone.id;
                info!(drone = %id, "drone container spawned");
                self.persist(WriteBatch::new().with_drone(drone)).await?;
                Ok(id)
            }
            Err(err) => {
                self.persist(WriteBatch::new().with_removed_drone(drone.id))
                    .await?;
                Err(OrchestratorError::SchedulingFailure(err.to_string()))
            }
        }
    }

    /// Apply a status event published by a drone. Events carry a per-drone
    /// sequence number; anything at or below the stored watermark is a
    /// redelivery and is dropped without effect.
    async fn on_drone_event(&mut self, event: DroneStatusEvent) -> Result<(), OrchestratorError> {
        let Some(drone) = self.fleet.get(&event.drone_id).cloned() else {
            warn!(drone = %event.drone_id, "status event for unknown drone");
            return Ok(());
        };
        if event.seq <= drone.last_seq {
            debug!(
                drone = %drone.id,
                seq = event.seq,
                last_seq = drone.last_seq,
                "duplicate status event ignored"
            );
            return Ok(());
        }

        let mut drone = drone;
        drone.last_seq = event.seq;
        drone.heartbeat(Utc::now());
        if drone.state == DroneState::Suspect {
            let next = if drone.assigned_task.is_some() {
                DroneState::Busy
            } else {
                DroneState::Idle
            };
            drone.transition(next)?;
            info!(drone = %drone.id, "suspect drone recovered");
        }

        let task_id = event.task_id.clone().or_else(|| drone.assigned_task.clone());
        match event.kind {
            DroneEventKind::Heartbeat => {
                self.persist(WriteBatch::new().with_drone(drone)).await?;
            }
            DroneEventKind::TaskStarted => {
                let mut batch = WriteBatch::new();
                if let Some(mut task) = task_id.as_ref().and_then(|id| self.tasks.get(id)).cloned()
                {
                    task.start()?;
                    batch = batch.with_task(task);
                }
                self.persist(batch.with_drone(drone)).await?;
            }
            DroneEventKind::TaskCompleted { exit_code, result } => {
                let mut batch = WriteBatch::new();
                if let Some(mut task) = task_id.as_ref().and_then(|id| self.tasks.get(id)).cloned()
                {
                    if exit_code == 0 {
                        info!(task = %task.id, "task succeeded");
                        task.succeed(result)?;
                    } else {
                        info!(task = %task.id, exit_code, "task failed");
                        task.fail(format!("task exited with code {exit_code}"))?;
                    }
                    batch = batch.with_task(task);
                }
                drone.assigned_task = None;
                if drone.state == DroneState::Busy {
                    drone.transition(DroneState::Idle)?;
                }
                self.persist(batch.with_drone(drone)).await?;
                self.schedule().await?;
            }
            DroneEventKind::TaskFailed { reason } => {
                let mut batch = WriteBatch::new();
                if let Some(mut task) = task_id.as_ref().and_then(|id| self.tasks.get(id)).cloned()
                {
                    info!(task = %task.id, reason, "task failed");
                    task.fail(reason)?;
                    batch = batch.with_task(task);
                }
                drone.assigned_task = None;
                if drone.state == DroneState::Busy {
                    drone.transition(DroneState::Idle)?;
                }
                self.persist(batch.with_drone(drone)).await?;
                self.schedule().await?;
            }
            DroneEventKind::ShuttingDown => {
                info!(drone = %drone.id, "drone announced shutdown");
                let mut batch = WriteBatch::new();
                if let Some(task_id) = drone.assigned_task.take() {
                    if let Some(mut task) = self.tasks.get(&task_id).cloned() {
                        if matches!(task.status, TaskStatus::Assigned | TaskStatus::Running) {
                            self.release_or_exhaust(&mut task)?;
                            batch = batch.with_task(task);
                        }
                    }
                }
                drone.transition(DroneState::Retiring)?;
                let retiring = drone.clone();
                self.persist(batch.with_drone(drone)).await?;
                self.teardown(&retiring).await;
                self.schedule().await?;
            }
        }
        Ok(())
    }

    /// Apply a container lifecycle event reported by the runtime watch.
    async fn on_container_event(&mut self, event: ContainerEvent) -> Result<(), OrchestratorError> {
        let Some(drone) = self
            .fleet
            .values()
            .find(|d| d.container.as_ref() == Some(&event.handle))
            .cloned()
        else {
            debug!(container = %event.handle, "event for unmanaged container");
            return Ok(());
        };

        match event.kind {
            ContainerEventKind::Created => Ok(()),
            ContainerEventKind::Started => {
                if drone.state == DroneState::Starting {
                    let mut drone = drone;
                    drone.transition(DroneState::Idle)?;
                    drone.heartbeat(Utc::now());
                    info!(drone = %drone.id, "drone is ready");
                    self.persist(WriteBatch::new().with_drone(drone)).await?;
                    self.schedule().await?;
                }
                Ok(())
            }
            ContainerEventKind::Exited(code) => {
                let mut drone = drone;
                drone.exit_code = Some(code);
                match drone.state {
                    // expected during teardown; just record the exit code
                    DroneState::Retiring | DroneState::Retired | DroneState::Failed => {
                        self.persist(WriteBatch::new().with_drone(drone)).await
                    }
                    _ => {
                        warn!(drone = %drone.id, code, "container exited unexpectedly");
                        let mut batch = WriteBatch::new();
                        if let Some(task_id) = drone.assigned_task.take() {
                            if let Some(mut task) = self.tasks.get(&task_id).cloned() {
                                if matches!(
                                    task.status,
                                    TaskStatus::Assigned | TaskStatus::Running
                                ) {
                                    self.release_or_exhaust(&mut task)?;
                                    batch = batch.with_task(task);
                                }
                            }
                        }
                        if drone.state != DroneState::Suspect {
                            drone.transition(DroneState::Suspect)?;
                        }
                        drone.transition(DroneState::Failed)?;
                        drone.transition(DroneState::Retiring)?;
                        let dead = drone.clone();
                        self.persist(batch.with_drone(drone)).await?;
                        self.teardown(&dead).await;
                        self.schedule().await
                    }
                }
            }
            ContainerEventKind::Removed => {
                if drone.state == DroneState::Retiring {
                    let mut drone = drone;
                    drone.container = None;
                    drone.transition(DroneState::Retired)?;
                    info!(drone = %drone.id, "drone retired");
                    let id = drone.id;
                    // record the terminal state durably, then prune the row
                    self.persist(WriteBatch::new().with_drone(drone)).await?;
                    self.persist(WriteBatch::new().with_removed_drone(id))
                        .await?;
                }
                Ok(())
            }
        }
    }

    async fn retire(&mut self, drone_id: DroneId) -> Result<(), OrchestratorError> {
        let Some(drone) = self.fleet.get(&drone_id).cloned() else {
            return Err(OrchestratorError::DroneNotFound(drone_id));
        };
        match drone.state {
            // retirement is idempotent
            DroneState::Retiring | DroneState::Retired => return Ok(()),
            DroneState::Pending => {
                let mut drone = drone;
                drone.transition(DroneState::Retired)?;
                let id = drone.id;
                self.persist(WriteBatch::new().with_drone(drone)).await?;
                self.persist(WriteBatch::new().with_removed_drone(id))
                    .await?;
                return Ok(());
            }
            _ => {}
        }

        let mut drone = drone;
        let mut batch = WriteBatch::new();
        if let Some(task_id) = drone.assigned_task.take() {
            if let Some(mut task) = self.tasks.get(&task_id).cloned() {
                if matches!(task.status, TaskStatus::Assigned | TaskStatus::Running) {
                    self.release_or_exhaust(&mut task)?;
                    batch = batch.with_task(task);
                }
            }
        }
        if drone.state == DroneState::Suspect {
            drone.transition(DroneState::Failed)?;
        }
        drone.transition(DroneState::Retiring)?;
        info!(drone = %drone.id, "retiring drone");
        let retiring = drone.clone();
        self.persist(batch.with_drone(drone)).await?;
        self.teardown(&retiring).await;
        self.schedule().await
    }

    /// Periodic maintenance: failure detection, idle collection, scheduling.
    async fn tick(&mut self) -> Result<(), OrchestratorError> {
        let now = Utc::now();

        let ids: Vec<DroneId> = self.fleet.keys().copied().collect();
        for id in ids {
            let Some(drone) = self.fleet.get(&id).cloned() else {
                continue;
            };
            match drone.state {
                DroneState::Starting | DroneState::Idle | DroneState::Busy => {
                    let silent = (now - drone.last_heartbeat).to_std().unwrap_or_default();
                    if silent >= self.config.heartbeat_timeout {
                        let mut drone = drone;
                        warn!(drone = %drone.id, ?silent, "drone missed heartbeats, marking suspect");
                        drone.transition(DroneState::Suspect)?;
                        self.persist(WriteBatch::new().with_drone(drone)).await?;
                    }
                }
                DroneState::Suspect => {
                    // updated_at was set when the drone entered Suspect; any
                    // heartbeat since would have recovered it.
                    let suspect_for = (now - drone.updated_at).to_std().unwrap_or_default();
                    if suspect_for >= self.config.suspect_grace {
                        let mut drone = drone;
                        let cause = OrchestratorError::DroneUnresponsive(drone.id);
                        warn!(%cause, "suspect drone did not recover, failing it");
                        drone.transition(DroneState::Failed)?;
                        let mut batch = WriteBatch::new();
                        if let Some(task_id) = drone.assigned_task.take() {
                            if let Some(mut task) = self.tasks.get(&task_id).cloned() {
                                if matches!(
                                    task.status,
                                    TaskStatus::Assigned | TaskStatus::Running
                                ) {
                                    self.release_or_exhaust(&mut task)?;
                                    batch = batch.with_task(task);
                                }
                            }
                        }
                        drone.transition(DroneState::Retiring)?;
                        let dead = drone.clone();
                        self.persist(batch.with_drone(drone)).await?;
                        self.teardown(&dead).await;
                    }
                }
                _ => {}
            }
        }

        if let Some(idle_after) = self.config.idle_retire_after {
            self.collect_idle_drones(idle_after, now).await?;
        }

        self.schedule().await
    }

    /// Retire drones idle past the configured window, never shrinking below
    /// the warm floor, and never while work is queued.
    async fn collect_idle_drones(
        &mut self,
        idle_after: Duration,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), OrchestratorError> {
        if self
            .tasks
            .values()
            .any(|t| t.status == TaskStatus::Pending)
        {
            return Ok(());
        }
        // idleness is measured from idle_since, which heartbeats never touch
        let mut active = self.fleet.values().filter(|d| d.is_active()).count();
        let mut idle: Vec<Drone> = self
            .fleet
            .values()
            .filter(|d| {
                d.state == DroneState::Idle
                    && d.idle_since
                        .map(|at| (now - at).to_std().unwrap_or_default() >= idle_after)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        idle.sort_by_key(|d| d.idle_since);

        for drone in idle {
            if active <= self.config.min_fleet {
                break;
            }
            let mut drone = drone;
            info!(drone = %drone.id, "collecting idle drone");
            drone.transition(DroneState::Retiring)?;
            let retiring = drone.clone();
            self.persist(WriteBatch::new().with_drone(drone)).await?;
            self.teardown(&retiring).await;
            active -= 1;
        }
        Ok(())
    }

    /// Return a task to the queue, or fail it once its retry budget is spent.
    fn release_or_exhaust(&self, task: &mut Task) -> Result<(), OrchestratorError> {
        if task.retries >= self.config.max_task_retries {
            let terminal = OrchestratorError::ExhaustedRetries(task.id.clone());
            warn!(task = %task.id, retries = task.retries, "task exhausted its retry budget");
            task.fail(terminal.to_string())?;
        } else {
            task.release()?;
        }
        Ok(())
    }

    async fn teardown(&self, drone: &Drone) {
        let Some(handle) = &drone.container else {
            return;
        };
        if let Err(err) = self.runtime.stop(handle).await {
            warn!(%err, drone = %drone.id, "failed to stop container");
        }
        if let Err(err) = self.runtime.remove(handle).await {
            warn!(%err, drone = %drone.id, "failed to remove container");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drone::ContainerHandle;
    use crate::domain::message::STATUS_SUBJECT;
    use crate::domain::runtime::RuntimeError;
    use crate::infrastructure::bus::BroadcastBus;
    use crate::infrastructure::memory_store::MemoryStateStore;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MockRuntime {
        spawned: Mutex<Vec<ContainerSpec>>,
        stopped: Mutex<Vec<ContainerHandle>>,
        removed: Mutex<Vec<ContainerHandle>>,
        managed: Mutex<Vec<ContainerHandle>>,
        fail_spawn: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ContainerRuntime for MockRuntime {
        async fn spawn(&self, spec: ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
            if self.fail_spawn.load(Ordering::SeqCst) {
                return Err(RuntimeError::SpawnFailed("no capacity".into()));
            }
            let handle = ContainerHandle::new(format!("ctr-{}", spec.name));
            self.spawned.lock().push(spec);
            Ok(handle)
        }

        async fn stop(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
            self.stopped.lock().push(handle.clone());
            Ok(())
        }

        async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
            self.removed.lock().push(handle.clone());
            Ok(())
        }

        async fn watch(
            &self,
        ) -> Result<crate::domain::runtime::ContainerEventStream, RuntimeError> {
            Ok(Box::pin(futures::stream::pending()))
        }

        async fn list_managed(&self) -> Result<Vec<ContainerHandle>, RuntimeError> {
            Ok(self.managed.lock().clone())
        }
    }

    fn test_config() -> FleetConfig {
        FleetConfig {
            max_fleet: 2,
            min_fleet: 0,
            max_task_retries: 2,
            heartbeat_timeout: Duration::from_secs(3600),
            suspect_grace: Duration::from_secs(3600),
            tick_interval: Duration::from_millis(10),
            idle_retire_after: None,
            store_retry_base: Duration::ZERO,
            store_retry_cap: Duration::ZERO,
            store_retry_attempts: 1,
            drone_image: "spawner/drone:test".to_string(),
            drone_env: HashMap::new(),
            drone_command: Vec::new(),
            resources: ResourceLimits::default(),
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        runtime: Arc<MockRuntime>,
        store: MemoryStateStore,
        bus: Arc<BroadcastBus>,
        // keeps the command channel open
        _handle: OrchestratorHandle,
    }

    fn harness(config: FleetConfig) -> Harness {
        let store = MemoryStateStore::new();
        let runtime = Arc::new(MockRuntime::default());
        let bus = Arc::new(BroadcastBus::new(16));
        let (orchestrator, handle) = Orchestrator::new(
            Arc::new(store.clone()),
            runtime.clone(),
            bus.clone(),
            FleetEvents::new(64),
            config,
        );
        Harness {
            orchestrator,
            runtime,
            store,
            bus,
            _handle: handle,
        }
    }

    async fn seed_idle_drone(orchestrator: &mut Orchestrator) -> Drone {
        let mut drone = Drone::new();
        drone.container = Some(ContainerHandle::new(format!("ctr-{}", drone.id)));
        drone.transition(DroneState::Starting).unwrap();
        drone.transition(DroneState::Idle).unwrap();
        orchestrator
            .persist(WriteBatch::new().with_drone(drone.clone()))
            .await
            .unwrap();
        orchestrator.fleet.get(&drone.id).unwrap().clone()
    }

    fn task(id: &str) -> Task {
        Task::new(TaskId::new(id), json!({"op": "echo"}))
    }

    #[tokio::test]
    async fn test_submit_assigns_to_idle_drone_and_publishes() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        let mut sub = h.bus.subscribe(&assign_subject(&drone.id)).await.unwrap();

        h.orchestrator.submit(task("t-1")).await.unwrap();

        let stored = h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(stored.status, TaskStatus::Assigned);
        assert_eq!(stored.assigned_drone, Some(drone.id));
        let busy = h.orchestrator.fleet.get(&drone.id).unwrap();
        assert_eq!(busy.state, DroneState::Busy);
        assert_eq!(busy.assigned_task, Some(TaskId::new("t-1")));

        let msg = sub.next().await.unwrap();
        let assignment: TaskAssignment = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(assignment.task_id, TaskId::new("t-1"));
        assert_eq!(assignment.drone_id, drone.id);
    }

    #[tokio::test]
    async fn test_duplicate_submit_rejected() {
        let mut h = harness(test_config());
        h.orchestrator.submit(task("t-1")).await.unwrap();
        assert!(matches!(
            h.orchestrator.submit(task("t-1")).await,
            Err(OrchestratorError::DuplicateTask(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_spawns_drone_when_none_idle() {
        let mut h = harness(test_config());
        h.orchestrator.submit(task("t-1")).await.unwrap();

        assert_eq!(h.runtime.spawned.lock().len(), 1);
        let snapshot = h.orchestrator.snapshot();
        assert_eq!(snapshot.drones.len(), 1);
        assert_eq!(snapshot.drones[0].state, DroneState::Starting);
        // task waits until the container reports ready
        assert_eq!(snapshot.tasks[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_fleet_ceiling_applies_backpressure() {
        let mut h = harness(FleetConfig {
            max_fleet: 1,
            ..test_config()
        });
        h.orchestrator.submit(task("t-1")).await.unwrap();
        h.orchestrator.submit(task("t-2")).await.unwrap();
        h.orchestrator.submit(task("t-3")).await.unwrap();

        // only one drone ever spawns; the rest of the queue waits
        assert_eq!(h.runtime.spawned.lock().len(), 1);
        let snapshot = h.orchestrator.snapshot();
        assert_eq!(snapshot.drones.len(), 1);
        assert!(snapshot
            .tasks
            .iter()
            .all(|t| t.status == TaskStatus::Pending));
    }

    #[tokio::test]
    async fn test_started_event_promotes_drone_and_schedules() {
        let mut h = harness(test_config());
        h.orchestrator.submit(task("t-1")).await.unwrap();
        let drone = h.orchestrator.snapshot().drones[0].clone();

        h.orchestrator
            .on_container_event(ContainerEvent {
                handle: drone.container.clone().unwrap(),
                kind: ContainerEventKind::Started,
            })
            .await
            .unwrap();

        let snapshot = h.orchestrator.snapshot();
        assert_eq!(snapshot.drones[0].state, DroneState::Busy);
        assert_eq!(snapshot.tasks[0].status, TaskStatus::Assigned);
    }

    #[tokio::test]
    async fn test_task_lifecycle_to_success() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();

        h.orchestrator
            .on_drone_event(DroneStatusEvent {
                drone_id: drone.id,
                task_id: Some(TaskId::new("t-1")),
                seq: 1,
                kind: DroneEventKind::TaskStarted,
            })
            .await
            .unwrap();
        assert_eq!(
            h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap().status,
            TaskStatus::Running
        );

        h.orchestrator
            .on_drone_event(DroneStatusEvent {
                drone_id: drone.id,
                task_id: Some(TaskId::new("t-1")),
                seq: 2,
                kind: DroneEventKind::TaskCompleted {
                    exit_code: 0,
                    result: Some(json!({"out": "done"})),
                },
            })
            .await
            .unwrap();

        let finished = h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(finished.status, TaskStatus::Succeeded);
        assert_eq!(finished.result, Some(json!({"out": "done"})));
        let idle = h.orchestrator.fleet.get(&drone.id).unwrap();
        assert_eq!(idle.state, DroneState::Idle);
        assert_eq!(idle.last_seq, 2);
    }

    #[tokio::test]
    async fn test_duplicate_seq_is_a_noop() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();

        let completed = DroneStatusEvent {
            drone_id: drone.id,
            task_id: Some(TaskId::new("t-1")),
            seq: 1,
            kind: DroneEventKind::TaskCompleted {
                exit_code: 0,
                result: None,
            },
        };
        h.orchestrator.on_drone_event(completed.clone()).await.unwrap();
        // redelivery of the same event must not be re-applied
        h.orchestrator.on_drone_event(completed).await.unwrap();

        let finished = h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(finished.status, TaskStatus::Succeeded);
        assert_eq!(h.orchestrator.fleet.get(&drone.id).unwrap().last_seq, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_timeout_fails_drone_and_releases_task() {
        let mut h = harness(FleetConfig {
            heartbeat_timeout: Duration::ZERO,
            suspect_grace: Duration::ZERO,
            ..test_config()
        });
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();

        h.orchestrator.tick().await.unwrap();
        assert_eq!(
            h.orchestrator.fleet.get(&drone.id).unwrap().state,
            DroneState::Suspect
        );

        h.orchestrator.tick().await.unwrap();
        let failed = h.orchestrator.fleet.get(&drone.id).unwrap();
        assert_eq!(failed.state, DroneState::Retiring);
        let released = h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(released.status, TaskStatus::Pending);
        assert_eq!(released.retries, 1);
        assert!(!h.runtime.removed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_suspect_drone_recovers_on_heartbeat() {
        let mut h = harness(FleetConfig {
            heartbeat_timeout: Duration::ZERO,
            ..test_config()
        });
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.tick().await.unwrap();
        assert_eq!(
            h.orchestrator.fleet.get(&drone.id).unwrap().state,
            DroneState::Suspect
        );

        h.orchestrator
            .on_drone_event(DroneStatusEvent {
                drone_id: drone.id,
                task_id: None,
                seq: 1,
                kind: DroneEventKind::Heartbeat,
            })
            .await
            .unwrap();
        assert_eq!(
            h.orchestrator.fleet.get(&drone.id).unwrap().state,
            DroneState::Idle
        );
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_fails_task() {
        let mut h = harness(FleetConfig {
            heartbeat_timeout: Duration::ZERO,
            suspect_grace: Duration::ZERO,
            max_task_retries: 0,
            ..test_config()
        });
        seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();

        h.orchestrator.tick().await.unwrap(); // suspect
        h.orchestrator.tick().await.unwrap(); // failed, budget spent

        let exhausted = h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(exhausted.status, TaskStatus::Failed);
        let reason = OrchestratorError::ExhaustedRetries(exhausted.id.clone()).to_string();
        assert_eq!(exhausted.failure.as_deref(), Some(reason.as_str()));
    }

    #[tokio::test]
    async fn test_spawn_failure_keeps_task_pending() {
        let h = harness(test_config());
        h.runtime.fail_spawn.store(true, Ordering::SeqCst);
        let mut orchestrator = h.orchestrator;

        orchestrator.submit(task("t-1")).await.unwrap();

        // infrastructure failure is not task failure
        let queued = orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(queued.status, TaskStatus::Pending);
        assert_eq!(queued.retries, 0);
        // the write-ahead row was discarded
        assert!(orchestrator.fleet.is_empty());
        assert!(h.store.list_drones().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retire_is_idempotent_and_tears_down() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;

        h.orchestrator.retire(drone.id).await.unwrap();
        assert_eq!(
            h.orchestrator.fleet.get(&drone.id).unwrap().state,
            DroneState::Retiring
        );
        assert_eq!(h.runtime.stopped.lock().len(), 1);
        assert_eq!(h.runtime.removed.lock().len(), 1);

        // second request is a no-op
        h.orchestrator.retire(drone.id).await.unwrap();
        assert_eq!(h.runtime.stopped.lock().len(), 1);

        // once Retired is recorded, the row is pruned everywhere
        h.orchestrator
            .on_container_event(ContainerEvent {
                handle: drone.container.clone().unwrap(),
                kind: ContainerEventKind::Removed,
            })
            .await
            .unwrap();
        assert!(!h.orchestrator.fleet.contains_key(&drone.id));
        assert!(h.store.list_drones().await.unwrap().is_empty());

        assert!(matches!(
            h.orchestrator.retire(DroneId::new()).await,
            Err(OrchestratorError::DroneNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_idle_collection_survives_heartbeats() {
        let mut h = harness(FleetConfig {
            idle_retire_after: Some(Duration::from_millis(50)),
            ..test_config()
        });
        let drone = seed_idle_drone(&mut h.orchestrator).await;

        // age the idle marker past the window, then deliver a routine
        // heartbeat; the heartbeat must not reset idleness
        let mut aged = h.orchestrator.fleet.get(&drone.id).unwrap().clone();
        aged.idle_since = Some(Utc::now() - chrono::Duration::seconds(60));
        h.orchestrator
            .persist(WriteBatch::new().with_drone(aged))
            .await
            .unwrap();
        h.orchestrator
            .on_drone_event(DroneStatusEvent {
                drone_id: drone.id,
                task_id: None,
                seq: 1,
                kind: DroneEventKind::Heartbeat,
            })
            .await
            .unwrap();

        h.orchestrator.tick().await.unwrap();
        assert_eq!(
            h.orchestrator.fleet.get(&drone.id).unwrap().state,
            DroneState::Retiring
        );
    }

    #[tokio::test]
    async fn test_reconcile_removes_orphaned_containers() {
        let mut h = harness(test_config());
        let known = seed_idle_drone(&mut h.orchestrator).await;
        let orphan = ContainerHandle::new("ctr-no-row");
        {
            let mut managed = h.runtime.managed.lock();
            managed.push(known.container.clone().unwrap());
            managed.push(orphan.clone());
        }

        // restart over the same store; the orphan has no drone row
        let (mut restarted, _handle) = Orchestrator::new(
            Arc::new(h.store.clone()),
            h.runtime.clone(),
            h.bus.clone(),
            FleetEvents::new(64),
            test_config(),
        );
        restarted.reconcile().await.unwrap();

        assert!(h.runtime.removed.lock().contains(&orphan));
        assert!(!h
            .runtime
            .removed
            .lock()
            .contains(known.container.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn test_unexpected_exit_releases_task() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();

        h.orchestrator
            .on_container_event(ContainerEvent {
                handle: drone.container.clone().unwrap(),
                kind: ContainerEventKind::Exited(137),
            })
            .await
            .unwrap();

        let dead = h.orchestrator.fleet.get(&drone.id).unwrap();
        assert_eq!(dead.state, DroneState::Retiring);
        assert_eq!(dead.exit_code, Some(137));
        let released = h.orchestrator.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(released.status, TaskStatus::Pending);
        assert_eq!(released.retries, 1);
    }

    #[tokio::test]
    async fn test_reconcile_rebuilds_and_repairs() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();

        // a pending row with no container, as left by a crash mid-spawn
        let orphan = Drone::new();
        h.store.upsert_drone(&orphan).await.unwrap();
        // a task attached to a drone that no longer exists
        let mut lost = task("t-2");
        lost.assign(DroneId::new()).unwrap();
        h.store.upsert_task(&lost).await.unwrap();

        // restart over the same store
        let (mut restarted, _handle) = Orchestrator::new(
            Arc::new(h.store.clone()),
            h.runtime.clone(),
            h.bus.clone(),
            FleetEvents::new(64),
            test_config(),
        );
        restarted.reconcile().await.unwrap();

        // the live assignment survived intact
        let kept = restarted.tasks.get(&TaskId::new("t-1")).unwrap();
        assert_eq!(kept.status, TaskStatus::Assigned);
        assert_eq!(kept.assigned_drone, Some(drone.id));
        assert_eq!(
            restarted.fleet.get(&drone.id).unwrap().state,
            DroneState::Busy
        );
        // the orphaned row was discarded
        assert!(!restarted.fleet.contains_key(&orphan.id));
        // the lost task went back to the queue and was rescheduled
        let requeued = restarted.tasks.get(&TaskId::new("t-2")).unwrap();
        assert_eq!(requeued.retries, 1);
        assert!(matches!(
            requeued.status,
            TaskStatus::Pending | TaskStatus::Assigned
        ));
    }

    #[tokio::test]
    async fn test_single_assignment_per_drone() {
        let mut h = harness(test_config());
        let drone = seed_idle_drone(&mut h.orchestrator).await;
        h.orchestrator.submit(task("t-1")).await.unwrap();
        // stop the second submission from growing the fleet
        h.runtime.fail_spawn.store(true, Ordering::SeqCst);
        h.orchestrator.submit(task("t-2")).await.unwrap();

        let holders: Vec<_> = h
            .orchestrator
            .tasks
            .values()
            .filter(|t| t.assigned_drone == Some(drone.id))
            .collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(
            h.orchestrator.tasks.get(&TaskId::new("t-2")).unwrap().status,
            TaskStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_idle_drones_collected_above_floor() {
        let mut h = harness(FleetConfig {
            idle_retire_after: Some(Duration::ZERO),
            min_fleet: 1,
            ..test_config()
        });
        let first = seed_idle_drone(&mut h.orchestrator).await;
        let second = seed_idle_drone(&mut h.orchestrator).await;

        h.orchestrator.tick().await.unwrap();

        let retiring = h
            .orchestrator
            .fleet
            .values()
            .filter(|d| d.state == DroneState::Retiring)
            .count();
        let idle = h
            .orchestrator
            .fleet
            .values()
            .filter(|d| d.state == DroneState::Idle)
            .count();
        // one collected, one kept as the warm floor
        assert_eq!(retiring, 1);
        assert_eq!(idle, 1);
        let _ = (first, second);
    }

    #[tokio::test]
    async fn test_status_subject_round_trip() {
        // the wire shape drones publish on the shared subject
        let h = harness(test_config());
        let mut sub = h.bus.subscribe(STATUS_SUBJECT).await.unwrap();
        let event = DroneStatusEvent {
            drone_id: DroneId::new(),
            task_id: None,
            seq: 1,
            kind: DroneEventKind::Heartbeat,
        };
        h.bus
            .publish(STATUS_SUBJECT, serde_json::to_vec(&event).unwrap())
            .await
            .unwrap();
        let msg = sub.next().await.unwrap();
        let decoded: DroneStatusEvent = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(decoded.drone_id, event.drone_id);
    }
}
