// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # SQLite State Store
//!
//! Production `StateStore` backed by a local SQLite database via `sqlx`.
//! WAL journaling keeps the file crash-consistent; `transactionally` maps
//! directly onto a SQLite transaction so that drone/task pairs never land
//! half-written.
//!
//! Schema is created on open; identifiers are stored as TEXT, payloads and
//! results as JSON-encoded TEXT.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection};
use std::path::Path;

use crate::domain::drone::{ContainerHandle, Drone, DroneId, DroneState};
use crate::domain::store::{StateStore, StoreError, WriteBatch};
use crate::domain::task::{Task, TaskId, TaskStatus};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS drones (
    id             TEXT PRIMARY KEY,
    state          TEXT NOT NULL,
    container      TEXT,
    assigned_task  TEXT,
    idle_since     TEXT,
    last_heartbeat TEXT NOT NULL,
    last_seq       INTEGER NOT NULL,
    exit_code      INTEGER,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
    id             TEXT PRIMARY KEY,
    payload        TEXT NOT NULL,
    status         TEXT NOT NULL,
    assigned_drone TEXT,
    retries        INTEGER NOT NULL,
    result         TEXT,
    failure        TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);
"#;

#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Private per-connection databases would diverge, so the in-memory
    /// variant is pinned to a single connection.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    async fn upsert_drone_on(conn: &mut SqliteConnection, drone: &Drone) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO drones (
                id, state, container, assigned_task, idle_since,
                last_heartbeat, last_seq, exit_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                state = EXCLUDED.state,
                container = EXCLUDED.container,
                assigned_task = EXCLUDED.assigned_task,
                idle_since = EXCLUDED.idle_since,
                last_heartbeat = EXCLUDED.last_heartbeat,
                last_seq = EXCLUDED.last_seq,
                exit_code = EXCLUDED.exit_code,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(drone.id.0.to_string())
        .bind(drone.state.as_str())
        .bind(drone.container.as_ref().map(|c| c.as_str().to_string()))
        .bind(drone.assigned_task.as_ref().map(|t| t.as_str().to_string()))
        .bind(drone.idle_since)
        .bind(drone.last_heartbeat)
        .bind(drone.last_seq as i64)
        .bind(drone.exit_code)
        .bind(drone.created_at)
        .bind(drone.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn upsert_task_on(conn: &mut SqliteConnection, task: &Task) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&task.payload)?;
        let result = task
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, payload, status, assigned_drone, retries,
                result, failure, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                payload = EXCLUDED.payload,
                status = EXCLUDED.status,
                assigned_drone = EXCLUDED.assigned_drone,
                retries = EXCLUDED.retries,
                result = EXCLUDED.result,
                failure = EXCLUDED.failure,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(task.id.as_str())
        .bind(payload)
        .bind(task.status.as_str())
        .bind(task.assigned_drone.map(|d| d.0.to_string()))
        .bind(task.retries as i64)
        .bind(result)
        .bind(task.failure.clone())
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}

fn drone_from_row(row: &SqliteRow) -> Result<Drone, StoreError> {
    let id: String = row.get("id");
    let state: String = row.get("state");
    let container: Option<String> = row.get("container");
    let assigned_task: Option<String> = row.get("assigned_task");
    let idle_since: Option<DateTime<Utc>> = row.get("idle_since");
    let last_heartbeat: DateTime<Utc> = row.get("last_heartbeat");
    let last_seq: i64 = row.get("last_seq");
    let exit_code: Option<i64> = row.get("exit_code");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let id = DroneId::from_string(&id).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let state = DroneState::parse(&state)
        .ok_or_else(|| StoreError::Serialization(format!("unknown drone state '{state}'")))?;

    Ok(Drone {
        id,
        state,
        container: container.map(ContainerHandle::new),
        assigned_task: assigned_task.map(TaskId::new),
        idle_since,
        last_heartbeat,
        last_seq: last_seq as u64,
        exit_code,
        created_at,
        updated_at,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    let id: String = row.get("id");
    let payload: String = row.get("payload");
    let status: String = row.get("status");
    let assigned_drone: Option<String> = row.get("assigned_drone");
    let retries: i64 = row.get("retries");
    let result: Option<String> = row.get("result");
    let failure: Option<String> = row.get("failure");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let status = TaskStatus::parse(&status)
        .ok_or_else(|| StoreError::Serialization(format!("unknown task status '{status}'")))?;
    let assigned_drone = assigned_drone
        .map(|d| DroneId::from_string(&d))
        .transpose()
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let result = result
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Task {
        id: TaskId::new(id),
        payload: serde_json::from_str(&payload)?,
        status,
        assigned_drone,
        retries: retries as u32,
        result,
        failure,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get_drone(&self, id: DroneId) -> Result<Option<Drone>, StoreError> {
        let row = sqlx::query("SELECT * FROM drones WHERE id = $1")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(drone_from_row).transpose()
    }

    async fn list_drones(&self) -> Result<Vec<Drone>, StoreError> {
        let rows = sqlx::query("SELECT * FROM drones ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(drone_from_row).collect()
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn upsert_drone(&self, drone: &Drone) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_drone_on(&mut *conn, drone).await
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_task_on(&mut *conn, task).await
    }

    async fn remove_drone(&self, id: DroneId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM drones WHERE id = $1")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transactionally(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for drone in &batch.drones {
            Self::upsert_drone_on(&mut *tx, drone).await?;
        }
        for task in &batch.tasks {
            Self::upsert_task_on(&mut *tx, task).await?;
        }
        for id in &batch.removed_drones {
            sqlx::query("DELETE FROM drones WHERE id = $1")
                .bind(id.0.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
