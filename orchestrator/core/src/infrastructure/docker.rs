// Copyright (c) 2026 Spawner Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Docker Runtime Adapter
//!
//! `ContainerRuntime` implementation over the Docker Engine API (`bollard`).
//! Managed containers are labeled `dev.spawner.managed=true` and named with
//! the `spawner-` prefix so that lifecycle events can be filtered to this
//! fleet and survivors can be recognized after a restart.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::EventMessage;
use bollard::system::EventsOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::StreamExt;
use tracing::{error, info};

use crate::domain::drone::ContainerHandle;
use crate::domain::runtime::{
    ContainerEvent, ContainerEventKind, ContainerEventStream, ContainerRuntime, ContainerSpec,
    RuntimeError,
};

const MANAGED_LABEL: &str = "dev.spawner.managed";
const DRONE_LABEL: &str = "dev.spawner.drone";
const DOCKER_TIMEOUT_SECONDS: u64 = 30;
const STOP_GRACE_SECONDS: i64 = 10;

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the Docker daemon over a custom unix socket, or fall back
    /// to local defaults.
    pub fn new(socket_path: Option<&str>) -> Result<Self, RuntimeError> {
        let docker = match socket_path {
            Some(path) => Docker::connect_with_unix(path, DOCKER_TIMEOUT_SECONDS, API_DEFAULT_VERSION)
                .map_err(|e| {
                    RuntimeError::SpawnFailed(format!("failed to connect to Docker at {path}: {e}"))
                })?,
            None => Docker::connect_with_local_defaults().map_err(|e| {
                RuntimeError::SpawnFailed(format!("failed to connect to Docker: {e}"))
            })?,
        };
        Ok(Self { docker })
    }

    /// Verify the Docker daemon is reachable.
    pub async fn healthcheck(&self) -> Result<(), RuntimeError> {
        self.docker
            .ping()
            .await
            .map_err(|e| RuntimeError::SpawnFailed(format!("Docker daemon not reachable: {e}")))?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!(image, "pulling image");
        let options = Some(CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| {
                RuntimeError::SpawnFailed(format!("failed to pull image {image}: {e}"))
            })?;
        }
        Ok(())
    }

    fn event_from_message(event: &EventMessage) -> Option<ContainerEvent> {
        let action = event.action.as_deref()?;
        let actor = event.actor.as_ref()?;
        let handle = ContainerHandle::new(actor.id.as_deref()?);

        let kind = match action {
            "create" => ContainerEventKind::Created,
            "start" => ContainerEventKind::Started,
            "die" => {
                let exit_code = actor
                    .attributes
                    .as_ref()
                    .and_then(|a| a.get("exitCode"))
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(-1);
                ContainerEventKind::Exited(exit_code)
            }
            "destroy" => ContainerEventKind::Removed,
            _ => return None,
        };

        Some(ContainerEvent { handle, kind })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn spawn(&self, spec: ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        // Pull the image only when it is not present locally.
        if self.docker.inspect_image(&spec.image).await.is_err() {
            self.pull_image(&spec.image).await?;
        }

        let env: Vec<String> = spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let mut host_config = bollard::models::HostConfig::default();
        if let Some(memory_bytes) = spec.resources.memory_bytes {
            host_config.memory = Some(memory_bytes as i64);
        }
        if let Some(cpu_millis) = spec.resources.cpu_millis {
            // 1 milli CPU = 1e6 nano CPUs
            host_config.nano_cpus = Some(i64::from(cpu_millis) * 1_000_000);
        }

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            cmd: if spec.command.is_empty() {
                None
            } else {
                Some(spec.command.clone())
            },
            labels: Some(
                [
                    (MANAGED_LABEL.to_string(), "true".to_string()),
                    (DRONE_LABEL.to_string(), spec.name.clone()),
                ]
                .into_iter()
                .collect(),
            ),
            host_config: Some(host_config),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::SpawnFailed(e.to_string()))?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::SpawnFailed(format!("failed to start container: {e}")))?;

        info!(container = %created.id, name = %spec.name, "spawned drone container");
        Ok(ContainerHandle::new(created.id))
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        let options = StopContainerOptions {
            t: STOP_GRACE_SECONDS,
        };
        match self.docker.stop_container(handle.as_str(), Some(options)).await {
            Ok(()) => Ok(()),
            // already gone or already stopped is fine for teardown purposes
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404 | 304,
                ..
            }) => Ok(()),
            Err(e) => Err(RuntimeError::StopFailed(e.to_string())),
        }
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self
            .docker
            .remove_container(handle.as_str(), Some(options))
            .await
        {
            Ok(()) => {
                info!(container = %handle, "removed drone container");
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(e) => Err(RuntimeError::RemoveFailed(e.to_string())),
        }
    }

    async fn list_managed(&self) -> Result<Vec<ContainerHandle>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: true,
            filters: [(
                "label".to_string(),
                vec![format!("{MANAGED_LABEL}=true")],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::ListFailed(e.to_string()))?;
        Ok(containers
            .into_iter()
            .filter_map(|c| c.id)
            .map(ContainerHandle::new)
            .collect())
    }

    async fn watch(&self) -> Result<ContainerEventStream, RuntimeError> {
        let options: EventsOptions<String> = EventsOptions {
            since: None,
            until: None,
            filters: [
                ("type".to_string(), vec!["container".to_string()]),
                (
                    "label".to_string(),
                    vec![format!("{MANAGED_LABEL}=true")],
                ),
            ]
            .into_iter()
            .collect(),
        };

        let stream = self
            .docker
            .events(Some(options))
            .filter_map(|event| async move {
                match event {
                    Ok(message) => Self::event_from_message(&message),
                    Err(err) => {
                        error!(%err, "error on Docker event stream");
                        None
                    }
                }
            });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{EventActor, EventMessage};
    use std::collections::HashMap;

    fn message(action: &str, id: &str, attributes: HashMap<String, String>) -> EventMessage {
        EventMessage {
            action: Some(action.to_string()),
            actor: Some(EventActor {
                id: Some(id.to_string()),
                attributes: Some(attributes),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_die_event_carries_exit_code() {
        let msg = message(
            "die",
            "c1",
            [("exitCode".to_string(), "137".to_string())].into(),
        );
        let event = DockerRuntime::event_from_message(&msg).unwrap();
        assert_eq!(event.handle, ContainerHandle::new("c1"));
        assert_eq!(event.kind, ContainerEventKind::Exited(137));
    }

    #[test]
    fn test_destroy_maps_to_removed() {
        let msg = message("destroy", "c2", HashMap::new());
        let event = DockerRuntime::event_from_message(&msg).unwrap();
        assert_eq!(event.kind, ContainerEventKind::Removed);
    }

    #[test]
    fn test_unhandled_actions_filtered() {
        let msg = message("exec_start", "c3", HashMap::new());
        assert!(DockerRuntime::event_from_message(&msg).is_none());
    }
}
