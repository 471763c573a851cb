use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{CreateOptions, DockerClient, ProbeError};
use crate::engine::EngineError;
use crate::executor::{DockerExecutor, RealExecutor};
use crate::logs::pump_logs;
use crate::ports::{PortMappingError, parse_port_mappings};

/// How long the log printer may keep draining after the container exits.
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RunSpec {
    pub app_name: String,
    pub working_dir: PathBuf,
    pub tag: String,
    pub ports: Vec<String>,
    pub env: Vec<String>,
    pub detach: bool,
    pub auto_remove: bool,
}

impl RunSpec {
    /// `appName:tag`, the image the container is created from.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.app_name, self.tag)
    }
}

/// Lifecycle of a container owned by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Started,
    Running,
    Exited(i64),
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub container_id: String,
    /// Terminal state: `Exited(code)` or `Detached`.
    pub state: ContainerState,
}

/// Stops and removes a container on every exit path.
///
/// Call [`release`](Self::release) for an awaited teardown. If the guard is
/// dropped while still armed (early return, panic, cancelled future) the
/// teardown runs synchronously in `Drop`. [`disarm`](Self::disarm) hands the
/// container over to the engine without touching it.
pub struct ContainerGuard<'a, E: DockerExecutor> {
    client: &'a DockerClient<E>,
    id: String,
    armed: bool,
}

impl<'a, E: DockerExecutor> ContainerGuard<'a, E> {
    pub fn new(client: &'a DockerClient<E>, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
            armed: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Give up ownership; returns the container id.
    pub fn disarm(mut self) -> String {
        self.armed = false;
        std::mem::take(&mut self.id)
    }

    /// Stop (with grace period) then force-remove.
    pub async fn release(mut self) {
        if let Err(e) = self.client.stop_container(&self.id).await {
            tracing::warn!(container = %self.id, error = %e, "failed to stop container");
        }
        if let Err(e) = self.client.remove_container(&self.id).await {
            tracing::warn!(container = %self.id, error = %e, "failed to remove container");
        }
        self.armed = false;
        tracing::info!(container = %self.id, "container cleaned up");
    }
}

impl<E: DockerExecutor> Drop for ContainerGuard<'_, E> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(container = %self.id, "cleaning up container on drop");
            self.client.stop_and_remove_blocking(&self.id);
        }
    }
}

/// Runs a built image as a local container named after the app.
pub struct ContainerRunner<E: DockerExecutor = RealExecutor> {
    client: DockerClient<E>,
}

impl<E: DockerExecutor> ContainerRunner<E> {
    pub fn new(client: DockerClient<E>) -> Self {
        Self { client }
    }

    pub async fn run(
        &self,
        spec: &RunSpec,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        // Validate before any engine side effect.
        let ports = parse_port_mappings(&spec.ports)?;

        self.client.check_available().await?;

        let image = spec.image_reference();
        let exists = self
            .client
            .image_exists(&image)
            .await
            .map_err(|e| lifecycle("inspect", &image, e))?;
        if !exists {
            return Err(RunError::ImageNotFound { image });
        }

        let name = spec.app_name.as_str();
        if let Some(existing) = self
            .client
            .find_container(name)
            .await
            .map_err(|e| lifecycle("list", name, e))?
        {
            tracing::warn!(container = %existing, %name, "removing existing container with the same name");
            self.client
                .remove_container(&existing)
                .await
                .map_err(|e| lifecycle("remove", &existing, e))?;
        }

        let id = self
            .client
            .create_container(&CreateOptions {
                name,
                image: &image,
                ports: &ports,
                env: &spec.env,
                auto_remove: spec.auto_remove,
            })
            .await
            .map_err(|e| lifecycle("create", name, e))?;
        transition(&id, ContainerState::Created);

        let guard = ContainerGuard::new(&self.client, id);
        self.client
            .start_container(guard.id())
            .await
            .map_err(|e| lifecycle("start", guard.id(), e))?;
        transition(guard.id(), ContainerState::Started);

        if spec.detach {
            let container_id = guard.disarm();
            transition(&container_id, ContainerState::Detached);
            return Ok(RunOutcome {
                container_id,
                state: ContainerState::Detached,
            });
        }

        self.attach(guard, &spec.app_name, cancel).await
    }

    async fn attach(
        &self,
        guard: ContainerGuard<'_, E>,
        app_name: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let id = guard.id().to_owned();

        let mut printer = match self.client.follow_logs(&id) {
            Ok(rx) => {
                let prefix = app_name.to_owned();
                Some(tokio::spawn(async move {
                    pump_logs(rx, &prefix, tokio::io::stdout()).await
                }))
            }
            Err(e) => {
                tracing::warn!(container = %id, error = %e, "log streaming unavailable");
                None
            }
        };
        transition(&id, ContainerState::Running);

        let waited = tokio::select! {
            result = self.client.wait_container(&id) => Some(result),
            _ = cancel.cancelled() => None,
        };

        match waited {
            Some(Ok(code)) => {
                if let Some(handle) = printer.as_mut() {
                    match tokio::time::timeout(LOG_DRAIN_TIMEOUT, handle).await {
                        Ok(Ok(Err(e))) => tracing::warn!(error = %e, "log stream failed"),
                        Ok(Err(e)) => tracing::warn!(error = %e, "log task failed"),
                        Ok(Ok(Ok(lines))) => tracing::debug!(lines, "log stream drained"),
                        Err(elapsed) => {
                            tracing::debug!(container = %id, error = %elapsed, "log drain timed out")
                        }
                    }
                }
                guard.release().await;
                abort(printer);
                transition(&id, ContainerState::Exited(code));
                Ok(RunOutcome {
                    container_id: id,
                    state: ContainerState::Exited(code),
                })
            }
            Some(Err(e)) => {
                guard.release().await;
                abort(printer);
                Err(RunError::Wait { id, source: e })
            }
            None => {
                tracing::info!(container = %id, "run cancelled, stopping container");
                guard.release().await;
                abort(printer);
                Err(RunError::Cancelled { id })
            }
        }
    }
}

fn abort<T>(printer: Option<tokio::task::JoinHandle<T>>) {
    if let Some(handle) = printer {
        handle.abort();
    }
}

fn transition(id: &str, state: ContainerState) {
    tracing::debug!(container = %id, ?state, "container state");
}

fn lifecycle(action: &'static str, target: &str, source: EngineError) -> RunError {
    RunError::Lifecycle {
        action,
        target: target.to_owned(),
        source,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("image {image} not found locally, run `a0ctl build` first")]
    ImageNotFound { image: String },

    #[error(transparent)]
    InvalidPortMapping(#[from] PortMappingError),

    #[error("failed to {action} container {target}")]
    Lifecycle {
        action: &'static str,
        target: String,
        source: EngineError,
    },

    #[error("failed waiting for container {id}")]
    Wait { id: String, source: EngineError },

    #[error("run of container {id} was cancelled")]
    Cancelled { id: String },
}
