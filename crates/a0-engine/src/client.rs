use std::collections::BTreeMap;
use std::path::Path;

use tokio::sync::mpsc;

use crate::engine::EngineError;
use crate::executor::{DockerExecutor, RealExecutor, StdinWriter};
use crate::ports::PortMapping;

/// Seconds a container gets to exit on `stop` before it is killed.
pub const STOP_GRACE_SECS: u32 = 3;

/// Container engine client, parameterized over the executor for testability.
pub struct DockerClient<E: DockerExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor::new(),
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Probe ──

    /// Verify the engine is installed and its daemon reachable.
    ///
    /// Returns the server version reported by the daemon.
    pub async fn check_available(&self) -> Result<String, ProbeError> {
        let result = self
            .executor
            .exec(&args(["version", "--format", "{{.Server.Version}}"]))
            .await;
        let version = classify_probe(result)?;
        tracing::debug!(%version, "container engine available");
        Ok(version)
    }

    // ── Images ──

    /// Build from a tar context that `context` streams into stdin. Build
    /// output goes straight to the terminal.
    pub async fn build_image(
        &self,
        context: StdinWriter,
        request: &BuildRequest<'_>,
    ) -> Result<(), EngineError> {
        let mut cmd = args([
            "build",
            "--tag",
            request.tag,
            "--file",
            request.dockerfile,
            "--rm",
        ]);
        if let Some(platform) = request.platform.filter(|p| !p.is_empty()) {
            cmd.push("--platform".to_owned());
            cmd.push(platform.to_owned());
        }
        for (key, value) in request.labels {
            cmd.push("--label".to_owned());
            cmd.push(format!("{key}={value}"));
        }
        cmd.push("-".to_owned());

        self.executor.exec_with_stdin(&cmd, context).await
    }

    pub async fn image_exists(&self, reference: &str) -> Result<bool, EngineError> {
        match self
            .executor
            .exec(&args(["image", "inspect", "--format", "{{.Id}}", reference]))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_missing_object(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn tag_image(&self, source: &str, target: &str) -> Result<(), EngineError> {
        self.executor
            .exec(&args(["tag", source, target]))
            .await
            .map(|_| ())
    }

    pub async fn push_image(&self, reference: &str) -> Result<(), EngineError> {
        self.executor
            .exec_streaming(&args(["push", reference]))
            .await
    }

    pub async fn save_image(&self, reference: &str, output: &Path) -> Result<(), EngineError> {
        let output = output.to_string_lossy();
        self.executor
            .exec(&args(["save", "--output", &output, reference]))
            .await
            .map(|_| ())
    }

    // ── Containers ──

    /// Id of the container named exactly `name`, running or not.
    ///
    /// The engine's name filter is a regex match, so names are listed and
    /// compared here instead.
    pub async fn find_container(&self, name: &str) -> Result<Option<String>, EngineError> {
        let output = self
            .executor
            .exec(&args(["ps", "--all", "--format", "{{.ID}}\t{{.Names}}"]))
            .await?;
        Ok(output.lines().find_map(|line| {
            let (id, names) = line.trim().split_once('\t')?;
            names
                .split(',')
                .any(|n| n.trim().trim_start_matches('/') == name)
                .then(|| id.trim().to_owned())
        }))
    }

    pub async fn create_container(&self, opts: &CreateOptions<'_>) -> Result<String, EngineError> {
        let mut cmd = args(["create", "--name", opts.name]);
        for port in opts.ports {
            cmd.push("--publish".to_owned());
            cmd.push(port.to_string());
        }
        for env in opts.env {
            cmd.push("--env".to_owned());
            cmd.push(env.clone());
        }
        if opts.auto_remove {
            cmd.push("--rm".to_owned());
        }
        cmd.push(opts.image.to_owned());

        let output = self.executor.exec(&cmd).await?;
        Ok(output.trim().to_owned())
    }

    pub async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.executor
            .exec(&args(["start", id]))
            .await
            .map(|_| ())
    }

    /// A container that no longer exists counts as stopped.
    pub async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        let grace = STOP_GRACE_SECS.to_string();
        let result = self
            .executor
            .exec(&args(["stop", "--time", &grace, id]))
            .await;
        already_gone(id, result)
    }

    /// A container that no longer exists counts as removed.
    pub async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let result = self.executor.exec(&args(["rm", "--force", id])).await;
        already_gone(id, result)
    }

    /// Block until the container leaves the running state; returns its exit code.
    pub async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        let output = self.executor.exec(&args(["wait", id])).await?;
        let trimmed = output.trim();
        trimmed
            .lines()
            .last()
            // arch-lint: allow(no-silent-result-drop) reason="non-numeric output becomes a CommandFailed naming the output"
            .and_then(|l| l.trim().parse::<i64>().ok())
            .ok_or_else(|| EngineError::CommandFailed {
                args: args(["wait", id]),
                stderr: format!("unexpected wait output: {trimmed:?}"),
            })
    }

    /// Follow stdout and stderr of the container until it stops.
    pub fn follow_logs(&self, id: &str) -> Result<mpsc::Receiver<String>, EngineError> {
        self.executor
            .follow_output(&args(["logs", "--follow", id]))
    }

    /// Stop then force-remove without an async context. Failures are logged.
    pub fn stop_and_remove_blocking(&self, id: &str) {
        let grace = STOP_GRACE_SECS.to_string();
        let stopped = self
            .executor
            .exec_blocking(&args(["stop", "--time", &grace, id]));
        if let Err(e) = already_gone(id, stopped) {
            tracing::warn!(container = %id, error = %e, "failed to stop container");
        }
        let removed = self.executor.exec_blocking(&args(["rm", "--force", id]));
        if let Err(e) = already_gone(id, removed) {
            tracing::warn!(container = %id, error = %e, "failed to remove container");
        }
    }
}

/// Map a `docker version` outcome onto the probe taxonomy.
///
/// - the binary cannot run → [`ProbeError::EngineNotInstalled`]
/// - stderr mentions the daemon or a connection failure → [`ProbeError::DaemonNotRunning`]
/// - empty server version → [`ProbeError::DaemonNotRunning`]
pub fn classify_probe(result: Result<String, EngineError>) -> Result<String, ProbeError> {
    match result {
        Ok(out) if out.trim().is_empty() => Err(ProbeError::DaemonNotRunning),
        Ok(out) => Ok(out.trim().to_owned()),
        Err(EngineError::CommandFailed { stderr, .. }) => {
            let stderr = stderr.to_lowercase();
            if stderr.contains("daemon") || stderr.contains("connect") {
                Err(ProbeError::DaemonNotRunning)
            } else {
                Err(ProbeError::EngineNotInstalled)
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "engine probe could not run");
            Err(ProbeError::EngineNotInstalled)
        }
    }
}

fn already_gone(id: &str, result: Result<String, EngineError>) -> Result<(), EngineError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_missing_object(&e) => {
            tracing::debug!(container = %id, "container already gone");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_missing_object(e: &EngineError) -> bool {
    let stderr = e.stderr().to_lowercase();
    stderr.contains("no such") || stderr.contains("not found")
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Request types ──

pub struct BuildRequest<'a> {
    pub tag: &'a str,
    /// Dockerfile path relative to the context root
    pub dockerfile: &'a str,
    pub platform: Option<&'a str>,
    pub labels: &'a BTreeMap<String, String>,
}

pub struct CreateOptions<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub ports: &'a [PortMapping],
    pub env: &'a [String],
    pub auto_remove: bool,
}

// ── Error types ──

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Docker is not available or not installed. Please install Docker and ensure it's running")]
    EngineNotInstalled,

    #[error("Docker daemon is not running. Please start Docker and try again")]
    DaemonNotRunning,
}
