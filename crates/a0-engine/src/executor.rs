use std::io::Write;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::io::SyncIoBridge;

use crate::engine::EngineError;

/// Buffered lines between a followed process and its consumer.
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Producer for a child's stdin. It runs off the async runtime and may
/// write any amount of data.
pub type StdinWriter = Box<dyn FnOnce(&mut dyn Write) -> std::io::Result<()> + Send>;

/// Abstraction over container engine CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait DockerExecutor: Send + Sync {
    /// Execute an engine command and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, EngineError>;

    /// Execute an engine command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), EngineError>;

    /// Execute an engine command whose stdin is written by `stdin` on a
    /// blocking thread, streaming its output to the terminal.
    ///
    /// A non-zero exit is reported as [`EngineError::CommandFailed`] even when
    /// the writer failed too, since an early exit breaks the pipe.
    async fn exec_with_stdin(&self, args: &[String], stdin: StdinWriter)
    -> Result<(), EngineError>;

    /// Spawn a long-running command and deliver its stdout and stderr lines
    /// through a channel. The channel closes once the process has exited and
    /// both streams are drained.
    fn follow_output(&self, args: &[String]) -> Result<mpsc::Receiver<String>, EngineError>;

    /// Blocking variant of [`exec`](Self::exec), for cleanup on drop where
    /// no async context can be awaited.
    fn exec_blocking(&self, args: &[String]) -> Result<String, EngineError>;
}

/// Real engine CLI executor (`docker` by default).
#[derive(Debug, Clone)]
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a Docker-compatible CLI other than `docker`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn not_found(&self, source: std::io::Error) -> EngineError {
        EngineError::NotFound {
            program: self.program.clone(),
            source,
        }
    }

    fn command(&self, args: &[String]) -> tokio::process::Command {
        tracing::debug!(program = %self.program, ?args, "engine command");
        let mut cmd = tokio::process::Command::new(&self.program);
        // Dropping the future (cancellation) must not leave the CLI running.
        cmd.args(args).kill_on_drop(true);
        cmd
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, EngineError> {
        let output = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.not_found(e))?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| EngineError::InvalidUtf8 { source: e })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr,
            })
        }
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), EngineError> {
        let status = self
            .command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.not_found(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin: StdinWriter,
    ) -> Result<(), EngineError> {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.not_found(e))?;

        let pipe = child.stdin.take().ok_or_else(|| EngineError::StdinWrite {
            source: std::io::Error::other("child stdin was not captured"),
        })?;
        let mut bridge = SyncIoBridge::new(pipe);
        let writer = tokio::task::spawn_blocking(move || {
            stdin(&mut bridge)?;
            bridge.shutdown()
        });

        let (written, status) = tokio::join!(writer, child.wait());
        let status = status.map_err(|e| self.not_found(e))?;

        if !status.success() {
            if let Ok(Err(e)) = &written {
                tracing::debug!(error = %e, "stdin writer stopped early");
            }
            return Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            });
        }

        match written {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EngineError::StdinWrite { source: e }),
            Err(e) => Err(EngineError::StdinWrite {
                source: std::io::Error::other(e),
            }),
        }
    }

    fn follow_output(&self, args: &[String]) -> Result<mpsc::Receiver<String>, EngineError> {
        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.not_found(e))?;

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }

        let args = args.to_vec();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::debug!(?args, %status, "followed command exited"),
                Err(e) => tracing::debug!(?args, error = %e, "failed to reap followed command"),
            }
        });

        Ok(rx)
    }

    fn exec_blocking(&self, args: &[String]) -> Result<String, EngineError> {
        tracing::debug!(program = %self.program, ?args, "engine command (blocking)");
        let output = std::process::Command::new(&self.program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.not_found(e))?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| EngineError::InvalidUtf8 { source: e })
        } else {
            Err(EngineError::CommandFailed {
                args: args.to_vec(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "output stream read failed");
                break;
            }
        }
    }
}
