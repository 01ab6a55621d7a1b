use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{program} is not available on this system")]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    fn from_spawn(program: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            RunnerError::NotFound {
                program: program.to_string(),
            }
        } else {
            RunnerError::Io {
                program: program.to_string(),
                source: err,
            }
        }
    }
}

/// Captured result of a short-lived query or install command.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Result of a long-running invocation whose output was streamed line by
/// line into the log as it arrived.
#[derive(Debug, Clone)]
pub struct StreamedOutput {
    pub status: Option<i32>,
    pub cancelled: bool,
    pub lines: Vec<String>,
}

/// Single seam for spawning external tools. Probing, installing and
/// downloading all go through this so tests can substitute a scripted fake.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion and capture everything.
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput, RunnerError>;

    /// Run while forwarding output into the log, supporting ctrl-c
    /// cancellation. The child is killed on cancel; whatever it left on
    /// disk stays untouched.
    async fn run_streaming(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<StreamedOutput, RunnerError>;
}

/// The real implementation backed by `tokio::process`.
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput, RunnerError> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RunnerError::from_spawn(program, e))?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_streaming(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<StreamedOutput, RunnerError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::from_spawn(program, e))?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            let prog = program.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!("[{prog}] {line}");
                    let _ = tx.send(line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = tx.clone();
            let prog = program.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!("[{prog}] {line}");
                    let _ = tx.send(line);
                }
            });
        }
        drop(tx);

        let mut captured: Vec<String> = Vec::new();
        let mut cancelled = false;
        let mut exit: Option<std::process::ExitStatus> = None;

        tokio::select! {
            res = async {
                while let Some(line) = rx.recv().await {
                    captured.push(line);
                }
                child.wait().await
            } => {
                exit = Some(res.map_err(|e| RunnerError::Io {
                    program: program.to_string(),
                    source: e,
                })?);
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupt received, terminating {program}");
                let _ = child.kill().await;
                cancelled = true;
            }
        }

        // Pick up whatever the reader tasks managed to forward before a kill.
        while let Ok(line) = rx.try_recv() {
            captured.push(line);
        }

        Ok(StreamedOutput {
            status: exit.and_then(|s| s.code()),
            cancelled,
            lines: captured,
        })
    }
}
