//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` runs local processes with tokio. When a timeout is
//! set, `tokio::select!` kills the child explicitly so it is never left
//! running after the future is dropped.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;

use crate::application::ports::CommandRunner;

/// Production `CommandRunner`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner {
    /// `None` lets commands run as long as they need.
    timeout: Option<Duration>,
}

impl TokioCommandRunner {
    /// A runner without a default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that kills every `run`/`run_with_stdin` child after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    fn spawn(program: &str, args: &[&str], stdin: bool) -> Result<Child> {
        tokio::process::Command::new(program)
            .args(args)
            .stdin(if stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "cannot read child output");
        }
    }
    buf
}

async fn collect(child: &mut Child, program: &str) -> Result<Output> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (status, stdout, stderr) = tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
    Ok(Output {
        status: status.with_context(|| format!("waiting for {program}"))?,
        stdout,
        stderr,
    })
}

async fn finish(mut child: Child, program: &str, timeout: Option<Duration>) -> Result<Output> {
    let Some(limit) = timeout else {
        return collect(&mut child, program).await;
    };
    tokio::select! {
        result = collect(&mut child, program) => result,
        () = tokio::time::sleep(limit) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(program, error = %e, "cannot kill timed out process");
            }
            anyhow::bail!("{program} timed out after {}s", limit.as_secs())
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        let child = Self::spawn(program, args, false)?;
        finish(child, program, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let child = Self::spawn(program, args, false)?;
        finish(child, program, Some(timeout)).await
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        let mut child = Self::spawn(program, args, true)?;
        if let Some(mut stdin) = child.stdin.take() {
            let input = input.to_vec();
            // Dropping the handle at the end of the task closes the pipe.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!(error = %e, "cannot write child stdin");
                }
            });
        }
        finish(child, program, self.timeout).await
    }
}
