//! `Transport` over the system OpenSSH client.
//!
//! One master connection is opened in [`SshTransport::connect`] and every
//! later command is multiplexed over it. The master survives an sshd restart,
//! so hardening can move the daemon to a new port mid-run.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, Transport};
use crate::domain::error::TransportError;
use crate::domain::shell::quote;
use crate::domain::target::SshTarget;
use crate::infra::command_runner::TokioCommandRunner;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const KEY_FILES: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

/// How the client proves its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshAuth {
    /// Keys held by the running `ssh-agent`.
    Agent,
    /// A private key file passed with `-i`.
    KeyFile(PathBuf),
}

/// Pick an authentication method: an agent with at least one key, then the
/// first default key file that exists.
///
/// # Errors
///
/// Returns [`TransportError::NoSshAuth`] when neither is available.
pub async fn discover_auth(runner: &impl CommandRunner, home: Option<&Path>) -> Result<SshAuth> {
    if std::env::var_os("SSH_AUTH_SOCK").is_some() {
        match runner.run_with_timeout("ssh-add", &["-l"], Duration::from_secs(5)).await {
            Ok(out) if out.status.success() => return Ok(SshAuth::Agent),
            Ok(_) => tracing::debug!("ssh-agent has no keys"),
            Err(e) => tracing::debug!(error = %e, "cannot query ssh-agent"),
        }
    }
    if let Some(home) = home {
        for name in KEY_FILES {
            let path = home.join(".ssh").join(name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(SshAuth::KeyFile(path));
            }
        }
    }
    Err(TransportError::NoSshAuth.into())
}

/// Runs commands on a remote target, through `sudo -n` for non-root logins.
pub struct SshTransport<R: CommandRunner = TokioCommandRunner> {
    target: SshTarget,
    auth: SshAuth,
    runner: R,
    control_dir: tempfile::TempDir,
    connected: AtomicBool,
}

impl SshTransport<TokioCommandRunner> {
    /// Discover credentials and open the master connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NoSshAuth`] or [`TransportError::Connect`].
    pub async fn open(target: SshTarget) -> Result<Self> {
        let runner = TokioCommandRunner::new();
        let auth = discover_auth(&runner, dirs::home_dir().as_deref()).await?;
        let transport = Self::new(target, auth, runner)?;
        transport.connect().await?;
        Ok(transport)
    }
}

impl<R: CommandRunner> SshTransport<R> {
    /// Build without connecting.
    ///
    /// # Errors
    ///
    /// Returns an error if the control socket directory cannot be created.
    pub fn new(target: SshTarget, auth: SshAuth, runner: R) -> Result<Self> {
        let control_dir = tempfile::Builder::new()
            .prefix("bunkr-ssh-")
            .tempdir()
            .context("cannot create ssh control directory")?;
        Ok(Self {
            target,
            auth,
            runner,
            control_dir,
            connected: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    fn control_path(&self) -> String {
        self.control_dir.path().join("%C").display().to_string()
    }

    /// Options and destination shared by every invocation.
    fn base_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-o",
            "BatchMode=yes",
            "-o",
            "StrictHostKeyChecking=accept-new",
            "-o",
            "ConnectTimeout=15",
            "-o",
            "ServerAliveInterval=15",
            "-o",
            "ControlMaster=auto",
            "-o",
            "ControlPersist=60",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        args.push("-o".to_string());
        args.push(format!("ControlPath={}", self.control_path()));
        args.push("-p".to_string());
        args.push(self.target.port.to_string());
        if let SshAuth::KeyFile(path) = &self.auth {
            args.push("-i".to_string());
            args.push(path.display().to_string());
            args.push("-o".to_string());
            args.push("IdentitiesOnly=yes".to_string());
        }
        args.push(format!("{}@{}", self.target.user, self.target.host));
        args
    }

    /// The command line the remote shell receives.
    fn remote_command(&self, command: &str) -> String {
        if self.target.is_root() {
            command.to_string()
        } else {
            format!("sudo -n sh -c {}", quote(command))
        }
    }

    /// Open the master connection and verify the login works.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] with the client's stderr.
    pub async fn connect(&self) -> Result<()> {
        let mut args = self.base_args();
        args.push(self.remote_command("true"));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self
            .runner
            .run_with_timeout("ssh", &argv, CONNECT_TIMEOUT)
            .await
            .map_err(|e| TransportError::Connect {
                target: self.target.to_string(),
                detail: format!("{e:#}"),
            })?;
        if !out.status.success() {
            return Err(TransportError::Connect {
                target: self.target.to_string(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        self.connected.store(true, Ordering::Relaxed);
        tracing::debug!(target: "bunkr::transport", host = %self.target, "ssh master connected");
        Ok(())
    }

    fn write_script(path: &str, mode: u32) -> String {
        let dir = match path.rsplit_once('/') {
            Some(("", _)) => "/",
            Some((dir, _)) => dir,
            None => ".",
        };
        let tmp = format!("{path}.bunkr-tmp");
        format!(
            "mkdir -p {dir} && cat > {tmp} && chmod {mode:o} {tmp} && mv -f {tmp} {path}",
            dir = quote(dir),
            tmp = quote(&tmp),
            path = quote(path),
        )
    }
}

impl<R: CommandRunner> Transport for SshTransport<R> {
    async fn exec(&self, command: &str) -> Result<Output> {
        tracing::debug!(target: "bunkr::transport", host = %self.target, command, "ssh exec");
        let mut args = self.base_args();
        args.push(self.remote_command(command));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run("ssh", &argv).await
    }

    async fn write_file(&self, path: &str, content: &[u8], mode: u32) -> Result<()> {
        tracing::debug!(target: "bunkr::transport", host = %self.target, path, "ssh write");
        let mut args = self.base_args();
        args.push(self.remote_command(&Self::write_script(path, mode)));
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.runner.run_with_stdin("ssh", &argv, content).await?;
        if out.status.success() {
            return Ok(());
        }
        Err(TransportError::WriteFile {
            path: path.to_string(),
            detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        }
        .into())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let out = self.exec(&format!("cat {}", quote(path))).await?;
        if out.status.success() {
            return Ok(out.stdout);
        }
        Err(TransportError::ReadFile {
            path: path.to_string(),
            detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        }
        .into())
    }
}

impl<R: CommandRunner> Drop for SshTransport<R> {
    fn drop(&mut self) {
        if !self.connected.load(Ordering::Relaxed) {
            return;
        }
        // Close the master before its socket directory is removed.
        let status = std::process::Command::new("ssh")
            .args(["-O", "exit", "-o"])
            .arg(format!("ControlPath={}", self.control_path()))
            .arg(format!("{}@{}", self.target.user, self.target.host))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        if let Err(e) = status {
            tracing::debug!(error = %e, "cannot stop ssh master");
        }
    }
}
