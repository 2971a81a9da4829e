//! The transport a command runs against: this machine or an SSH target.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::Transport;
use crate::domain::target::SshTarget;
use crate::infra::local::LocalTransport;
use crate::infra::ssh::SshTransport;

pub enum HostTransport {
    Local(LocalTransport),
    Ssh(SshTransport),
}

impl HostTransport {
    /// Connect to `target`, or use the local machine when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if SSH authentication or the connection fails.
    pub async fn open(target: Option<&SshTarget>) -> Result<Self> {
        match target {
            Some(t) => Ok(Self::Ssh(SshTransport::open(t.clone()).await?)),
            None => Ok(Self::Local(LocalTransport::new())),
        }
    }

    /// Host name to show the operator in login hints.
    #[must_use]
    pub fn display_host(&self) -> String {
        match self {
            Self::Local(_) => "<this-server>".to_string(),
            Self::Ssh(ssh) => ssh.target().host.clone(),
        }
    }
}

impl Transport for HostTransport {
    async fn exec(&self, command: &str) -> Result<Output> {
        match self {
            Self::Local(t) => t.exec(command).await,
            Self::Ssh(t) => t.exec(command).await,
        }
    }

    async fn write_file(&self, path: &str, content: &[u8], mode: u32) -> Result<()> {
        match self {
            Self::Local(t) => t.write_file(path, content, mode).await,
            Self::Ssh(t) => t.write_file(path, content, mode).await,
        }
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        match self {
            Self::Local(t) => t.read_file(path).await,
            Self::Ssh(t) => t.read_file(path).await,
        }
    }
}
