//! Remote target addresses given with `--on`.

use std::fmt;

use crate::domain::error::TransportError;

pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;

/// `[user@]host[:port]`, with `[v6addr]` accepted for IPv6 hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl SshTarget {
    /// Parse a target string.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidTarget`] for an empty user or host,
    /// or a port that is not a number in 1..=65535.
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let invalid = || TransportError::InvalidTarget(raw.to_string());
        let trimmed = raw.trim();

        let (user, rest) = match trimmed.rsplit_once('@') {
            Some((u, r)) => (u, r),
            None => (DEFAULT_SSH_USER, trimmed),
        };

        let (host, port) = if let Some(v6) = rest.strip_prefix('[') {
            let (host, after) = v6.split_once(']').ok_or_else(invalid)?;
            match after.strip_prefix(':') {
                Some(p) => (host, Some(p)),
                None if after.is_empty() => (host, None),
                None => return Err(invalid()),
            }
        } else {
            match rest.split_once(':') {
                Some((h, p)) => (h, Some(p)),
                None => (rest, None),
            }
        };

        let port = match port {
            Some(p) => p.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(invalid)?,
            None => DEFAULT_SSH_PORT,
        };

        if user.is_empty() || host.is_empty() || host.contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            user: user.to_string(),
            host: host.to_string(),
            port,
        })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.user == "root"
    }

    /// Same host reached as another user on another port.
    #[must_use]
    pub fn with_login(&self, user: &str, port: u16) -> Self {
        Self {
            user: user.to_string(),
            host: self.host.clone(),
            port,
        }
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}@[{}]", self.user, self.host)?;
        } else {
            write!(f, "{}@{}", self.user, self.host)?;
        }
        if self.port != DEFAULT_SSH_PORT {
            write!(f, ":{}", self.port)?;
        }
        Ok(())
    }
}
