//! Bounded client-side waits.

use std::time::Duration;

use crate::domain::error::TimeoutError;

/// `attempts` probes spaced `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Same attempt count with no sleeping, for tests.
    #[must_use]
    pub const fn immediate(self) -> Self {
        Self {
            attempts: self.attempts,
            interval: Duration::ZERO,
        }
    }

    /// Total wall time the policy allows, in whole seconds.
    #[must_use]
    pub fn budget_secs(&self) -> u64 {
        (self.interval * self.attempts).as_secs()
    }

    /// The error to report when every attempt failed.
    #[must_use]
    pub fn timeout(&self, what: &str) -> TimeoutError {
        TimeoutError {
            what: what.to_string(),
            waited_secs: self.budget_secs(),
        }
    }
}

/// Named wait budgets used by the provisioning services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub apt_lock: PollPolicy,
    pub ssh_listen: PollPolicy,
    pub mesh_auth_url: PollPolicy,
    pub mesh_auth: PollPolicy,
    pub serve_enable: PollPolicy,
    /// When false every policy, including ones built from recipes, skips sleeping.
    pub realtime: bool,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            apt_lock: PollPolicy::new(60, Duration::from_secs(2)),
            ssh_listen: PollPolicy::new(5, Duration::from_secs(1)),
            mesh_auth_url: PollPolicy::new(30, Duration::from_secs(1)),
            mesh_auth: PollPolicy::new(150, Duration::from_secs(2)),
            serve_enable: PollPolicy::new(60, Duration::from_secs(2)),
            realtime: true,
        }
    }
}

impl Timings {
    /// Default attempt counts without sleeping.
    #[must_use]
    pub fn immediate() -> Self {
        let d = Self::default();
        Self {
            apt_lock: d.apt_lock.immediate(),
            ssh_listen: d.ssh_listen.immediate(),
            mesh_auth_url: d.mesh_auth_url.immediate(),
            mesh_auth: d.mesh_auth.immediate(),
            serve_enable: d.serve_enable.immediate(),
            realtime: false,
        }
    }

    /// Apply the pacing of these timings to an ad-hoc policy.
    #[must_use]
    pub fn paced(&self, policy: PollPolicy) -> PollPolicy {
        if self.realtime {
            policy
        } else {
            policy.immediate()
        }
    }
}
