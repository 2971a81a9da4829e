//! Application service: the hardening engine.
//!
//! Interprets the step table from `domain::hardening` against a transport.
//! Steps recorded in state are skipped outright; steps whose check passes are
//! recorded without applying; the first failed apply halts the run.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::application::ports::{ProgressReporter, Transport};
use crate::application::services::state_store::save_state;
use crate::application::services::wait::poll_until;
use crate::domain::error::StepFailure;
use crate::domain::hardening::{
    APT_LOCK_CONF, APT_LOCK_CONF_PATH, APT_LOCK_HELD, Action, Apply, HardeningConfig,
    SshDaemonPlan, Step, steps,
};
use crate::domain::poll::{PollPolicy, Timings};
use crate::domain::state::State;

/// State key of the step that moves the SSH port.
const SSH_STEP: &str = "ssh_hardening";

/// What a hardening run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HardeningOutcome {
    /// Steps applied in this run.
    pub applied: Vec<&'static str>,
    /// Steps found already in place, from state or by check.
    pub skipped: Vec<&'static str>,
}

impl HardeningOutcome {
    /// Whether this run changed anything on the target.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Make apt itself wait for the dpkg lock during installs. Best effort.
pub async fn configure_apt_lock_wait(transport: &impl Transport) {
    if let Err(e) = transport
        .write_file(APT_LOCK_CONF_PATH, APT_LOCK_CONF.as_bytes(), 0o644)
        .await
    {
        tracing::debug!(error = %e, "cannot write apt lock timeout config");
    }
}

/// Wait until no other process holds the dpkg frontend lock.
///
/// # Errors
///
/// Returns a [`crate::domain::error::TimeoutError`] when the lock is still
/// held after `policy` runs out.
pub async fn wait_for_apt_lock(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    policy: PollPolicy,
) -> Result<()> {
    if !transport.check(APT_LOCK_HELD).await? {
        return Ok(());
    }
    reporter.step("Waiting for package manager to finish...");
    let released = poll_until(policy, || async move {
        Ok::<_, anyhow::Error>(!transport.check(APT_LOCK_HELD).await?)
    })
    .await?;
    if released {
        Ok(())
    } else {
        Err(policy.timeout("the package manager lock").into())
    }
}

/// Run every hardening step in order, recording progress in `state`.
///
/// On success `state.hardening.applied` is set. `applied_at` is stamped only
/// by the run that first completes hardening, and `ssh_port` changes only when
/// this run applied or found the SSH step, so a repeated run leaves `state`
/// untouched. On failure the steps completed so far stay recorded and the
/// caller should still persist `state`.
///
/// # Errors
///
/// Returns a [`StepFailure`] for the first step whose apply fails, or a
/// timeout while waiting for the package manager.
pub async fn run_hardening(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    state: &mut State,
    config: &HardeningConfig,
    timings: &Timings,
) -> Result<HardeningOutcome> {
    let mut outcome = HardeningOutcome::default();
    let mut lock_cleared = false;
    let mut ssh_touched = false;

    for step in steps(config) {
        if state.step_done(step.name) {
            reporter.skip(&format!("{} (already configured)", step.label));
            outcome.skipped.push(step.name);
            continue;
        }

        if matches!(transport.check(&step.check).await, Ok(true)) {
            reporter.skip(&format!("{} (already configured)", step.label));
            state.mark_step_done(step.name);
            outcome.skipped.push(step.name);
            ssh_touched |= step.name == SSH_STEP;
            continue;
        }

        if !lock_cleared {
            wait_for_apt_lock(transport, reporter, timings.apt_lock).await?;
            lock_cleared = true;
        }

        if let Err(e) = apply_step(transport, &step, timings).await {
            let detail = format!("{e:#}");
            reporter.error(&format!("{} failed: {detail}", step.label));
            return Err(StepFailure {
                step: step.name.to_string(),
                label: step.label.to_string(),
                detail,
            }
            .into());
        }
        reporter.success(step.label);
        state.mark_step_done(step.name);
        outcome.applied.push(step.name);
        ssh_touched |= step.name == SSH_STEP;
    }

    let hardening = &mut state.hardening;
    if !hardening.applied || hardening.applied_at.is_none() {
        hardening.applied_at = Some(Utc::now());
    }
    hardening.applied = true;
    if ssh_touched || hardening.ssh_port == 0 {
        hardening.ssh_port = config.ssh_port;
    }
    Ok(outcome)
}

/// One full hardening pass as run by `init` and by `install` on a fresh
/// target, followed by the access summary when anything changed.
///
/// The caller persists `state` on success. On failure the completed steps
/// are persisted here before the error is returned.
///
/// # Errors
///
/// Returns the hardening failure.
pub async fn harden(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    state: &mut State,
    config: &HardeningConfig,
    host: &str,
    timings: &Timings,
) -> Result<HardeningOutcome> {
    reporter.header("Hardening server...");
    configure_apt_lock_wait(transport).await;
    match run_hardening(transport, reporter, state, config, timings).await {
        Ok(outcome) => {
            reporter.success("Server hardened");
            if outcome.changed() {
                report_access_change(
                    reporter,
                    host,
                    &config.admin_user,
                    state.hardening.ssh_port,
                );
            }
            Ok(outcome)
        }
        Err(e) => {
            if let Err(save) = save_state(transport, state).await {
                tracing::warn!(error = %save, "cannot persist partial hardening progress");
            }
            Err(e)
        }
    }
}

/// Tell the operator how to log in now that root login and port 22 are gone.
pub fn report_access_change(reporter: &impl ProgressReporter, host: &str, user: &str, port: u16) {
    reporter.header("SSH access has changed");
    reporter.step("Root login and password authentication are now disabled.");
    reporter.step(&format!("Connect as {user} on port {port}:"));
    reporter.step(&format!("  ssh -p {port} {user}@{host}"));
    reporter.step(&format!("  bunkr --on {user}@{host}:{port} status"));
}

async fn apply_step(transport: &impl Transport, step: &Step, timings: &Timings) -> Result<()> {
    match &step.apply {
        Apply::Actions(actions) => run_actions(transport, actions).await,
        Apply::SshDaemon(plan) => apply_ssh_daemon(transport, plan, timings.ssh_listen).await,
    }
}

async fn run_actions(transport: &impl Transport, actions: &[Action]) -> Result<()> {
    for action in actions {
        match action {
            Action::Run(command) => {
                transport.run(command).await?;
            }
            Action::Write {
                path,
                content,
                mode,
            } => transport.write_file(path, content.as_bytes(), *mode).await?,
        }
    }
    Ok(())
}

/// Reconfigure sshd. Any failure after the edits puts the backup back; a
/// failure after the restart also restarts the daemon on the old config.
async fn apply_ssh_daemon(
    transport: &impl Transport,
    plan: &SshDaemonPlan,
    listen: PollPolicy,
) -> Result<()> {
    transport
        .run(&plan.backup_command())
        .await
        .context("cannot back up sshd_config")?;

    for edit in &plan.edits {
        if let Err(e) = transport.run(edit).await {
            rollback(transport, plan, false).await;
            return Err(e.context("cannot edit sshd_config, restored backup"));
        }
    }

    if let Err(e) = transport.run(plan.validate_command()).await {
        rollback(transport, plan, false).await;
        return Err(e.context("invalid SSH config, restored backup"));
    }

    if transport.check(plan.socket_active_command()).await? {
        tracing::debug!("ssh.socket is active, switching to ssh.service");
        if let Err(e) = transport.run(plan.disable_socket_command()).await {
            rollback(transport, plan, false).await;
            return Err(e.context("cannot disable ssh.socket, restored backup"));
        }
    }

    if let Err(e) = transport.run(plan.restart_command()).await {
        rollback(transport, plan, true).await;
        return Err(e.context("cannot restart SSH, restored backup"));
    }

    let probe = plan.listening_command();
    let probe = probe.as_str();
    let listening = poll_until(listen, || async move { transport.check(probe).await }).await?;
    if !listening {
        rollback(transport, plan, true).await;
        anyhow::bail!(
            "SSH not listening on port {} after restart, restored backup",
            plan.port
        );
    }
    Ok(())
}

async fn rollback(transport: &impl Transport, plan: &SshDaemonPlan, restart: bool) {
    if let Err(e) = transport.run(&plan.restore_command()).await {
        tracing::warn!(error = %e, "cannot restore sshd_config backup");
    }
    if restart {
        if let Err(e) = transport.run(plan.restart_command()).await {
            tracing::warn!(error = %e, "cannot restart SSH after restoring backup");
        }
    }
}
