//! Application service: the private mesh network (Tailscale) on the target.
//!
//! Private apps are exposed with `tailscale serve`, one HTTPS listener per
//! host port, so several private apps coexist on one node.

use std::cell::RefCell;

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, Transport};
use crate::application::services::wait::poll_until;
use crate::domain::mesh::{AUTH_LOG, MeshStatus, SERVE_DISABLED, find_login_url, parse_status};
use crate::domain::poll::Timings;
use crate::domain::state::MeshState;

/// URL a private app is reachable at from the tailnet.
#[must_use]
pub fn access_url(hostname: &str, port: u16) -> String {
    format!("https://{hostname}:{port}")
}

/// Install Tailscale with the upstream script unless present.
///
/// # Errors
///
/// Returns an error if the install script fails.
pub async fn ensure_installed(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
) -> Result<()> {
    if transport.check("which tailscale").await? {
        return Ok(());
    }
    reporter.step("Installing Tailscale...");
    transport
        .run("curl -fsSL https://tailscale.com/install.sh | sh")
        .await
        .context("failed to install Tailscale")?;
    Ok(())
}

/// Current node status. Any failure reads as "not connected".
pub async fn status(transport: &impl Transport) -> MeshStatus {
    match transport.exec("tailscale status --json 2>/dev/null || true").await {
        Ok(out) => parse_status(&String::from_utf8_lossy(&out.stdout)),
        Err(e) => {
            tracing::debug!(error = %e, "tailscale status failed");
            MeshStatus::default()
        }
    }
}

async fn clear_auth_log(transport: &impl Transport) {
    if let Err(e) = transport.exec(&format!("rm -f {AUTH_LOG}")).await {
        tracing::debug!(error = %e, "cannot remove tailscale auth log");
    }
}

/// Bring the node onto the tailnet, showing the login URL to the operator.
///
/// Returns the node's `MagicDNS` hostname.
///
/// # Errors
///
/// Returns a timeout when no login URL appears or the operator does not
/// authenticate in time.
pub async fn connect(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    timings: &Timings,
) -> Result<String> {
    transport
        .exec("pkill -f 'tailscale up' 2>/dev/null; sleep 1")
        .await?;
    clear_auth_log(transport).await;
    transport
        .run(&format!(
            "setsid tailscale up > {AUTH_LOG} 2>&1 < /dev/null &"
        ))
        .await
        .context("cannot start tailscale up")?;

    reporter.step("Waiting for Tailscale auth URL...");
    let login_url = RefCell::new(None);
    let login = &login_url;
    let read_log = format!("cat {AUTH_LOG} 2>/dev/null || true");
    let read_log = read_log.as_str();
    poll_until(timings.mesh_auth_url, || async move {
        let out = transport.exec(read_log).await?;
        if let Some(url) = find_login_url(&String::from_utf8_lossy(&out.stdout)) {
            *login.borrow_mut() = Some(url);
            return Ok(true);
        }
        Ok::<_, anyhow::Error>(status(transport).await.connected)
    })
    .await?;

    let login_url = login_url.into_inner();
    if let Some(url) = &login_url {
        reporter.step("Open this URL to authenticate Tailscale:");
        reporter.step(&format!("  {url}"));
        reporter.step("Waiting for authentication...");
    }

    let connected = status(transport).await.connected
        || (login_url.is_some()
            && poll_until(timings.mesh_auth, || async move {
                Ok::<_, anyhow::Error>(status(transport).await.connected)
            })
            .await?);
    clear_auth_log(transport).await;

    if !connected {
        let (policy, what) = if login_url.is_some() {
            (timings.mesh_auth, "Tailscale authentication")
        } else {
            (timings.mesh_auth_url, "the Tailscale auth URL")
        };
        return Err(policy.timeout(what).into());
    }

    let hostname = status(transport).await.hostname;
    anyhow::ensure!(
        !hostname.is_empty(),
        "Tailscale is connected but reported no MagicDNS name"
    );
    Ok(hostname)
}

/// Install, connect if needed, and record the node in `mesh`.
///
/// An existing hostname in `mesh` is reused when the node is already up.
///
/// # Errors
///
/// Returns an error if installation or connection fails.
pub async fn ensure_connected(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    mesh: &mut MeshState,
    timings: &Timings,
) -> Result<()> {
    ensure_installed(transport, reporter).await?;
    mesh.installed = true;

    let current = status(transport).await;
    if !current.connected {
        mesh.hostname = connect(transport, reporter, timings).await?;
    } else if mesh.hostname.is_empty() {
        anyhow::ensure!(
            !current.hostname.is_empty(),
            "Tailscale is connected but reported no MagicDNS name"
        );
        mesh.hostname = current.hostname;
    }
    mesh.connected = true;
    Ok(())
}

/// Serve `http://localhost:<port>` on `https://<node>:<port>`.
///
/// When the tailnet has Serve disabled, shows the enable URL and retries.
///
/// # Errors
///
/// Returns an error if serve fails for another reason or is not enabled in
/// time.
pub async fn serve(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    port: u16,
    timings: &Timings,
) -> Result<()> {
    let command = format!("tailscale serve --bg --https={port} http://localhost:{port} 2>&1");
    let command = command.as_str();
    let first = transport.exec(command).await?;
    if first.status.success() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&first.stdout).into_owned();
    anyhow::ensure!(
        text.contains(SERVE_DISABLED),
        "failed to configure tailscale serve: {}",
        text.trim()
    );

    reporter.step("Tailscale Serve is not enabled on your tailnet.");
    if let Some(url) = find_login_url(&text) {
        reporter.step("Open this URL to enable it:");
        reporter.step(&format!("  {url}"));
    }
    reporter.step("Waiting for Serve to be enabled...");

    let enabled = poll_until(timings.serve_enable, || async move {
        let out = transport.exec(command).await?;
        if out.status.success() {
            return Ok(true);
        }
        let text = String::from_utf8_lossy(&out.stdout);
        anyhow::ensure!(
            text.contains(SERVE_DISABLED),
            "failed to configure tailscale serve: {}",
            text.trim()
        );
        Ok(false)
    })
    .await?;
    if enabled {
        Ok(())
    } else {
        Err(timings.serve_enable.timeout("Tailscale Serve to be enabled").into())
    }
}

/// Stop serving `port` on the tailnet.
///
/// # Errors
///
/// Returns the failed command's output.
pub async fn remove_serve(transport: &impl Transport, port: u16) -> Result<()> {
    transport
        .run(&format!("tailscale serve --https={port} off"))
        .await
        .context("failed to remove tailscale serve")?;
    Ok(())
}
