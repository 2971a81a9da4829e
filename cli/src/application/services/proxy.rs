//! Application service: the public reverse proxy (Caddy) on the target.

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, Transport};
use crate::application::services::hardening::wait_for_apt_lock;
use crate::domain::poll::Timings;
use crate::domain::proxy::{CADDYFILE_PATH, add_block, ensure_header, remove_block};

const INSTALL_COMMANDS: [&str; 5] = [
    "apt-get install -y -qq debian-keyring debian-archive-keyring apt-transport-https curl gnupg",
    "curl -1sLf 'https://dl.cloudsmith.io/public/caddy/stable/gpg.key' | gpg --yes --dearmor -o /usr/share/keyrings/caddy-stable-archive-keyring.gpg",
    "curl -1sLf 'https://dl.cloudsmith.io/public/caddy/stable/debian.deb.txt' > /etc/apt/sources.list.d/caddy-stable.list",
    "apt-get update -qq",
    "apt-get install -y -qq caddy",
];

/// Install Caddy from its upstream apt repository unless present.
///
/// # Errors
///
/// Returns an error if the apt lock never clears or an install command fails.
pub async fn ensure_installed(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    timings: &Timings,
) -> Result<()> {
    if transport.check("which caddy").await? {
        return Ok(());
    }
    wait_for_apt_lock(transport, reporter, timings.apt_lock).await?;
    reporter.step("Installing Caddy...");
    for command in INSTALL_COMMANDS {
        transport
            .run(&format!("DEBIAN_FRONTEND=noninteractive {command}"))
            .await
            .context("failed to install Caddy")?;
    }
    Ok(())
}

async fn read_caddyfile(transport: &impl Transport) -> Result<Option<String>> {
    if !transport.check(&format!("test -f {CADDYFILE_PATH}")).await? {
        return Ok(None);
    }
    let bytes = transport.read_file(CADDYFILE_PATH).await?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Add (or replace) the site block routing `domain` to `localhost:<port>`.
///
/// A Caddyfile bunkr has not managed before is replaced by the managed header
/// first. Caddy is not reloaded here.
///
/// # Errors
///
/// Returns an error if the Caddyfile cannot be read or written.
pub async fn add_site(transport: &impl Transport, name: &str, domain: &str, port: u16) -> Result<()> {
    let existing = read_caddyfile(transport).await?;
    let base = ensure_header(existing.as_deref())
        .or(existing)
        .unwrap_or_default();
    let updated = add_block(&base, name, domain, port);
    transport
        .write_file(CADDYFILE_PATH, updated.as_bytes(), 0o644)
        .await
        .context("cannot write Caddyfile")
}

/// Drop the site block for `name`. A missing Caddyfile is left alone.
///
/// # Errors
///
/// Returns an error if the Caddyfile cannot be read or written.
pub async fn remove_site(transport: &impl Transport, name: &str) -> Result<()> {
    let Some(existing) = read_caddyfile(transport).await? else {
        return Ok(());
    };
    let updated = remove_block(&existing, name);
    if updated == existing {
        return Ok(());
    }
    transport
        .write_file(CADDYFILE_PATH, updated.as_bytes(), 0o644)
        .await
        .context("cannot write Caddyfile")
}

/// # Errors
///
/// Returns the failed command's output.
pub async fn reload(transport: &impl Transport) -> Result<()> {
    transport
        .run("systemctl reload caddy")
        .await
        .context("failed to reload Caddy")?;
    Ok(())
}
