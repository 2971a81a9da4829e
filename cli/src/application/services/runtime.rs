//! Application service: the container runtime (`docker compose`) on the target.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{ProgressReporter, Transport};
use crate::application::services::hardening::wait_for_apt_lock;
use crate::application::services::wait::poll_until;
use crate::domain::poll::{PollPolicy, Timings};
use crate::domain::recipe::HealthCheck;
use crate::domain::shell::quote;

/// Parent directory of every app's files on the target.
pub const APPS_DIR: &str = "/opt/bunkr";

#[must_use]
pub fn app_dir(name: &str) -> String {
    format!("{APPS_DIR}/{name}")
}

#[must_use]
pub fn compose_path(name: &str) -> String {
    format!("{APPS_DIR}/{name}/docker-compose.yml")
}

#[must_use]
pub fn env_path(name: &str) -> String {
    format!("{APPS_DIR}/{name}/.env")
}

fn post_init_path(name: &str) -> String {
    format!("{APPS_DIR}/{name}/post-init.sh")
}

fn compose(name: &str, args: &str) -> String {
    format!("docker compose -f {} {args}", quote(&compose_path(name)))
}

/// Install Docker with the upstream convenience script unless present.
///
/// # Errors
///
/// Returns an error if the apt lock never clears or the install fails.
pub async fn ensure_docker(
    transport: &impl Transport,
    reporter: &impl ProgressReporter,
    timings: &Timings,
) -> Result<()> {
    if transport.check("docker --version").await? && transport.check("docker compose version").await? {
        return Ok(());
    }
    wait_for_apt_lock(transport, reporter, timings.apt_lock).await?;
    reporter.step("Installing Docker...");
    transport
        .run("curl -fsSL https://get.docker.com | sh")
        .await
        .context("failed to install Docker")?;
    Ok(())
}

/// Write the compose file (0644) and `.env` (0600) for `name`.
///
/// # Errors
///
/// Returns an error if either write fails.
pub async fn write_app_files(
    transport: &impl Transport,
    name: &str,
    compose_yaml: &str,
    env: &str,
) -> Result<()> {
    transport
        .write_file(&compose_path(name), compose_yaml.as_bytes(), 0o644)
        .await?;
    transport
        .write_file(&env_path(name), env.as_bytes(), 0o600)
        .await
}

/// Pull images and start the app's containers in the background.
///
/// # Errors
///
/// Returns the failed command's output.
pub async fn compose_up(transport: &impl Transport, name: &str) -> Result<()> {
    transport.run(&compose(name, "up -d")).await?;
    Ok(())
}

/// Stop and remove the app's containers, and its volumes when `purge`.
///
/// # Errors
///
/// Returns the failed command's output.
pub async fn compose_down(transport: &impl Transport, name: &str, purge: bool) -> Result<()> {
    let args = if purge { "down -v" } else { "down" };
    transport.run(&compose(name, args)).await?;
    Ok(())
}

/// # Errors
///
/// Returns the failed command's output.
pub async fn compose_pull(transport: &impl Transport, name: &str) -> Result<()> {
    transport.run(&compose(name, "pull")).await?;
    Ok(())
}

/// One container as listed by `docker compose ps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerStatus {
    pub name: String,
    /// `running`, `exited`, `restarting`, ...
    pub state: String,
}

/// Parse `docker compose ps --format '{{.Name}} {{.State}}'`.
#[must_use]
pub fn parse_ps(output: &str) -> Vec<ContainerStatus> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            Some(ContainerStatus {
                name: fields.next()?.to_string(),
                state: fields.next()?.to_string(),
            })
        })
        .collect()
}

/// # Errors
///
/// Returns the failed command's output.
pub async fn compose_ps(transport: &impl Transport, name: &str) -> Result<Vec<ContainerStatus>> {
    let out = transport
        .run(&compose(name, "ps --all --format '{{.Name}} {{.State}}'"))
        .await?;
    Ok(parse_ps(&out))
}

/// Run the recipe's one-shot init command in a throwaway primary container.
///
/// # Errors
///
/// Returns the failed command's output.
pub async fn run_init(transport: &impl Transport, name: &str, command: &str) -> Result<()> {
    transport
        .run(&compose(name, &format!("run --rm -T {} {command}", quote(name))))
        .await?;
    Ok(())
}

/// Run post-init lines as one `set -e` script inside a throwaway primary
/// container. The script is kept next to the compose file.
///
/// # Errors
///
/// Returns an error if the script cannot be written or exits non-zero.
pub async fn run_post_init(transport: &impl Transport, name: &str, lines: &[String]) -> Result<()> {
    let mut script = String::from("#!/bin/sh\nset -e\n");
    for line in lines {
        script.push_str(line);
        script.push('\n');
    }
    let path = post_init_path(name);
    transport
        .write_file(&path, script.as_bytes(), 0o700)
        .await?;
    let args = format!(
        "run --rm -T -v {}:/bunkr-post-init.sh:ro --entrypoint sh {} /bunkr-post-init.sh",
        quote(&path),
        quote(name)
    );
    transport.run(&compose(name, &args)).await?;
    Ok(())
}

/// Poll the recipe's health URL from the target until it answers.
///
/// # Errors
///
/// Returns a [`crate::domain::error::TimeoutError`] when the app never
/// answered within the check's timeout.
pub async fn health_check(
    transport: &impl Transport,
    check: &HealthCheck,
    container_port: u16,
    host_port: u16,
    timings: &Timings,
) -> Result<()> {
    let url = check.url_for(container_port, host_port);
    let probe = format!("curl -sf -o /dev/null --max-time 5 {}", quote(&url));
    let probe = probe.as_str();
    let policy = timings.paced(PollPolicy::new(
        check.attempts(),
        Duration::from_secs(check.interval),
    ));
    if poll_until(policy, || async move { transport.check(probe).await }).await? {
        Ok(())
    } else {
        Err(PollPolicy::new(check.attempts(), Duration::from_secs(check.interval))
            .timeout(&format!("{url} to respond"))
            .into())
    }
}
