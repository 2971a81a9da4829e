//! Human-readable terminal renderer.

use crate::application::services::install::InstallReport;
use crate::application::services::status::StatusReport;
use crate::application::services::update::UpdateOutcome;
use crate::domain::recipe::IndexEntry;
use crate::output::OutputContext;

/// Renders command results as terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_version(&self, version: &str) {
        if !self.ctx.quiet {
            println!("bunkr {version}");
        }
    }

    /// Render the published recipe index as a table.
    pub fn render_list(&self, entries: &[IndexEntry]) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.header("Available recipes");
        println!();
        println!("{}", list_row("NAME", "VERSION", "DESCRIPTION"));
        println!("{}", list_row("----", "-------", "-----------"));
        for entry in entries {
            println!(
                "{}",
                list_row(&entry.name, &entry.version, &entry.description)
            );
        }
        println!();
    }

    /// Render installed apps, hardening and Tailscale summary.
    pub fn render_status(&self, report: &StatusReport) {
        if self.ctx.quiet {
            return;
        }
        if report.apps.is_empty() {
            self.ctx.info("No apps installed");
        } else {
            self.ctx.header("Installed apps");
            println!();
            println!(
                "{}",
                status_row("NAME", "VERSION", "DOMAIN", "PORT", "STATUS")
            );
            println!(
                "{}",
                status_row("----", "-------", "------", "----", "------")
            );
            for app in &report.apps {
                let domain = if app.recipe.private {
                    "(private)"
                } else {
                    app.recipe.domain.as_str()
                };
                println!(
                    "{}",
                    status_row(
                        &app.name,
                        &app.recipe.version,
                        domain,
                        &app.recipe.port.to_string(),
                        app.summary(),
                    )
                );
            }
            println!();
        }

        if report.hardening.applied {
            self.ctx.success(&format!(
                "Server hardened (SSH port: {})",
                report.hardening.ssh_port
            ));
        } else {
            self.ctx.warn("Server not hardened. Run: bunkr init");
        }
        if report.tailscale.connected && !report.tailscale.hostname.is_empty() {
            self.ctx.kv("Tailscale:", &report.tailscale.hostname);
        }
    }

    pub fn render_install(&self, report: &InstallReport) {
        for app in &report.apps {
            self.ctx
                .result(&format!("{} is running at {}", app.name, app.url));
        }
    }

    pub fn render_update(&self, name: &str, outcome: &UpdateOutcome) {
        if let UpdateOutcome::Updated { to, .. } = outcome {
            self.ctx.result(&format!("{name} updated to {to}"));
        }
    }

    pub fn render_uninstall(&self, name: &str) {
        self.ctx.result(&format!("{name} has been uninstalled"));
    }

    pub fn render_init(&self) {
        self.ctx.result("Server hardened successfully!");
    }
}

/// Format one row of the `list` table.
#[must_use]
pub fn list_row(name: &str, version: &str, description: &str) -> String {
    format!("  {name:<20} {version:<10} {description}")
}

/// Format one row of the `status` table.
#[must_use]
pub fn status_row(name: &str, version: &str, domain: &str, port: &str, status: &str) -> String {
    format!("  {name:<20} {version:<10} {domain:<30} {port:<10} {status}")
}
