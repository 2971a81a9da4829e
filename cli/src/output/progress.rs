//! Progress indicators using indicatif

#![allow(clippy::expect_used)] // Templates are compile-time constants

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::output::OutputContext;

/// Create a spinner for indeterminate progress.
///
/// Hidden when stdout is not a terminal or output is quiet.
///
/// # Panics
///
/// Panics if the spinner template string is invalid (it is a compile-time constant and will not panic).
#[must_use]
pub fn spinner(ctx: &OutputContext, msg: &str) -> ProgressBar {
    if !ctx.show_progress() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"])
            .template("  {spinner:.cyan} {msg}")
            .expect("valid template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Run `fut` behind a spinner, clearing it when the future settles.
pub async fn with_spinner<F: std::future::Future>(
    ctx: &OutputContext,
    msg: &str,
    fut: F,
) -> F::Output {
    let pb = spinner(ctx, msg);
    let out = fut.await;
    pb.finish_and_clear();
    out
}
