//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::ProgressReporter`
//! trait so application services can emit progress events without depending on
//! any presentation type directly.

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// Every event except `error()` is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn header(&self, message: &str) {
        self.ctx.header(message);
    }

    fn step(&self, message: &str) {
        self.ctx.info(message);
    }

    fn success(&self, message: &str) {
        self.ctx.success(message);
    }

    fn skip(&self, message: &str) {
        self.ctx.skip(message);
    }

    fn warn(&self, message: &str) {
        self.ctx.warn(message);
    }

    fn error(&self, message: &str) {
        self.ctx.error(message);
    }
}
