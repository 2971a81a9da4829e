//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warnings and skipped steps (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Progress steps (cyan)
    pub info: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Section headers
    pub header: Style,
    /// Final result lines (bold green)
    pub result: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold();
        self.result = Style::new().bold().green();
    }
}
