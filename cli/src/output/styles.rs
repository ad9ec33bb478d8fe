//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Step arrows (cyan)
    pub step: Style,
    /// Dimmed/secondary text, also used for forwarded deploy output
    pub dim: Style,
    /// Headers/section titles
    pub header: Style,
    /// The slot taking traffic
    pub live: Style,
    /// The slot waiting for the next deploy
    pub idle: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.step = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
        self.live = Style::new().bold().green();
        self.idle = Style::new().blue();
    }
}
