//! Output configuration and formatting

mod formatter;

pub use formatter::Formatter;

/// Output behavior shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit strict JSON instead of human-readable text
    pub json: bool,
    /// Suppress non-error output
    pub quiet: bool,
    /// Disable ANSI styling
    pub no_color: bool,
}
