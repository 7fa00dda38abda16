//! Operator-facing output
//!
//! Everything printed for a human goes through here and lands on stderr, so
//! stdout stays reserved for machine-readable output such as `--version`.
//! Styling and progress bars are only used on an interactive terminal.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{boot_failed, error, notice, warn_hint};
pub use progress::DownloadProgress;
