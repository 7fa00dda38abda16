//! Messages for the operator

use crate::error::BootError;
use console::style;
use std::error::Error as _;

/// Report a fatal error, with its hint when one exists
pub fn error(err: &BootError) {
    eprintln!("{} {}", style("Error:").red().bold(), err);
    print_causes(err);
    if let Some(hint) = err.hint() {
        eprintln!("{} {}", style("Hint:").yellow(), hint);
    }
}

/// Report a failure of the tool's startup or main entry point
pub fn boot_failed(err: &BootError) {
    eprintln!("{}", style("Boot failed to start:").red().bold());
    eprintln!("  {}", err);
    print_causes(err);
    if let Some(hint) = err.hint() {
        eprintln!("{} {}", style("Hint:").yellow(), hint);
    }
}

/// Informational notice
pub fn notice(message: &str) {
    eprintln!("{}", style(message).cyan());
}

/// Recoverable problem with a suggestion
pub fn warn_hint(message: &str, hint: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), message);
    eprintln!("{} {}", style("Hint:").yellow(), style(hint).dim());
}

fn print_causes(err: &BootError) {
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  {} {}", style("caused by:").dim(), cause);
        source = cause.source();
    }
}
