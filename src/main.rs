//! Boot loader
//!
//! Front controller that selects, installs and launches a version of boot.

use std::process::ExitCode;

fn main() -> ExitCode {
    boot::cli::init_tracing();

    let args = std::env::args_os().skip(1).collect();
    let code = boot::loader::run(args);

    // Exit codes outside 0..=255 wrap the same way `process::exit` does
    ExitCode::from(code as u8)
}
