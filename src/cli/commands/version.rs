//! Version command - print the resolved version pins

use crate::config::{Properties, Settings};
use crate::error::BootResult;
use crate::orchestration::EXIT_OK;

/// Execute the version command
///
/// Touches nothing on disk and builds no pod.
pub fn execute(settings: &Settings) -> BootResult<i32> {
    print!("{}", Properties::render(settings));
    Ok(EXIT_OK)
}
