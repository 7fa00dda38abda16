//! Command-line interface of the per-version entry point

pub mod args;
pub mod commands;

pub use args::AppCli;

use crate::config::{keys, ConfigSnapshot, ConfigSources, Settings};
use crate::error::BootResult;
use crate::orchestration::EXIT_FAILURE;
use crate::ui;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Default log filter when `BOOT_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "boot=warn";

/// Install the stderr log subscriber; `BOOT_LOG` takes an `EnvFilter` directive
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(keys::LOG)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Run the entry point and return the process exit code
pub async fn run(cli: AppCli, sources: ConfigSources) -> i32 {
    match execute(cli, sources).await {
        Ok(code) => code,
        Err(e) => {
            ui::error(&e);
            EXIT_FAILURE
        }
    }
}

/// Dispatch on the parsed arguments
pub async fn execute(cli: AppCli, sources: ConfigSources) -> BootResult<i32> {
    let mut snapshot = ConfigSnapshot::load(&sources)?;
    let settings = Settings::resolve(&mut snapshot, env!("CARGO_PKG_VERSION"))?;
    debug!(home = %settings.home.display(), "Configuration loaded");

    if cli.version {
        return commands::version(&settings);
    }
    if cli.update {
        return commands::update(&settings).await;
    }
    commands::run(&settings, cli.args).await
}
