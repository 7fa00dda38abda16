//! Boot - per-version entry point
//!
//! Launched by the loader with `BOOT_VERSION` pinned to this artifact's
//! version.

use boot::cli::AppCli;
use boot::config::ConfigSources;
use boot::orchestration::EXIT_FAILURE;
use boot::ui;
use clap::Parser;

fn main() {
    let cli = AppCli::parse();
    boot::cli::init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("boot-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            ui::error(&boot::BootError::io("starting async runtime", e));
            std::process::exit(EXIT_FAILURE);
        }
    };

    let code = runtime.block_on(async {
        match ConfigSources::from_process() {
            Ok(sources) => boot::cli::run(cli, sources).await,
            Err(e) => {
                ui::error(&e);
                EXIT_FAILURE
            }
        }
    });

    // Stop accepting work; in-flight tasks are not waited for
    runtime.shutdown_background();
    std::process::exit(code);
}
