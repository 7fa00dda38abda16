//! Self-installing version loader
//!
//! Picks the version of the tool to run, installs it when missing, and hands
//! the (possibly rewritten) arguments to that version's entry point.
//!
//! Version selection:
//! 1. `BOOT_VERSION` set and installed: run it
//! 2. `BOOT_VERSION` set but missing: download it, then run it
//! 3. unset: run the highest installed version
//! 4. nothing installed: first run, install the initial version and run it
//!    with `-u` so it updates itself
//!
//! A version counts as installed only when its directory holds both the
//! entry point and the resolver artifact; anything less is installed again.

pub mod release;

use crate::config::settings::bin_dir;
use crate::config::{keys, ConfigSnapshot, ConfigSources};
use crate::error::{BootError, BootResult};
use crate::ui::{self, UiContext};
use crate::version;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub use release::{install, is_complete, launch_artifact, release_tag};

/// Version installed on first run
pub const INITIAL_VERSION: &str = "2.8.3";

/// Arguments forwarded on first run instead of the operator's
pub const FIRST_RUN_ARGS: &[&str] = &["-u"];

/// Notice printed when nothing is installed yet
pub const FIRST_RUN_NOTICE: &str = "Running for the first time: updating to latest version.";

/// What the loader has to do before launching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Launch an installed version
    Installed { version: String, artifact: PathBuf },
    /// Download the requested version first
    Install { version: String },
    /// Nothing installed and nothing requested
    FirstRun,
}

/// Decide what to launch given the configured version, if any
pub fn plan(bin_dir: &Path, configured: Option<&str>) -> Plan {
    match configured {
        Some(version) => match installed_artifact(bin_dir, version) {
            Some(artifact) => Plan::Installed {
                version: version.to_string(),
                artifact,
            },
            None => Plan::Install {
                version: version.to_string(),
            },
        },
        None => match latest_installed(bin_dir) {
            Some(version) => Plan::Installed {
                artifact: bin_dir.join(&version).join(launch_artifact()),
                version,
            },
            None => Plan::FirstRun,
        },
    }
}

/// Entry point of `version`, if completely installed under its release tag
pub fn installed_artifact(bin_dir: &Path, version: &str) -> Option<PathBuf> {
    let dir = bin_dir.join(release_tag(version));
    is_complete(&dir).then(|| dir.join(launch_artifact()))
}

/// Highest completely installed version
pub fn latest_installed(bin_dir: &Path) -> Option<String> {
    let entries = fs::read_dir(bin_dir).ok()?;
    let names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| is_complete(&e.path()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    version::latest(names.iter().map(String::as_str)).map(str::to_string)
}

/// Run the loader and return the exit code of the launched version
pub fn run(args: Vec<OsString>) -> i32 {
    match run_inner(args) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&e);
            crate::orchestration::EXIT_FAILURE
        }
    }
}

fn run_inner(args: Vec<OsString>) -> BootResult<i32> {
    let sources = ConfigSources::from_process()?;
    let snapshot = ConfigSnapshot::load(&sources)?;
    let bin = bin_dir(snapshot.home());
    let ui = UiContext::detect();

    let configured = snapshot.get(keys::VERSION).filter(|v| !v.is_empty());
    let (version, artifact, args) = match plan(&bin, configured) {
        Plan::Installed { version, artifact } => (version, artifact, args),
        Plan::Install { version } => {
            let dir = install(&ui, &bin, &version)?;
            let artifact = bin.join(dir).join(launch_artifact());
            (version, artifact, args)
        }
        Plan::FirstRun => {
            let dir = install(&ui, &bin, INITIAL_VERSION)?;
            ui::notice(FIRST_RUN_NOTICE);
            let artifact = bin.join(dir).join(launch_artifact());
            let args = FIRST_RUN_ARGS.iter().map(OsString::from).collect();
            (INITIAL_VERSION.to_string(), artifact, args)
        }
    };

    info!(version = %version, "Launching {}", artifact.display());
    launch(&artifact, &version, &args)
}

/// Start `artifact` with `BOOT_VERSION` pinned to `version`
///
/// On Unix the loader process is replaced and this only returns on failure.
pub fn launch(artifact: &Path, version: &str, args: &[OsString]) -> BootResult<i32> {
    let mut command = Command::new(artifact);
    command.args(args).env(keys::VERSION, version);
    debug!(?args, "Starting {}", artifact.display());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = command.exec();
        Err(BootError::command_failed(artifact.display().to_string(), err))
    }

    #[cfg(not(unix))]
    {
        let status = command
            .status()
            .map_err(|e| BootError::command_failed(artifact.display().to_string(), e))?;
        status.code().ok_or(BootError::ProcessSignaled)
    }
}
