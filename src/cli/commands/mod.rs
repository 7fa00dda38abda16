//! Per-version command implementations

pub mod run;
pub mod update;
pub mod version;

pub use run::execute as run;
pub use update::execute as update;
pub use version::execute as version;

use crate::config::settings::RESOLVER_ARTIFACT;
use crate::config::Settings;
use crate::error::{BootError, BootResult};
use crate::pod::{Namespace, PodBuilder, PodRegistry, ProcessRuntimeFactory, HOOK_FILE};
use crate::resolve::PodResolver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Builder for every pod of this invocation
///
/// The bootstrap namespace holds the running entry point itself; hook files
/// are looked up in the installation directory, then the working directory.
pub(crate) fn pod_builder(settings: &Settings) -> BootResult<Arc<PodBuilder>> {
    let exe = std::env::current_exe().map_err(|e| BootError::io("locating entry point", e))?;
    debug!(launcher = %settings.pod_launcher.display(), "Pod runtime");

    Ok(PodBuilder::new(
        PodRegistry::new(),
        Arc::new(ProcessRuntimeFactory::new(settings.pod_launcher.clone())),
        Namespace::root("app", vec![exe]),
        vec![
            settings.home.join(HOOK_FILE),
            settings.work_dir.join(HOOK_FILE),
        ],
    ))
}

/// Resolver backed by the `aether` pod of this version
pub(crate) fn resolver(
    builder: &Arc<PodBuilder>,
    settings: &Settings,
    update_always: bool,
) -> Arc<PodResolver> {
    Arc::new(
        PodResolver::new(
            Arc::clone(builder),
            resolver_artifact(settings),
            settings.local_repo.clone(),
        )
        .update_always(update_always),
    )
}

/// Resolver artifact beside the running entry point, else the installed copy
fn resolver_artifact(settings: &Settings) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(RESOLVER_ARTIFACT)))
        .filter(|beside| beside.is_file())
        .unwrap_or_else(|| settings.resolver_artifact())
}
