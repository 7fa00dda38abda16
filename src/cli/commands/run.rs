//! Run command - bootstrap core and worker and hand over to the tool

use crate::cache::{CacheKey, DependencyCache};
use crate::config::{Properties, Settings};
use crate::error::BootResult;
use crate::orchestration::Orchestrator;
use tracing::{debug, info};

/// Execute a normal run and return the tool's exit code
pub async fn execute(settings: &Settings, args: Vec<String>) -> BootResult<i32> {
    settings.check_root()?;
    Properties::for_settings(settings).ensure(settings).await?;

    let builder = super::pod_builder(settings)?;
    let resolver = super::resolver(&builder, settings, false);
    let cache = DependencyCache::new(settings.cache_dir(), resolver.clone());
    let sets = cache.get_or_build(&CacheKey::from_settings(settings)).await?;
    resolver.close().await?;
    debug!(
        pod = sets.pod.len(),
        core = sets.core.len(),
        worker = sets.worker.len(),
        "Artifact sets ready"
    );

    // Siblings created from inside a pod start from the base pod artifacts
    let builder = builder.with_base(sets.pod.clone());
    let core = builder.spawn("core", None, sets.core);
    let worker = builder.spawn("worker", None, sets.worker);

    info!(version = %settings.boot_version, "Starting boot");
    let orchestrator = Orchestrator::new(settings.local_repo.clone());
    Ok(orchestrator.run(core, worker, args).await)
}
