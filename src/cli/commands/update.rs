//! Update command - re-pin versions and refresh the dependency cache

use crate::cache::{CacheKey, DependencyCache};
use crate::config::{Properties, Settings};
use crate::error::BootResult;
use crate::orchestration::EXIT_OK;
use crate::ui;
use tracing::{info, warn};

/// Execute the update command
///
/// The properties file is pinned to this artifact's version. The cache entry
/// is rebuilt with forced remote updates; when that is not possible right now
/// the entry is discarded so the next run rebuilds it.
pub async fn execute(settings: &Settings) -> BootResult<i32> {
    settings.check_root()?;

    let mut pinned = settings.clone();
    pinned.boot_version = settings.app_version.clone();
    let rendered = Properties::for_settings(&pinned).update(&pinned).await?;

    let builder = super::pod_builder(&pinned)?;
    let resolver = super::resolver(&builder, &pinned, true);
    let cache = DependencyCache::new(pinned.cache_dir(), resolver.clone());
    let key = CacheKey::from_settings(&pinned);

    match cache.refresh(&key).await {
        Ok(_) => info!("Refreshed dependency cache"),
        Err(e) => {
            warn!("Dependency refresh failed: {}", e);
            ui::warn_hint(
                &format!("could not refresh dependencies: {}", e),
                "they will be resolved on the next run",
            );
            cache.invalidate(&key).await?;
        }
    }
    resolver.close().await?;

    print!("{}", rendered);
    Ok(EXIT_OK)
}
