//! Dependency cache
//!
//! One JSON file per (repository, runtime version, tool version) key records
//! the artifact sets of the `pod`, `core` and `worker` components. The file is
//! trusted only while it is younger than the TTL and every artifact it names
//! still exists and is not newer than the file itself. Anything else is a miss
//! and rebuilds all three sets.
//!
//! Reads, validation and rebuilds of one entry happen under an exclusive lock
//! on a co-located `.lock` file, so concurrent invocations serialize instead of
//! racing to rewrite it.

use super::lock::LockedFile;
use crate::config::Settings;
use crate::error::{BootError, BootResult};
use crate::resolve::{ArtifactDescriptor, ArtifactResolver, ArtifactSet, Component};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, info, warn};

/// File name of a cache entry
pub const CACHE_FILE: &str = "deps.cache";

/// Repository id used when no local repository override is configured
pub const DEFAULT_REPO_ID: &str = "default";

/// How long a cache entry is trusted
pub fn default_ttl() -> Duration {
    Duration::hours(18)
}

/// Resolved artifact sets of the three cached components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSets {
    pub pod: ArtifactSet,
    pub core: ArtifactSet,
    pub worker: ArtifactSet,
}

impl ArtifactSets {
    pub fn get(&self, component: Component) -> &ArtifactSet {
        match component {
            Component::Pod => &self.pod,
            Component::Core => &self.core,
            Component::Worker => &self.worker,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Path> {
        Component::ALL
            .into_iter()
            .flat_map(move |c| self.get(c).iter())
    }
}

/// Identifies one cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub repo_id: String,
    pub boot_version: String,
    pub clojure_name: String,
    pub clojure_version: String,
}

impl CacheKey {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            repo_id: repo_id(settings.local_repo.as_deref()),
            boot_version: settings.boot_version.clone(),
            clojure_name: settings.clojure_name.clone(),
            clojure_version: settings.clojure_version.clone(),
        }
    }

    /// Cache file location below `root`
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(&self.repo_id)
            .join(&self.clojure_version)
            .join(&self.boot_version)
            .join(CACHE_FILE)
    }

    fn descriptor(&self, component: Component) -> ArtifactDescriptor {
        ArtifactDescriptor {
            component,
            boot_version: self.boot_version.clone(),
            clojure_name: self.clojure_name.clone(),
            clojure_version: self.clojure_version.clone(),
        }
    }
}

/// Short stable id of a local repository override
pub fn repo_id(local_repo: Option<&Path>) -> String {
    let Some(repo) = local_repo else {
        return DEFAULT_REPO_ID.to_string();
    };
    let canonical = std::fs::canonicalize(repo).unwrap_or_else(|_| repo.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // First 6 bytes as hex = 12 characters
    hex::encode(&result[..6])
}

/// TTL-bound, self-healing record of resolved artifact sets
pub struct DependencyCache {
    root: PathBuf,
    ttl: Duration,
    resolver: Arc<dyn ArtifactResolver>,
}

impl DependencyCache {
    pub fn new(root: impl Into<PathBuf>, resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            root: root.into(),
            ttl: default_ttl(),
            resolver,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        key.path(&self.root)
    }

    /// Cached artifact sets for `key`, rebuilt when missing, stale or invalid
    pub async fn get_or_build(&self, key: &CacheKey) -> BootResult<ArtifactSets> {
        let path = self.path(key);
        let _lock = LockedFile::acquire_async(&path).await?;

        match self.read_valid(&path).await {
            Ok(sets) => {
                debug!("Dependency cache hit: {}", path.display());
                Ok(sets)
            }
            Err(e) => {
                if e.is_cache_miss() {
                    debug!("Dependency cache miss: {}", e);
                } else {
                    warn!("Ignoring unreadable dependency cache {}: {}", path.display(), e);
                }
                self.rebuild(key, &path).await
            }
        }
    }

    /// Resolve and persist every component, ignoring any existing entry
    pub async fn refresh(&self, key: &CacheKey) -> BootResult<ArtifactSets> {
        let path = self.path(key);
        let _lock = LockedFile::acquire_async(&path).await?;
        self.rebuild(key, &path).await
    }

    /// Discard the entry so the next lookup rebuilds it
    pub async fn invalidate(&self, key: &CacheKey) -> BootResult<bool> {
        let path = self.path(key);
        let _lock = LockedFile::acquire_async(&path).await?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Discarded dependency cache {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BootError::io(format!("removing {}", path.display()), e)),
        }
    }

    async fn read_valid(&self, path: &Path) -> BootResult<ArtifactSets> {
        if !path.exists() {
            return Err(corrupt(path, "no entry".to_string()));
        }
        let cache_mtime = modified(path).await?;

        let age = Utc::now() - DateTime::<Utc>::from(cache_mtime);
        if age > self.ttl {
            return Err(BootError::CacheStale {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| corrupt(path, e.to_string()))?;
        let sets: ArtifactSets = serde_json::from_str(&content)?;

        for artifact in sets.iter() {
            let artifact_mtime = modified(artifact)
                .await
                .map_err(|_| corrupt(path, format!("missing artifact {}", artifact.display())))?;
            if artifact_mtime > cache_mtime {
                return Err(corrupt(
                    path,
                    format!("artifact {} changed after caching", artifact.display()),
                ));
            }
        }

        Ok(sets)
    }

    async fn rebuild(&self, key: &CacheKey, path: &Path) -> BootResult<ArtifactSets> {
        info!("Resolving dependencies for boot {}", key.boot_version);

        let sets = ArtifactSets {
            pod: self.resolver.resolve(&key.descriptor(Component::Pod)).await?,
            core: self.resolver.resolve(&key.descriptor(Component::Core)).await?,
            worker: self.resolver.resolve(&key.descriptor(Component::Worker)).await?,
        };

        let mut content = serde_json::to_string_pretty(&sets)?;
        content.push('\n');

        let tmp = path.with_extension("cache.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| BootError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| BootError::io(format!("replacing {}", path.display()), e))?;

        debug!("Wrote dependency cache {}", path.display());
        Ok(sets)
    }
}

async fn modified(path: &Path) -> BootResult<SystemTime> {
    fs::metadata(path)
        .await
        .and_then(|m| m.modified())
        .map_err(|e| BootError::io(format!("reading metadata of {}", path.display()), e))
}

fn corrupt(path: &Path, reason: String) -> BootError {
    BootError::CacheCorrupt {
        path: path.to_path_buf(),
        reason,
    }
}
