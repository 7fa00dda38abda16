//! Typed settings resolved once per invocation
//!
//! Components receive a `Settings` value through their constructors instead of
//! reading process-wide state.

use super::{keys, ConfigSnapshot};
use crate::error::{BootError, BootResult};
use crate::loader::release_tag;
use crate::version::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default scripting runtime artifact
pub const DEFAULT_CLOJURE_NAME: &str = "org.clojure/clojure";

/// Default scripting runtime version
pub const DEFAULT_CLOJURE_VERSION: &str = "1.10.1";

/// Default pod launcher program, looked up on `PATH`
pub const DEFAULT_POD_LAUNCHER: &str = "boot-pod";

/// File name of the resolver pod artifact inside a version directory
pub const RESOLVER_ARTIFACT: &str = "aether.uber.jar";

/// Release channel selector
///
/// Reserved: the value is validated and logged, but releases are always
/// fetched by fixed tag and dependency caches are keyed without it, so both
/// channels currently resolve the same artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Release,
    Snapshot,
}

impl Channel {
    fn parse(value: &str) -> BootResult<Self> {
        match value.to_ascii_uppercase().as_str() {
            "RELEASE" => Ok(Self::Release),
            "SNAPSHOT" => Ok(Self::Snapshot),
            other => Err(BootError::ConfigInvalid {
                path: PathBuf::from(keys::CHANNEL),
                reason: format!("unknown channel '{}', expected RELEASE or SNAPSHOT", other),
            }),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => write!(f, "RELEASE"),
            Self::Snapshot => write!(f, "SNAPSHOT"),
        }
    }
}

/// Immutable, resolved configuration for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Installation root
    pub home: PathBuf,

    /// Working directory of the invocation
    pub work_dir: PathBuf,

    /// Version of the running artifact
    pub app_version: String,

    /// Tool version whose dependencies get resolved
    pub boot_version: String,

    /// Scripting runtime artifact name
    pub clojure_name: String,

    /// Scripting runtime version
    pub clojure_version: String,

    /// Local artifact repository override
    pub local_repo: Option<PathBuf>,

    /// Release channel; reserved, see [`Channel`]
    pub channel: Channel,

    /// Whether running as root was explicitly allowed
    pub as_root: bool,

    /// Program that hosts process pods
    pub pod_launcher: PathBuf,
}

impl Settings {
    /// Resolve settings from the key space, injecting defaults for unset keys
    pub fn resolve(snapshot: &mut ConfigSnapshot, app_version: &str) -> BootResult<Self> {
        let boot_version = snapshot.get_or_default(keys::VERSION, app_version);
        validate_version(&boot_version)?;

        let clojure_name = snapshot.get_or_default(keys::CLOJURE_NAME, DEFAULT_CLOJURE_NAME);
        let clojure_version =
            snapshot.get_or_default(keys::CLOJURE_VERSION, DEFAULT_CLOJURE_VERSION);
        let channel = Channel::parse(&snapshot.get_or_default(keys::CHANNEL, "RELEASE"))?;
        let as_root = snapshot
            .get(keys::AS_ROOT)
            .is_some_and(|v| v.eq_ignore_ascii_case("yes"));
        let local_repo = snapshot
            .get(keys::LOCAL_REPO)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let pod_launcher =
            PathBuf::from(snapshot.get_or_default(keys::POD_LAUNCHER, DEFAULT_POD_LAUNCHER));

        let settings = Self {
            home: snapshot.home().to_path_buf(),
            work_dir: snapshot.work_dir().to_path_buf(),
            app_version: app_version.to_string(),
            boot_version,
            clojure_name,
            clojure_version,
            local_repo,
            channel,
            as_root,
            pod_launcher,
        };
        debug!(
            boot_version = %settings.boot_version,
            clojure = %settings.clojure_version,
            channel = %settings.channel,
            "Resolved settings"
        );
        Ok(settings)
    }

    /// Refuse to continue as root unless explicitly allowed
    pub fn check_root(&self) -> BootResult<()> {
        if is_root() && !self.as_root {
            return Err(BootError::RunAsRoot);
        }
        Ok(())
    }

    /// Directory holding per-version launch artifacts
    pub fn bin_dir(&self) -> PathBuf {
        bin_dir(&self.home)
    }

    /// Directory holding dependency cache files
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache").join("cache")
    }

    /// Installation properties file
    pub fn properties_path(&self) -> PathBuf {
        self.home.join(super::PROPERTIES_FILE)
    }

    /// Installed copy of the artifact the resolver pod is built from
    pub fn resolver_artifact(&self) -> PathBuf {
        self.bin_dir()
            .join(release_tag(&self.app_version))
            .join(RESOLVER_ARTIFACT)
    }
}

/// Directory holding per-version launch artifacts under an installation root
pub fn bin_dir(home: &Path) -> PathBuf {
    home.join("cache").join("bin")
}

fn validate_version(version: &str) -> BootResult<()> {
    let plain = version.strip_suffix("-SNAPSHOT").unwrap_or(version);
    Version::parse(plain)
        .map(|_| ())
        .ok_or_else(|| BootError::VersionInvalid(version.to_string()))
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}
