//! Error types for boot
//!
//! All modules use `BootResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for boot operations
pub type BootResult<T> = Result<T, BootError>;

/// All errors that can occur while bootstrapping
#[derive(Error, Debug)]
pub enum BootError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid version identifier: {0}")]
    VersionInvalid(String),

    #[error("Refusing to run as root")]
    RunAsRoot,

    #[error("Could not determine home directory")]
    HomeNotFound,

    // Cache errors (recovered by rebuilding, never surfaced to the operator)
    #[error("Dependency cache at {path} is stale")]
    CacheStale { path: PathBuf },

    #[error("Dependency cache at {path} is invalid: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    // Resolution errors
    #[error("Failed to resolve {descriptor}: {reason}")]
    Resolve { descriptor: String, reason: String },

    #[error("Download failed: {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("No release artifact found for version {0}")]
    ReleaseNotFound(String),

    #[error("Resolver artifact missing: {}", .0.display())]
    ResolverMissing(PathBuf),

    // Pod errors
    #[error("Namespace {0} is sealed")]
    NamespaceSealed(String),

    #[error("Pod {0} is closed")]
    PodClosed(String),

    #[error("Pod {pod} failed invoking {entry}: {reason}")]
    PodInvoke {
        pod: String,
        entry: String,
        reason: String,
    },

    #[error("Unknown entry point {entry} in pod {pod}")]
    UnknownEntry { pod: String, entry: String },

    // Termination
    #[error("exit {0}")]
    Exit(String),

    #[error("Interrupted while waiting for {0}")]
    Interrupted(String),

    #[error("Process terminated by signal")]
    ProcessSignaled,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BootError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a resolution error for a descriptor
    pub fn resolve(descriptor: impl ToString, reason: impl Into<String>) -> Self {
        Self::Resolve {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }

    /// Exit status carried by the exit signal, if its payload is an integer
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Self::Exit(payload) => payload.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the cache layer may recover from this error by rebuilding
    pub fn is_cache_miss(&self) -> bool {
        matches!(
            self,
            Self::CacheStale { .. } | Self::CacheCorrupt { .. } | Self::Json(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RunAsRoot => Some("Set BOOT_AS_ROOT=yes to force"),
            Self::HomeNotFound => Some("Set BOOT_HOME to the installation directory"),
            Self::VersionInvalid(_) => Some("Versions look like MAJOR.MINOR.PATCH, e.g. 2.8.3"),
            Self::ResolverMissing(_) => Some("Run the boot loader to repair this version"),
            Self::Download { .. } | Self::ReleaseNotFound(_) => {
                Some("Check network access or set BOOT_VERSION to an installed version")
            }
            _ => None,
        }
    }
}
