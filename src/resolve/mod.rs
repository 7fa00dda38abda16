//! Artifact resolution
//!
//! Turns a logical component descriptor into the ordered local files that
//! satisfy it. The resolution mechanism itself is opaque to the rest of the
//! bootstrap and sits behind [`ArtifactResolver`].

mod aether;

pub use aether::PodResolver;

use crate::config::Settings;
use crate::error::BootResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Role a resolved artifact set plays in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Pod,
    Core,
    Worker,
}

impl Component {
    /// Every component the dependency cache holds
    pub const ALL: [Component; 3] = [Component::Pod, Component::Core, Component::Worker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Core => "core",
            Self::Worker => "worker",
        }
    }

    /// Library coordinate published for this component
    pub fn coordinate(&self) -> String {
        format!("boot/{}", self.as_str())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component plus the version coordinates it is resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub component: Component,
    pub boot_version: String,
    pub clojure_name: String,
    pub clojure_version: String,
}

impl ArtifactDescriptor {
    pub fn new(component: Component, settings: &Settings) -> Self {
        Self {
            component,
            boot_version: settings.boot_version.clone(),
            clojure_name: settings.clojure_name.clone(),
            clojure_version: settings.clojure_version.clone(),
        }
    }
}

impl fmt::Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} {})",
            self.component.coordinate(),
            self.boot_version,
            self.clojure_name,
            self.clojure_version
        )
    }
}

/// Ordered, duplicate-free local artifact paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet(Vec<PathBuf>);

impl ArtifactSet {
    /// Keep the first occurrence of every path
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut seen = HashSet::new();
        Self(
            paths
                .into_iter()
                .filter(|p| seen.insert(p.clone()))
                .collect(),
        )
    }

    /// This set followed by whatever `other` adds
    pub fn union(&self, other: &ArtifactSet) -> Self {
        Self::from_paths(self.0.iter().chain(other.0.iter()).cloned())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

impl FromIterator<PathBuf> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self::from_paths(iter)
    }
}

/// Resolution backend
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, descriptor: &ArtifactDescriptor) -> BootResult<ArtifactSet>;
}
