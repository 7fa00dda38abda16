//! Resolution through a transient resolver pod
//!
//! The resolver pod is built from a single pre-resolved artifact installed
//! with each version, so building it never recurses into resolution. The
//! artifact must exist before the pod is built; a missing one means the
//! version directory is incomplete.

use super::{ArtifactDescriptor, ArtifactResolver, ArtifactSet};
use crate::error::{BootError, BootResult};
use crate::pod::{Pod, PodBuilder, PodValue};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Name of the resolver pod
pub const RESOLVER_POD: &str = "aether";

const RESOLVER_MODULE: &str = "boot.aether";

/// [`ArtifactResolver`] backed by a lazily built `aether` pod
pub struct PodResolver {
    builder: Arc<PodBuilder>,
    artifact: PathBuf,
    local_repo: Option<PathBuf>,
    update_always: bool,
    pod: OnceCell<Arc<Pod>>,
}

impl PodResolver {
    pub fn new(builder: Arc<PodBuilder>, artifact: PathBuf, local_repo: Option<PathBuf>) -> Self {
        Self {
            builder,
            artifact,
            local_repo,
            update_always: false,
            pod: OnceCell::new(),
        }
    }

    /// Re-fetch remote metadata on every resolution
    pub fn update_always(mut self, enabled: bool) -> Self {
        self.update_always = enabled;
        self
    }

    /// The resolver pod, built on first use and reused afterwards
    async fn pod(&self) -> BootResult<&Arc<Pod>> {
        self.pod
            .get_or_try_init(|| async {
                if !self.artifact.is_file() {
                    return Err(BootError::ResolverMissing(self.artifact.clone()));
                }
                info!(artifact = %self.artifact.display(), "Starting resolver pod");
                let pod = self
                    .builder
                    .build(
                        RESOLVER_POD,
                        None,
                        &ArtifactSet::from_paths([self.artifact.clone()]),
                    )
                    .await?;
                pod.load(RESOLVER_MODULE).await?;
                Ok::<_, BootError>(pod)
            })
            .await
    }

    /// Close the resolver pod if it was ever built
    pub async fn close(&self) -> BootResult<()> {
        match self.pod.get() {
            Some(pod) => pod.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ArtifactResolver for PodResolver {
    async fn resolve(&self, descriptor: &ArtifactDescriptor) -> BootResult<ArtifactSet> {
        let pod = self.pod().await?;

        if let Some(repo) = &self.local_repo {
            pod.invoke(
                "boot.aether/set-local-repo!",
                vec![PodValue::Str(repo.display().to_string())],
            )
            .await?;
        }
        if self.update_always {
            pod.invoke("boot.aether/update-always!", vec![]).await?;
        }

        debug!(%descriptor, "Resolving");
        let result = pod
            .invoke(
                "boot.aether/resolve-dependency-jars",
                vec![
                    PodValue::Str(descriptor.component.coordinate()),
                    PodValue::Str(descriptor.boot_version.clone()),
                    PodValue::Str(descriptor.clojure_name.clone()),
                    PodValue::Str(descriptor.clojure_version.clone()),
                ],
            )
            .await
            .map_err(|e| BootError::resolve(descriptor, e.to_string()))?;

        let set = artifact_paths(&result)
            .map(ArtifactSet::from_paths)
            .ok_or_else(|| {
                BootError::resolve(
                    descriptor,
                    format!("expected a list of paths, got {:?}", result),
                )
            })?;
        debug!(%descriptor, artifacts = set.len(), "Resolved");
        Ok(set)
    }
}

fn artifact_paths(value: &PodValue) -> Option<Vec<PathBuf>> {
    match value {
        PodValue::List(items) => items
            .iter()
            .map(|item| item.as_str().map(PathBuf::from))
            .collect(),
        PodValue::Json(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(PathBuf::from))
            .collect(),
        PodValue::Nil => Some(Vec::new()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::testing::RecordingFactory;
    use crate::pod::{Namespace, PodRegistry};
    use crate::resolve::Component;
    use std::fs;
    use tempfile::TempDir;

    fn descriptor(component: Component) -> ArtifactDescriptor {
        ArtifactDescriptor {
            component,
            boot_version: "2.8.3".into(),
            clojure_name: "org.clojure/clojure".into(),
            clojure_version: "1.10.1".into(),
        }
    }

    fn builder(factory: Arc<RecordingFactory>) -> Arc<PodBuilder> {
        PodBuilder::new(
            PodRegistry::new(),
            factory,
            Namespace::root("app", vec![]),
            vec![],
        )
    }

    /// Installed resolver artifact inside `temp`
    fn artifact(temp: &TempDir) -> PathBuf {
        let path = temp.path().join("aether.uber.jar");
        fs::write(&path, "jar").unwrap();
        path
    }

    fn answering() -> Arc<RecordingFactory> {
        Arc::new(
            RecordingFactory::default().on("boot.aether/resolve-dependency-jars", |args| {
                let coord = args[0].as_str().unwrap_or_default().replace('/', "-");
                Ok(PodValue::Json(serde_json::json!([
                    format!("/m2/{}.jar", coord),
                    "/m2/clojure.jar"
                ])))
            }),
        )
    }

    #[tokio::test]
    async fn resolver_pod_is_built_once() {
        let temp = TempDir::new().unwrap();
        let factory = answering();
        let resolver = PodResolver::new(builder(Arc::clone(&factory)), artifact(&temp), None);

        let core = resolver.resolve(&descriptor(Component::Core)).await.unwrap();
        let worker = resolver.resolve(&descriptor(Component::Worker)).await.unwrap();

        assert_eq!(
            core.paths(),
            &[PathBuf::from("/m2/boot-core.jar"), PathBuf::from("/m2/clojure.jar")]
        );
        assert_eq!(worker.len(), 2);
        assert_eq!(factory.modules(RESOLVER_POD), vec![RESOLVER_MODULE.to_string()]);
        assert_eq!(
            factory.invoked(RESOLVER_POD),
            vec![
                "boot.aether/resolve-dependency-jars".to_string(),
                "boot.aether/resolve-dependency-jars".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn local_repo_and_update_are_applied_first() {
        let temp = TempDir::new().unwrap();
        let factory = answering();
        let resolver = PodResolver::new(
            builder(Arc::clone(&factory)),
            artifact(&temp),
            Some("/tmp/m2".into()),
        )
        .update_always(true);

        resolver.resolve(&descriptor(Component::Pod)).await.unwrap();

        assert_eq!(
            factory.invoked(RESOLVER_POD),
            vec![
                "boot.aether/set-local-repo!".to_string(),
                "boot.aether/update-always!".to_string(),
                "boot.aether/resolve-dependency-jars".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn update_is_skipped_unless_requested() {
        let temp = TempDir::new().unwrap();
        let factory = answering();
        let resolver = PodResolver::new(builder(Arc::clone(&factory)), artifact(&temp), None);
        resolver.resolve(&descriptor(Component::Pod)).await.unwrap();

        assert!(!factory
            .invoked(RESOLVER_POD)
            .contains(&"boot.aether/update-always!".to_string()));
    }

    #[tokio::test]
    async fn malformed_result_is_resolve_error() {
        let factory = Arc::new(
            RecordingFactory::default()
                .on("boot.aether/resolve-dependency-jars", |_| Ok(PodValue::Int(3))),
        );
        let temp = TempDir::new().unwrap();
        let resolver = PodResolver::new(builder(factory), artifact(&temp), None);

        assert!(matches!(
            resolver.resolve(&descriptor(Component::Core)).await,
            Err(BootError::Resolve { .. })
        ));
    }

    #[tokio::test]
    async fn missing_artifact_fails_before_building_pod() {
        let temp = TempDir::new().unwrap();
        let factory = answering();
        let missing = temp.path().join("aether.uber.jar");
        let resolver = PodResolver::new(builder(Arc::clone(&factory)), missing.clone(), None);

        match resolver.resolve(&descriptor(Component::Core)).await {
            Err(BootError::ResolverMissing(path)) => assert_eq!(path, missing),
            other => panic!("unexpected {:?}", other.map(|s| s.len())),
        }
        assert!(factory.invoked(RESOLVER_POD).is_empty());
    }
}
