//! Pod construction
//!
//! Building a pod:
//! 1. turn each artifact path into an absolute module source
//! 2. chain a fresh namespace to the bootstrap namespace
//! 3. run the installation-wide, then the working-directory hook file
//! 4. wire the pod through `boot.pod`: seal the root namespace, make the pod's
//!    own namespace addable, set data, hand over the registry and a weak
//!    self-reference
//! 5. register the pod (weakly) and hand it back

use super::{Namespace, Pod, PodRegistry, PodValue, RuntimeFactory, BOOTSTRAP_MODULE};
use crate::error::{BootError, BootResult};
use crate::resolve::ArtifactSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// File name of the optional customization hook
pub const HOOK_FILE: &str = "boot-shim.clj";

/// Builds pods that share one registry and one bootstrap namespace
pub struct PodBuilder {
    registry: PodRegistry,
    factory: Arc<dyn RuntimeFactory>,
    bootstrap: Arc<Namespace>,
    hooks: Vec<PathBuf>,
    base: ArtifactSet,
}

impl PodBuilder {
    /// Create a builder
    ///
    /// `hooks` are candidate hook files in execution order; missing ones are
    /// skipped at build time.
    pub fn new(
        registry: PodRegistry,
        factory: Arc<dyn RuntimeFactory>,
        bootstrap: Arc<Namespace>,
        hooks: Vec<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            factory,
            bootstrap,
            hooks,
            base: ArtifactSet::default(),
        })
    }

    /// Same builder, with `base` prepended to every sibling pod
    pub fn with_base(&self, base: ArtifactSet) -> Arc<Self> {
        Arc::new(Self {
            registry: self.registry.clone(),
            factory: Arc::clone(&self.factory),
            bootstrap: Arc::clone(&self.bootstrap),
            hooks: self.hooks.clone(),
            base,
        })
    }

    pub fn registry(&self) -> &PodRegistry {
        &self.registry
    }

    pub fn bootstrap(&self) -> &Arc<Namespace> {
        &self.bootstrap
    }

    /// Base artifacts for sibling pods
    pub fn base(&self) -> &ArtifactSet {
        &self.base
    }

    /// Build a pod from exactly `artifacts`
    pub async fn build(
        self: &Arc<Self>,
        name: &str,
        data: Option<serde_json::Value>,
        artifacts: &ArtifactSet,
    ) -> BootResult<Arc<Pod>> {
        let sources = artifacts
            .iter()
            .map(|path| {
                std::path::absolute(path)
                    .map_err(|e| BootError::io(format!("resolving {}", path.display()), e))
            })
            .collect::<BootResult<Vec<_>>>()?;

        let namespace = self.bootstrap.child(name, sources);
        let runtime = self.factory.create(name)?;
        debug!(pod = name, runtime = runtime.runtime_name(), "Building pod");

        let pod = Arc::new(Pod::new(
            name,
            namespace,
            runtime,
            self.registry.clone(),
            Arc::clone(self),
        ));

        for hook in self.hooks.iter().filter(|h| h.is_file()) {
            pod.load_file(hook).await?;
        }

        pod.load(BOOTSTRAP_MODULE).await?;
        pod.invoke("boot.pod/seal-app-classloader", vec![]).await?;
        pod.invoke("boot.pod/extend-addable-classloader", vec![])
            .await?;
        let data = data.map(PodValue::Json).unwrap_or(PodValue::Nil);
        pod.invoke("boot.pod/set-data!", vec![data]).await?;
        pod.invoke(
            "boot.pod/set-pods!",
            vec![PodValue::Registry(self.registry.clone())],
        )
        .await?;
        pod.invoke(
            "boot.pod/set-this-pod!",
            vec![PodValue::WeakPod(Arc::downgrade(&pod))],
        )
        .await?;

        self.registry.register(&pod);
        info!(pod = name, artifacts = artifacts.len(), "Pod ready");
        Ok(pod)
    }

    /// Build a pod from the base artifacts plus `extra`
    pub async fn build_with_base(
        self: &Arc<Self>,
        name: &str,
        data: Option<serde_json::Value>,
        extra: &ArtifactSet,
    ) -> BootResult<Arc<Pod>> {
        let artifacts = self.base.union(extra);
        self.build(name, data, &artifacts).await
    }

    /// Start building a pod on the shared executor
    pub fn spawn(
        self: &Arc<Self>,
        name: &str,
        data: Option<serde_json::Value>,
        artifacts: ArtifactSet,
    ) -> JoinHandle<BootResult<Arc<Pod>>> {
        let builder = Arc::clone(self);
        let name = name.to_string();
        tokio::spawn(async move { builder.build(&name, data, &artifacts).await })
    }
}
