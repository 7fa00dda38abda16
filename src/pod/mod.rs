//! Pods: isolated execution environments
//!
//! A pod pairs a resolution [`Namespace`] with a [`PodRuntime`] that executes
//! code against it. Pods are created by the [`PodBuilder`], tracked weakly by
//! the [`PodRegistry`] and closed explicitly or reclaimed when the last strong
//! reference goes away.
//!
//! The `boot.pod` module is served by the bootstrap itself rather than by the
//! runtime; it wires a fresh pod to its data, the registry and itself.

mod bootstrap;
pub mod builder;
pub mod namespace;
pub mod process;
pub mod registry;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{PodBuilder, HOOK_FILE};
pub use namespace::Namespace;
pub use process::{ProcessRuntime, ProcessRuntimeFactory};
pub use registry::PodRegistry;
pub use runtime::{PodRuntime, RuntimeFactory};

use crate::error::{BootError, BootResult};
use crate::orchestration::ShutdownHooks;
use crate::resolve::ArtifactSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::{debug, info};
use uuid::Uuid;

/// Unique pod identifier
pub type PodId = Uuid;

/// Module implemented by the bootstrap inside every pod
pub const BOOTSTRAP_MODULE: &str = "boot.pod";

/// Positional argument or result of a pod invocation
#[derive(Clone)]
pub enum PodValue {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<PodValue>),
    Json(serde_json::Value),
    Pod(Arc<Pod>),
    WeakPod(Weak<Pod>),
    Registry(PodRegistry),
    Hooks(ShutdownHooks),
}

impl PodValue {
    /// Portable representation for runtimes that cross a process boundary
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Self::Nil | Self::Hooks(_) => serde_json::Value::Null,
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Str(s) => json!(s),
            Self::List(items) => items.iter().map(Self::to_json).collect(),
            Self::Json(value) => value.clone(),
            Self::Pod(pod) => pod.describe(),
            Self::WeakPod(weak) => weak
                .upgrade()
                .map(|pod| pod.describe())
                .unwrap_or(serde_json::Value::Null),
            Self::Registry(registry) => registry.live().iter().map(|p| p.describe()).collect(),
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Turn a list of strings into a `List` value
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::Str(s.into())).collect())
    }
}

impl fmt::Debug for PodValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pod(pod) => write!(f, "Pod({})", pod.name()),
            Self::WeakPod(_) => write!(f, "WeakPod"),
            Self::Registry(r) => write!(f, "{:?}", r),
            Self::Hooks(h) => write!(f, "{:?}", h),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Per-pod state written through the bootstrap module
#[derive(Default)]
struct PodContext {
    data: Option<serde_json::Value>,
    pods: Option<PodRegistry>,
    this: Weak<Pod>,
}

/// An isolated execution environment
pub struct Pod {
    id: PodId,
    name: String,
    namespace: Arc<Namespace>,
    runtime: Box<dyn PodRuntime>,
    context: RwLock<PodContext>,
    registry: PodRegistry,
    builder: Arc<PodBuilder>,
    closed: AtomicBool,
}

impl Pod {
    pub(crate) fn new(
        name: &str,
        namespace: Arc<Namespace>,
        runtime: Box<dyn PodRuntime>,
        registry: PodRegistry,
        builder: Arc<PodBuilder>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            namespace,
            runtime,
            context: RwLock::new(PodContext::default()),
            registry,
            builder,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> PodId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    pub fn runtime_name(&self) -> &'static str {
        self.runtime.runtime_name()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Data object registered at construction
    pub fn data(&self) -> Option<serde_json::Value> {
        self.context.read().ok().and_then(|ctx| ctx.data.clone())
    }

    /// Registry handle this pod was given, if wired
    pub fn pods(&self) -> Option<PodRegistry> {
        self.context.read().ok().and_then(|ctx| ctx.pods.clone())
    }

    /// Strong reference to this pod through its own weak self-reference
    pub fn this(&self) -> Option<Arc<Pod>> {
        self.context.read().ok().and_then(|ctx| ctx.this.upgrade())
    }

    /// Identity as seen from outside the process
    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!({ "id": self.id.to_string(), "name": self.name })
    }

    /// Make a module available inside the pod
    pub async fn load(&self, module: &str) -> BootResult<()> {
        self.ensure_open()?;
        if module == BOOTSTRAP_MODULE {
            return Ok(());
        }
        self.runtime.load(module).await
    }

    /// Evaluate a source file inside the pod
    pub async fn load_file(&self, path: &Path) -> BootResult<()> {
        self.ensure_open()?;
        debug!(pod = %self.name, file = %path.display(), "Loading file");
        self.runtime.load_file(path).await
    }

    /// Invoke a named entry point, e.g. `boot.main/-main`
    pub async fn invoke(&self, entry: &str, args: Vec<PodValue>) -> BootResult<PodValue> {
        self.ensure_open()?;
        match entry.split_once('/') {
            Some((BOOTSTRAP_MODULE, function)) => bootstrap::invoke(self, function, args),
            _ => self.runtime.invoke(self, entry, &args).await,
        }
    }

    /// Build a sibling pod from the base pod artifacts plus `extra`
    pub async fn make_sibling(&self, name: &str, extra: &ArtifactSet) -> BootResult<Arc<Pod>> {
        self.ensure_open()?;
        self.builder.build_with_base(name, None, extra).await
    }

    /// Close the runtime and leave the registry; idempotent
    pub async fn close(&self) -> BootResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.registry.remove(&self.id);
        self.runtime.close().await?;
        info!(pod = %self.name, "Closed pod");
        Ok(())
    }

    fn ensure_open(&self) -> BootResult<()> {
        if self.is_closed() {
            return Err(BootError::PodClosed(self.name.clone()));
        }
        Ok(())
    }

    fn update_context(&self, f: impl FnOnce(&mut PodContext)) -> BootResult<()> {
        let mut ctx = self
            .context
            .write()
            .map_err(|_| BootError::Internal(format!("pod {} context poisoned", self.name)))?;
        f(&mut ctx);
        Ok(())
    }
}

impl Drop for Pod {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

impl fmt::Debug for Pod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pod")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("runtime", &self.runtime.runtime_name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
