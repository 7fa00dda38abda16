//! Pod runtime abstraction
//!
//! The bootstrap never executes pod code itself. It talks to a runtime through
//! this narrow capability: load a module, load a file, invoke a named entry
//! point with positional arguments, close. Different isolation mechanisms
//! (child processes, embedded interpreters, dynamic libraries) implement it.

use super::{Pod, PodValue};
use crate::error::BootResult;
use async_trait::async_trait;
use std::path::Path;

/// Execution capability backing one pod
#[async_trait]
pub trait PodRuntime: Send + Sync {
    /// Make a module available to later invocations
    async fn load(&self, module: &str) -> BootResult<()>;

    /// Evaluate a source file inside the pod
    async fn load_file(&self, path: &Path) -> BootResult<()>;

    /// Invoke `module/entry` with positional arguments
    ///
    /// An entry that terminates the tool reports its status as
    /// `BootError::Exit`.
    async fn invoke(&self, pod: &Pod, entry: &str, args: &[PodValue]) -> BootResult<PodValue>;

    /// Release everything held by the runtime
    async fn close(&self) -> BootResult<()>;

    /// Human-readable mechanism name for logs
    fn runtime_name(&self) -> &'static str;
}

/// Creates one runtime per pod
pub trait RuntimeFactory: Send + Sync {
    fn create(&self, pod_name: &str) -> BootResult<Box<dyn PodRuntime>>;
}
