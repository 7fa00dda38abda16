//! In-memory runtime for exercising pods without spawning processes

use super::{Pod, PodRuntime, PodValue, RuntimeFactory};
use crate::error::{BootError, BootResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Handler = Arc<dyn Fn(&[PodValue]) -> BootResult<PodValue> + Send + Sync>;

#[derive(Default)]
struct PodLog {
    modules: Vec<String>,
    files: Vec<PathBuf>,
    invoked: Vec<String>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    pods: HashMap<String, PodLog>,
    handlers: HashMap<String, Handler>,
}

/// Creates [`RecordingRuntime`]s that share one journal
#[derive(Default)]
pub(crate) struct RecordingFactory {
    shared: Arc<Mutex<Shared>>,
    failing: bool,
}

impl RecordingFactory {
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Answer invocations of `entry` with `handler`
    pub(crate) fn on<F>(self, entry: &str, handler: F) -> Self
    where
        F: Fn(&[PodValue]) -> BootResult<PodValue> + Send + Sync + 'static,
    {
        self.shared
            .lock()
            .unwrap()
            .handlers
            .insert(entry.to_string(), Arc::new(handler));
        self
    }

    pub(crate) fn loaded_files(&self, pod: &str) -> Vec<PathBuf> {
        self.with_log(pod, |log| log.files.clone())
    }

    pub(crate) fn modules(&self, pod: &str) -> Vec<String> {
        self.with_log(pod, |log| log.modules.clone())
    }

    pub(crate) fn invoked(&self, pod: &str) -> Vec<String> {
        self.with_log(pod, |log| log.invoked.clone())
    }

    pub(crate) fn closed(&self, pod: &str) -> bool {
        self.with_log(pod, |log| log.closed)
    }

    fn with_log<T: Default>(&self, pod: &str, f: impl FnOnce(&PodLog) -> T) -> T {
        self.shared
            .lock()
            .unwrap()
            .pods
            .get(pod)
            .map(f)
            .unwrap_or_default()
    }
}

impl RuntimeFactory for RecordingFactory {
    fn create(&self, pod_name: &str) -> BootResult<Box<dyn PodRuntime>> {
        if self.failing {
            return Err(BootError::Internal(format!("no runtime for {}", pod_name)));
        }
        self.shared
            .lock()
            .unwrap()
            .pods
            .insert(pod_name.to_string(), PodLog::default());
        Ok(Box::new(RecordingRuntime {
            pod: pod_name.to_string(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Runtime that records what it is asked to do
pub(crate) struct RecordingRuntime {
    pod: String,
    shared: Arc<Mutex<Shared>>,
}

impl RecordingRuntime {
    fn record(&self, f: impl FnOnce(&mut PodLog)) {
        let mut shared = self.shared.lock().unwrap();
        f(shared.pods.entry(self.pod.clone()).or_default());
    }
}

#[async_trait]
impl PodRuntime for RecordingRuntime {
    async fn load(&self, module: &str) -> BootResult<()> {
        self.record(|log| log.modules.push(module.to_string()));
        Ok(())
    }

    async fn load_file(&self, path: &Path) -> BootResult<()> {
        self.record(|log| log.files.push(path.to_path_buf()));
        Ok(())
    }

    async fn invoke(&self, _pod: &Pod, entry: &str, args: &[PodValue]) -> BootResult<PodValue> {
        self.record(|log| log.invoked.push(entry.to_string()));
        let handler = self.shared.lock().unwrap().handlers.get(entry).cloned();
        match handler {
            Some(handler) => handler(args),
            None => Ok(PodValue::Nil),
        }
    }

    async fn close(&self) -> BootResult<()> {
        self.record(|log| log.closed = true);
        Ok(())
    }

    fn runtime_name(&self) -> &'static str {
        "recording"
    }
}
