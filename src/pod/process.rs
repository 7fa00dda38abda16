//! Pod runtime backed by a launcher program
//!
//! Every invocation runs `<launcher> <module/entry> <args...>` in a child
//! process. The pod's resolution path, identity and accumulated state reach
//! the child through the environment:
//!
//! | Variable | Content |
//! |----------|---------|
//! | `BOOT_POD_NAME` | pod name |
//! | `BOOT_POD_ID` | pod id |
//! | `BOOT_POD_PATH` | visible artifacts, joined like `PATH` |
//! | `BOOT_POD_STATE` | JSON file with data, loaded modules and pending calls |
//!
//! Entries ending in `!` only mutate pod state; they are journaled and
//! replayed to the next spawned child instead of spawning one themselves.
//! Such setters are last-write-wins, so the journal keeps only the latest
//! call of each entry.
//! Entries named `-main` own the terminal and always end in an exit status.
//! Any other entry prints its result as JSON on stdout.

use super::{Pod, PodRuntime, PodValue, RuntimeFactory};
use crate::error::{BootError, BootResult};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Environment variable carrying the pod name
pub const ENV_POD_NAME: &str = "BOOT_POD_NAME";
/// Environment variable carrying the pod id
pub const ENV_POD_ID: &str = "BOOT_POD_ID";
/// Environment variable carrying the pod resolution path
pub const ENV_POD_PATH: &str = "BOOT_POD_PATH";
/// Environment variable carrying the state file location
pub const ENV_POD_STATE: &str = "BOOT_POD_STATE";

#[derive(Debug, Clone, Serialize)]
struct JournalEntry {
    entry: String,
    args: Vec<serde_json::Value>,
}

#[derive(Debug, Default)]
struct ProcessState {
    modules: Vec<String>,
    preload: Vec<PathBuf>,
    journal: Vec<JournalEntry>,
}

#[derive(Serialize)]
struct StateFile<'a> {
    id: String,
    name: &'a str,
    data: Option<serde_json::Value>,
    path: Vec<PathBuf>,
    modules: &'a [String],
    preload: &'a [PathBuf],
    journal: &'a [JournalEntry],
}

/// Runs pod code in child processes of a launcher program
#[derive(Debug)]
pub struct ProcessRuntime {
    launcher: PathBuf,
    state: Mutex<ProcessState>,
    closed: AtomicBool,
}

impl ProcessRuntime {
    pub fn new(launcher: impl Into<PathBuf>) -> Self {
        Self {
            launcher: launcher.into(),
            state: Mutex::new(ProcessState::default()),
            closed: AtomicBool::new(false),
        }
    }

    async fn write_state(&self, pod: &Pod) -> BootResult<PathBuf> {
        let state = self.state.lock().await;
        let file = StateFile {
            id: pod.id().to_string(),
            name: pod.name(),
            data: pod.data(),
            path: pod.namespace().visible_paths(),
            modules: &state.modules,
            preload: &state.preload,
            journal: &state.journal,
        };
        let path = std::env::temp_dir().join(format!("boot-pod-{}.json", Uuid::new_v4()));
        let content = serde_json::to_vec_pretty(&file)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| BootError::io(format!("writing pod state {}", path.display()), e))?;
        Ok(path)
    }

    fn command(
        &self,
        pod: &Pod,
        entry: &str,
        args: &[PodValue],
        state: &Path,
    ) -> BootResult<Command> {
        let search_path = std::env::join_paths(pod.namespace().visible_paths())
            .map_err(|e| BootError::Internal(format!("pod {} path: {}", pod.name(), e)))?;

        let mut command = Command::new(&self.launcher);
        command
            .arg(entry)
            .args(args.iter().filter_map(render_arg))
            .env(ENV_POD_NAME, pod.name())
            .env(ENV_POD_ID, pod.id().to_string())
            .env(ENV_POD_PATH, search_path)
            .env(ENV_POD_STATE, state)
            .kill_on_drop(true);
        Ok(command)
    }

    async fn run_main(
        &self,
        pod: &Pod,
        entry: &str,
        args: &[PodValue],
        state: PathBuf,
    ) -> BootResult<PodValue> {
        let mut command = self.command(pod, entry, args, &state)?;
        let status = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| BootError::command_failed(self.launcher.display().to_string(), e));

        // Remove the state file once the tool is shutting down, or right away
        // when the caller handed us nowhere to register cleanup.
        match args.iter().find_map(|a| match a {
            PodValue::Hooks(hooks) => Some(hooks),
            _ => None,
        }) {
            Some(hooks) => hooks.push(move || remove_state(&state)),
            None => remove_state(&state),
        }

        let status = status?;
        debug!(pod = %pod.name(), entry, ?status, "Main entry finished");
        match status.code() {
            Some(code) => Err(BootError::Exit(code.to_string())),
            None => Err(BootError::ProcessSignaled),
        }
    }

    async fn run_captured(
        &self,
        pod: &Pod,
        entry: &str,
        args: &[PodValue],
        state: PathBuf,
    ) -> BootResult<PodValue> {
        let mut command = self.command(pod, entry, args, &state)?;
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BootError::command_failed(self.launcher.display().to_string(), e));
        remove_state(&state);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootError::PodInvoke {
                pod: pod.name().to_string(),
                entry: entry.to_string(),
                reason: match stderr.trim() {
                    "" => format!("launcher exited with {}", output.status),
                    reason => reason.to_string(),
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(PodValue::Nil);
        }
        Ok(serde_json::from_str(stdout)
            .map(PodValue::Json)
            .unwrap_or_else(|_| PodValue::Str(stdout.to_string())))
    }

    fn ensure_open(&self, pod: &Pod) -> BootResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BootError::PodClosed(pod.name().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PodRuntime for ProcessRuntime {
    async fn load(&self, module: &str) -> BootResult<()> {
        let mut state = self.state.lock().await;
        if !state.modules.iter().any(|m| m == module) {
            state.modules.push(module.to_string());
        }
        Ok(())
    }

    async fn load_file(&self, path: &Path) -> BootResult<()> {
        if !path.is_file() {
            return Err(BootError::io(
                format!("loading {}", path.display()),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        self.state.lock().await.preload.push(path.to_path_buf());
        Ok(())
    }

    async fn invoke(&self, pod: &Pod, entry: &str, args: &[PodValue]) -> BootResult<PodValue> {
        self.ensure_open(pod)?;
        let function = entry.rsplit('/').next().unwrap_or(entry);

        if function.ends_with('!') {
            debug!(pod = %pod.name(), entry, "Journaled");
            let mut state = self.state.lock().await;
            state.journal.retain(|recorded| recorded.entry != entry);
            state.journal.push(JournalEntry {
                entry: entry.to_string(),
                args: args.iter().map(PodValue::to_json).collect(),
            });
            return Ok(PodValue::Nil);
        }

        let state = self.write_state(pod).await?;
        debug!(pod = %pod.name(), entry, launcher = %self.launcher.display(), "Spawning");
        if function == "-main" {
            self.run_main(pod, entry, args, state).await
        } else {
            self.run_captured(pod, entry, args, state).await
        }
    }

    async fn close(&self) -> BootResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn runtime_name(&self) -> &'static str {
        "process"
    }
}

/// Creates one [`ProcessRuntime`] per pod, all using the same launcher
#[derive(Debug, Clone)]
pub struct ProcessRuntimeFactory {
    launcher: PathBuf,
}

impl ProcessRuntimeFactory {
    pub fn new(launcher: impl Into<PathBuf>) -> Self {
        Self {
            launcher: launcher.into(),
        }
    }
}

impl RuntimeFactory for ProcessRuntimeFactory {
    fn create(&self, pod_name: &str) -> BootResult<Box<dyn PodRuntime>> {
        debug!(pod = pod_name, launcher = %self.launcher.display(), "Creating process runtime");
        Ok(Box::new(ProcessRuntime::new(self.launcher.clone())))
    }
}

/// Command-line form of an argument; strings go through verbatim
fn render_arg(value: &PodValue) -> Option<String> {
    match value {
        PodValue::Hooks(_) => None,
        PodValue::Str(s) => Some(s.clone()),
        other => Some(other.to_json().to_string()),
    }
}

fn remove_state(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove pod state {}: {}", path.display(), e);
        }
    }
}
