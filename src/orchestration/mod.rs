//! Parallel bootstrap orchestration
//!
//! The `core` and `worker` pods are built concurrently as independent tasks.
//! The orchestrator waits for both, points the worker at the local repository
//! override, hands control to the tool's main entry point inside `core`, and
//! always finishes by running the shutdown hooks and closing `core`.
//!
//! | Outcome of `boot.main/-main` | Exit code |
//! |------------------------------|-----------|
//! | exit signal with integer payload | that integer |
//! | returned without an exit signal | `-1` |
//! | any other failure | `-2` |

mod hooks;

pub use hooks::ShutdownHooks;

use crate::error::{BootError, BootResult};
use crate::pod::{Pod, PodValue};
use crate::ui;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Explicit version or update query handled
pub const EXIT_OK: i32 = 0;

/// Main entry returned without signalling an exit status
pub const EXIT_NO_SIGNAL: i32 = -1;

/// Unhandled failure while bootstrapping or running the tool
pub const EXIT_FAILURE: i32 = -2;

/// Module holding the tool's main entry point
pub const MAIN_MODULE: &str = "boot.main";

/// The tool's main entry point
pub const MAIN_ENTRY: &str = "boot.main/-main";

/// A pod under construction
pub type PodTask = JoinHandle<BootResult<Arc<Pod>>>;

/// Drives the tool's main entry point once `core` and `worker` are ready
#[derive(Debug)]
pub struct Orchestrator {
    local_repo: Option<PathBuf>,
    hooks: ShutdownHooks,
    counter: AtomicU64,
}

impl Orchestrator {
    pub fn new(local_repo: Option<PathBuf>) -> Self {
        Self {
            local_repo,
            hooks: ShutdownHooks::new(),
            counter: AtomicU64::new(0),
        }
    }

    /// Queue handed to the main entry point
    pub fn hooks(&self) -> &ShutdownHooks {
        &self.hooks
    }

    /// Next invocation id; strictly increasing, starting at 1
    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run the tool and return the process exit code
    pub async fn run(&self, core: PodTask, worker: PodTask, args: Vec<String>) -> i32 {
        let (core, worker) = tokio::join!(await_pod("core", core), await_pod("worker", worker));

        let (core, result) = match (core, worker) {
            (Ok(core), Ok(worker)) => {
                let result = self.run_main(&core, worker, args).await;
                (Some(core), result)
            }
            (core, Err(e)) => (core.ok(), Err(e)),
            (Err(e), Ok(_)) => (None, Err(e)),
        };

        let mut code = match result {
            Ok(()) => {
                warn!("{} returned without an exit status", MAIN_ENTRY);
                EXIT_NO_SIGNAL
            }
            Err(e) => match e.exit_status() {
                Some(code) => {
                    debug!(code, "Exit signal");
                    code
                }
                None => {
                    ui::boot_failed(&e);
                    EXIT_FAILURE
                }
            },
        };

        self.hooks.drain_and_run();

        if let Some(core) = core {
            match core.close().await {
                Ok(()) | Err(BootError::Interrupted(_)) => {}
                Err(e) => {
                    ui::boot_failed(&e);
                    code = EXIT_FAILURE;
                }
            }
        }

        info!(code, "Boot finished");
        code
    }

    async fn run_main(&self, core: &Pod, worker: Arc<Pod>, args: Vec<String>) -> BootResult<()> {
        if let Some(repo) = &self.local_repo {
            worker.load("boot.aether").await?;
            worker
                .invoke(
                    "boot.aether/set-local-repo!",
                    vec![PodValue::Str(repo.display().to_string())],
                )
                .await?;
        }

        core.load(MAIN_MODULE).await?;
        let id = i64::try_from(self.next_id())
            .map_err(|_| BootError::Internal("invocation id overflow".to_string()))?;
        core.invoke(
            MAIN_ENTRY,
            vec![
                PodValue::Int(id),
                PodValue::Pod(worker),
                PodValue::Hooks(self.hooks.clone()),
                PodValue::strings(args),
            ],
        )
        .await?;
        Ok(())
    }
}

/// Wait for a pod task, folding task failures into the pod's own error
async fn await_pod(name: &str, task: PodTask) -> BootResult<Arc<Pod>> {
    match task.await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(BootError::Interrupted(format!("pod {}", name))),
        Err(e) => Err(BootError::Internal(format!("building pod {} panicked: {}", name, e))),
    }
}
