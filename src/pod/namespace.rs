//! Hierarchical resolution namespaces
//!
//! A namespace is an ordered list of artifact paths chained to an optional
//! parent. Lookups go parent first, so a child sees everything its ancestors
//! hold but an ancestor never sees what is added to a child.
//!
//! | State | `add` | Description |
//! |-------|-------|-------------|
//! | Fixed | error | Created from a fixed artifact set |
//! | Addable | ok | Code inside the pod may extend it |
//! | Sealed | error | Permanently closed to further additions |

use crate::error::{BootError, BootResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

const FIXED: u8 = 0;
const ADDABLE: u8 = 1;
const SEALED: u8 = 2;

/// One resolution scope in a parent chain
#[derive(Debug)]
pub struct Namespace {
    name: String,
    parent: Option<Arc<Namespace>>,
    paths: RwLock<Vec<PathBuf>>,
    state: AtomicU8,
}

impl Namespace {
    /// A root namespace; addable until sealed
    pub fn root(name: impl Into<String>, paths: Vec<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: None,
            paths: RwLock::new(dedup(paths)),
            state: AtomicU8::new(ADDABLE),
        })
    }

    /// A fixed child namespace that sees this one
    pub fn child(self: &Arc<Self>, name: impl Into<String>, paths: Vec<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            parent: Some(Arc::clone(self)),
            paths: RwLock::new(dedup(paths)),
            state: AtomicU8::new(FIXED),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Namespace>> {
        self.parent.as_ref()
    }

    /// Topmost ancestor (itself for a root)
    pub fn root_of(self: &Arc<Self>) -> Arc<Self> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent.clone() {
            current = parent;
        }
        current
    }

    /// Allow further additions; fails once sealed
    pub fn make_addable(&self) -> BootResult<()> {
        match self
            .state
            .compare_exchange(FIXED, ADDABLE, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) | Err(ADDABLE) => Ok(()),
            Err(_) => Err(BootError::NamespaceSealed(self.name.clone())),
        }
    }

    /// Permanently refuse further additions
    pub fn seal(&self) {
        if self.state.swap(SEALED, Ordering::SeqCst) != SEALED {
            debug!("Sealed namespace {}", self.name);
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == SEALED
    }

    pub fn is_addable(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ADDABLE
    }

    /// Add an artifact to this namespace
    pub fn add(&self, path: PathBuf) -> BootResult<()> {
        if !self.is_addable() {
            return Err(BootError::NamespaceSealed(self.name.clone()));
        }
        let mut paths = self
            .paths
            .write()
            .map_err(|_| BootError::Internal(format!("namespace {} poisoned", self.name)))?;
        if !paths.contains(&path) {
            debug!("Added {} to namespace {}", path.display(), self.name);
            paths.push(path);
        }
        Ok(())
    }

    /// Artifacts held directly by this namespace
    pub fn own_paths(&self) -> Vec<PathBuf> {
        self.paths.read().map(|p| p.clone()).unwrap_or_default()
    }

    /// Every artifact visible from here, ancestors first
    pub fn visible_paths(&self) -> Vec<PathBuf> {
        let mut all = match &self.parent {
            Some(parent) => parent.visible_paths(),
            None => Vec::new(),
        };
        all.extend(self.own_paths());
        dedup(all)
    }

    /// Whether an artifact is visible from here
    pub fn contains(&self, path: &Path) -> bool {
        self.visible_paths().iter().any(|p| p == path)
    }
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn child_sees_parent_not_vice_versa() {
        let root = Namespace::root("app", vec![p("/lib/boot.jar")]);
        let child = root.child("core", vec![p("/lib/core.jar")]);

        assert!(child.contains(&p("/lib/boot.jar")));
        assert!(child.contains(&p("/lib/core.jar")));
        assert!(!root.contains(&p("/lib/core.jar")));
        assert_eq!(
            child.visible_paths(),
            vec![p("/lib/boot.jar"), p("/lib/core.jar")]
        );
    }

    #[test]
    fn additions_to_child_stay_invisible_to_parent() {
        let root = Namespace::root("app", vec![]);
        let child = root.child("core", vec![]);
        child.make_addable().unwrap();
        child.add(p("/late.jar")).unwrap();

        assert!(child.contains(&p("/late.jar")));
        assert!(!root.contains(&p("/late.jar")));
    }

    #[test]
    fn fixed_child_rejects_additions() {
        let child = Namespace::root("app", vec![]).child("core", vec![]);
        assert!(matches!(
            child.add(p("/x.jar")),
            Err(BootError::NamespaceSealed(_))
        ));
    }

    #[test]
    fn seal_is_one_shot() {
        let root = Namespace::root("app", vec![]);
        root.add(p("/x.jar")).unwrap();
        root.seal();
        root.seal();

        assert!(root.is_sealed());
        assert!(root.add(p("/y.jar")).is_err());
        assert!(root.make_addable().is_err());
        assert_eq!(root.own_paths(), vec![p("/x.jar")]);
    }

    #[test]
    fn duplicates_collapse_in_order() {
        let root = Namespace::root("app", vec![p("/a"), p("/b"), p("/a")]);
        root.add(p("/b")).unwrap();
        assert_eq!(root.own_paths(), vec![p("/a"), p("/b")]);
    }

    #[test]
    fn root_of_walks_chain() {
        let root = Namespace::root("app", vec![]);
        let grandchild = root.child("core", vec![]).child("inner", vec![]);
        assert_eq!(grandchild.root_of().name(), "app");
    }
}
