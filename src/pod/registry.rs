//! Registry of live pods
//!
//! Holds only weak references, so registering a pod never keeps it alive. A
//! handle to the registry is passed into every pod at construction time, which
//! lets code running inside a pod enumerate its siblings.

use super::{Pod, PodId};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Shared, concurrently mutable set of weakly held pods
#[derive(Clone, Default)]
pub struct PodRegistry {
    pods: Arc<DashMap<PodId, Weak<Pod>>>,
}

impl PodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pod without taking ownership of it
    pub fn register(&self, pod: &Arc<Pod>) {
        self.pods.insert(pod.id(), Arc::downgrade(pod));
        debug!(pod = %pod.name(), id = %pod.id(), "Registered pod");
    }

    /// Forget a pod
    pub fn remove(&self, id: &PodId) -> bool {
        self.pods.remove(id).is_some()
    }

    /// Live pods with the given name
    pub fn find(&self, name: &str) -> Vec<Arc<Pod>> {
        self.live()
            .into_iter()
            .filter(|pod| pod.name() == name)
            .collect()
    }

    /// Every pod still referenced outside the registry
    pub fn live(&self) -> Vec<Arc<Pod>> {
        self.prune();
        // Upgrade outside the map guards: dropping the last strong reference
        // re-enters the registry through `Pod::drop`.
        let weak: Vec<Weak<Pod>> = self.pods.iter().map(|e| e.value().clone()).collect();
        weak.iter().filter_map(Weak::upgrade).collect()
    }

    /// Drop entries whose pod has been reclaimed
    pub fn prune(&self) -> usize {
        let before = self.pods.len();
        self.pods.retain(|_, pod| pod.strong_count() > 0);
        before.saturating_sub(self.pods.len())
    }

    /// Number of registered entries, including not yet pruned ones
    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}

impl fmt::Debug for PodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodRegistry")
            .field("entries", &self.pods.len())
            .finish()
    }
}
