//! Persistent dependency cache
//!
//! Resolving the tool's dependencies is slow, so the result is recorded on disk
//! and reused across invocations.
//!
//! # Entry States
//!
//! | State | Condition | Action |
//! |-------|-----------|--------|
//! | Missing | no cache file | rebuild |
//! | Stale | older than 18 hours | rebuild |
//! | Invalid | unreadable, incomplete, or an artifact vanished or changed | rebuild |
//! | Valid | everything else | reuse |
//!
//! Rebuilds always replace all three artifact sets at once.

pub mod deps;
pub mod lock;

pub use deps::{default_ttl, repo_id, ArtifactSets, CacheKey, DependencyCache, CACHE_FILE};
pub use lock::LockedFile;
