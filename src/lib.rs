//! Boot - bootstrap and pod isolation layer
//!
//! Picks the version of the build tool to run, keeps a cache of its resolved
//! dependencies, builds isolated pods from them and starts the tool inside
//! its `core` pod.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod orchestration;
pub mod pod;
pub mod resolve;
pub mod ui;
pub mod version;

pub use error::{BootError, BootResult};
