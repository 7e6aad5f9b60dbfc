//! Synchronization between the canonical store, the manifest and providers
//!
//! This module provides the [`SyncEngine`], which runs the one-shot pipeline
//! scan, reconcile, persist, project, and reports what it did. [`SyncStatus`]
//! is the read-only counterpart used by `cog sync status`.

mod engine;
mod report;

pub use engine::{SyncEngine, SyncOptions};
pub use report::{ProviderStatus, SyncReport, SyncStatus};
