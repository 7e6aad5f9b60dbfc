//! Reconciliation and projection engine for the cognitive asset manager
//!
//! This crate keeps one canonical store of reusable assets (skills, agents,
//! prompts, workflows, tools) in step with a persisted manifest, and projects
//! the result into each connected AI tool's directory layout:
//!
//! - **Scanner**: derives a content-addressed view of the store
//! - **Manifest**: persisted record of installed assets and per-provider sync state
//! - **Reconciler**: pure diff of scanned assets against the manifest
//! - **Projector**: symlinks or copies assets into provider trees and classifies entries
//! - **SyncEngine**: runs scan, reconcile, persist and project in one pass
//! - **Doctor / Cleaner**: diagnostics, repairs and cleanup on top of the above
//!
//! # Architecture
//!
//! ```text
//!            cog-cli
//!               |
//!           cog-core
//!               |
//!            cog-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cog_core::{Project, SyncEngine, SyncOptions};
//!
//! let project = Project::discover(&std::env::current_dir()?)?;
//! let report = SyncEngine::new(&project).sync(&SyncOptions::default())?;
//! assert!(report.success);
//! ```

pub mod asset;
pub mod cleaner;
pub mod config;
pub mod doctor;
pub mod error;
pub mod manifest;
pub mod metadata;
pub mod project;
pub mod projector;
pub mod reconcile;
pub mod registry;
pub mod scanner;
pub mod sync;

pub use asset::{AssetType, ScannedAsset};
pub use cleaner::{CleanOptions, CleanReport, Cleaner};
pub use cog_fs::LinkMethod;
pub use config::{ProjectConfig, ProviderConfig, ProviderTarget, RegistryConfig};
pub use doctor::{CheckId, CheckResult, CheckStatus, DiagnosisReport, Doctor, FixReport};
pub use error::{Error, Result};
pub use manifest::{
    AssetSource, Manifest, ManifestAsset, ManifestStatus, ManifestStore, ProviderSyncState,
};
pub use metadata::{MetaValue, Metadata};
pub use project::Project;
pub use projector::{
    LinkInfo, LinkProjector, LinkStatus, ProjectOptions, ProviderCleanResult, ProviderSyncResult,
    ProviderVerification,
};
pub use reconcile::{LegacyHashPolicy, ReconcileResult, apply_reconciliation, reconcile};
pub use registry::{CachedRegistry, HttpRegistry, RegistryClient, RegistryEntry};
pub use scanner::{ScanFilter, ScanReport, Scanner, scan};
pub use sync::{ProviderStatus, SyncEngine, SyncOptions, SyncReport, SyncStatus};
