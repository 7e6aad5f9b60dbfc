//! Report types for sync and status

use crate::projector::ProviderSyncResult;
use crate::reconcile::ReconcileResult;
use chrono::{DateTime, Utc};
use cog_fs::LinkMethod;
use serde::{Deserialize, Serialize};

/// Report from a sync run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Whether every step completed without per-item errors
    pub success: bool,
    pub dry_run: bool,
    /// Number of assets found by the scan
    pub scanned: usize,
    /// Changes applied to (or planned for) the manifest
    pub reconcile: ReconcileResult,
    pub providers: Vec<ProviderSyncResult>,
    /// Per-item errors outside projection (scan problems)
    pub errors: Vec<String>,
    /// Advisory conditions, e.g. no provider enabled
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub(crate) fn finish(mut self) -> Self {
        self.success = self.errors.is_empty() && self.providers.iter().all(|p| p.success());
        self
    }

    /// Total errors across the scan and every provider.
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.providers.iter().map(|p| p.errors.len()).sum::<usize>()
    }
}

/// Link health of one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<LinkMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    pub valid: usize,
    pub broken: usize,
    pub orphaned: usize,
    pub missing: usize,
    /// Set when the provider could not be resolved from config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderStatus {
    pub fn is_healthy(&self) -> bool {
        self.error.is_none() && self.broken == 0 && self.orphaned == 0 && self.missing == 0
    }
}

/// Read-only view of pending manifest changes and link health
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub in_sync: bool,
    pub pending: ReconcileResult,
    pub providers: Vec<ProviderStatus>,
}
