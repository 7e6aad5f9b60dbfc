//! Asset kinds and the scanned-asset record
//!
//! Every asset shares the same record shape; the [`AssetType`] discriminant
//! decides the storage directory and how the primary file is located.

use crate::metadata::Metadata;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The five kinds of cognitive asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Skill,
    Agent,
    Prompt,
    Workflow,
    Tool,
}

impl AssetType {
    /// All asset types in scan order.
    pub const ALL: [AssetType; 5] = [
        AssetType::Skill,
        AssetType::Agent,
        AssetType::Prompt,
        AssetType::Workflow,
        AssetType::Tool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Skill => "skill",
            AssetType::Agent => "agent",
            AssetType::Prompt => "prompt",
            AssetType::Workflow => "workflow",
            AssetType::Tool => "tool",
        }
    }

    /// Directory name used in both the store and provider trees (`skills`, ...).
    pub fn dir_name(&self) -> &'static str {
        match self {
            AssetType::Skill => "skills",
            AssetType::Agent => "agents",
            AssetType::Prompt => "prompts",
            AssetType::Workflow => "workflows",
            AssetType::Tool => "tools",
        }
    }

    /// Conventional primary file name.
    pub fn primary_file(&self) -> &'static str {
        match self {
            AssetType::Skill => "SKILL.md",
            AssetType::Agent => "AGENT.md",
            AssetType::Prompt => "PROMPT.md",
            AssetType::Workflow => "WORKFLOW.yaml",
            AssetType::Tool => "TOOL.md",
        }
    }

    /// File extensions accepted as a fallback primary file.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            AssetType::Workflow => &["yaml", "yml"],
            _ => &["md"],
        }
    }

    /// Path of an asset's canonical directory below the store root.
    pub fn canonical_dir(&self, store_root: &Path, category: &str, name: &str) -> PathBuf {
        store_root.join(self.dir_name()).join(category).join(name)
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        AssetType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower || t.dir_name() == lower)
            .ok_or(Error::UnknownAssetType {
                value: s.to_string(),
            })
    }
}

/// An asset as found on disk. Recomputed on every scan, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedAsset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub category: String,
    /// Absolute path of the asset directory
    pub dir: PathBuf,
    /// Absolute path of the primary file
    pub primary_path: PathBuf,
    pub file_name: String,
    /// Short digest of the primary file's bytes
    pub hash: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ScannedAsset {
    pub fn description(&self) -> Option<&str> {
        self.metadata.text("description")
    }

    pub fn version(&self) -> Option<&str> {
        self.metadata.text("version")
    }
}
