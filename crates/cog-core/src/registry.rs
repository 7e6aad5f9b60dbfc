//! Remote registry client
//!
//! The registry is the only asynchronous boundary in the engine. The
//! [`RegistryClient`] trait is what the rest of the crate depends on;
//! [`HttpRegistry`] is a thin reqwest implementation over a static
//! `index.json`, and [`CachedRegistry`] keeps the index in memory for a TTL.

use crate::asset::AssetType;
use crate::config::RegistryConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Request timeout for registry calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const INDEX_FILE: &str = "index.json";

fn default_category() -> String {
    "general".to_string()
}

/// One asset published in the registry index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    #[serde(default = "default_category")]
    pub category: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub download_url: String,
}

/// The registry's `index.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryIndex {
    #[serde(default)]
    pub assets: Vec<RegistryEntry>,
}

/// Interface to a remote asset registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Look up a single asset by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.list().await?.into_iter().find(|e| e.name == name))
    }

    /// Fetch the archive or file behind an entry.
    async fn download(&self, entry: &RegistryEntry) -> Result<Vec<u8>>;

    /// Every asset the registry publishes.
    async fn list(&self) -> Result<Vec<RegistryEntry>>;

    /// Check that the registry is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Registry served as static files over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, INDEX_FILE)
    }

    async fn fetch_index(&self) -> Result<RegistryIndex> {
        let index = self
            .client
            .get(self.index_url())
            .send()
            .await?
            .error_for_status()?
            .json::<RegistryIndex>()
            .await?;
        Ok(index)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistry {
    async fn download(&self, entry: &RegistryEntry) -> Result<Vec<u8>> {
        tracing::debug!(asset = %entry.name, url = %entry.download_url, "Downloading");
        let bytes = self
            .client
            .get(&entry.download_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn list(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.fetch_index().await?.assets)
    }

    async fn ping(&self) -> Result<()> {
        let response = self.client.get(self.index_url()).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Registry {
                message: format!("{} returned {}", self.index_url(), response.status()),
            })
        }
    }
}

struct CachedIndex {
    fetched_at: Instant,
    entries: Vec<RegistryEntry>,
}

/// Wraps a client and caches its index for `ttl`.
///
/// The lock is never held across an await point.
pub struct CachedRegistry<C> {
    inner: C,
    ttl: Duration,
    cache: Mutex<Option<CachedIndex>>,
}

impl<C: RegistryClient> CachedRegistry<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop the cached index so the next call refetches it.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    fn cached(&self) -> Option<Vec<RegistryEntry>> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.entries.clone())
    }

    fn store(&self, entries: &[RegistryEntry]) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedIndex {
                fetched_at: Instant::now(),
                entries: entries.to_vec(),
            });
        }
    }
}

#[async_trait]
impl<C: RegistryClient> RegistryClient for CachedRegistry<C> {
    async fn download(&self, entry: &RegistryEntry) -> Result<Vec<u8>> {
        self.inner.download(entry).await
    }

    async fn list(&self) -> Result<Vec<RegistryEntry>> {
        if let Some(entries) = self.cached() {
            tracing::debug!("Registry index served from cache");
            return Ok(entries);
        }
        let entries = self.inner.list().await?;
        self.store(&entries);
        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

/// Build the cached HTTP client described by a registry config.
pub fn from_config(config: &RegistryConfig) -> Result<CachedRegistry<HttpRegistry>> {
    Ok(CachedRegistry::new(
        HttpRegistry::new(&config.url)?,
        Duration::from_secs(config.cache_ttl_secs),
    ))
}
