//! The external-dependency cache: a JSON map from destination path to a
//! per-kind fingerprint, used to decide whether a dependency needs
//! re-fetching and to detect orphaned checkouts (spec §4.3, §6).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CACHE_FILE_NAME: &str = ".crucible-external-cache.json";

/// Git cache entry: last-commit-hash, last-branch, requested-commit,
/// requested-branch, requested-tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitCacheEntry {
    pub lc: Option<String>,
    pub lb: Option<String>,
    pub c: Option<String>,
    pub b: Option<String>,
    pub t: Option<String>,
}

/// Archive cache entry: url hash, source url, subdirectory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveCacheEntry {
    pub h: String,
    pub u: String,
    pub s: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CacheEntry {
    // Archive first: its `h`/`u` fields are required, so a git-shaped
    // entry (all fields optional) correctly falls through to `Git` below
    // instead of silently matching here with everything defaulted.
    Archive(ArchiveCacheEntry),
    Git(GitCacheEntry),
}

/// The persisted cache, keyed by destination path (as a string so it
/// round-trips through JSON object keys).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalDependencyCache {
    #[serde(flatten)]
    entries: BTreeMap<String, CacheEntry>,
}

impl ExternalDependencyCache {
    pub fn load(external_dir: &Path) -> Result<Self> {
        let path = Self::path(external_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save(&self, external_dir: &Path) -> Result<()> {
        let path = Self::path(external_dir);
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn path(external_dir: &Path) -> PathBuf {
        external_dir.join(CACHE_FILE_NAME)
    }

    pub fn get(&self, destination: &Path) -> Option<&CacheEntry> {
        self.entries.get(&key_for(destination))
    }

    pub fn set(&mut self, destination: &Path, entry: CacheEntry) {
        self.entries.insert(key_for(destination), entry);
    }

    pub fn remove(&mut self, destination: &Path) {
        self.entries.remove(&key_for(destination));
    }

    pub fn known_destinations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn key_for(destination: &Path) -> String {
    destination.to_string_lossy().into_owned()
}
