//! Result cache: skips files unchanged since their last clean run.

use crate::config::ModuleConfig;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key holding the hash of the active configuration.
pub const CONFIG_HASH_KEY: &str = "configuration*?";

/// Prefix of keys holding the hash of an external resource.
pub const EXTERNAL_RESOURCE_KEY_PREFIX: &str = "module-resource*?:";

/// Cache consulted and updated by the checker.
pub trait ResultCache: Send {
    /// Returns true if `path` was recorded with exactly this timestamp.
    fn is_unchanged(&self, path: &Path, timestamp: u64) -> bool;

    /// Records a clean run of `path`.
    fn record(&mut self, path: &Path, timestamp: u64);

    /// Forgets `path`.
    fn invalidate(&mut self, path: &Path);

    /// Forgets every file.
    fn reset(&mut self);

    /// Hashes the given resources and resets the cache if any of them is new
    /// or changed.
    fn put_external_resources(&mut self, locations: &BTreeSet<String>);

    /// Writes the cache to its backing store.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the store cannot be written.
    fn persist(&self) -> Result<(), CacheError>;
}

/// Errors reading or writing a cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// IO error on the cache file.
    #[error("Failed to access cache file {path}: {source}")]
    Io {
        /// Cache file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The cache file is not valid JSON.
    #[error("Failed to parse cache file {path}: {source}")]
    Parse {
        /// Cache file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// JSON-backed cache keyed by file path.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
    config_hash: String,
    entries: BTreeMap<String, String>,
}

impl FileCache {
    /// Loads the cache at `path` for `config`.
    ///
    /// A missing file starts empty. A file written for another configuration
    /// is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>, config: &ModuleConfig) -> Result<Self, CacheError> {
        let path = path.into();
        let mut cache = Self {
            config_hash: config.hash(),
            entries: BTreeMap::new(),
            path,
        };
        if cache.path.exists() {
            let content = std::fs::read_to_string(&cache.path).map_err(|e| CacheError::Io {
                path: cache.path.clone(),
                source: e,
            })?;
            cache.entries = serde_json::from_str(&content).map_err(|e| CacheError::Parse {
                path: cache.path.clone(),
                source: e,
            })?;
            if cache.entries.get(CONFIG_HASH_KEY) != Some(&cache.config_hash) {
                debug!(path = %cache.path.display(), "configuration changed, clearing cache");
                cache.reset();
            }
        } else {
            cache.reset();
        }
        Ok(cache)
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries, reserved keys included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entry at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Hash of a resource's content, or of the read error when it is unreadable.
fn resource_hash(location: &str) -> String {
    match std::fs::read(location) {
        Ok(content) => sha256_hex(&content),
        Err(e) => sha256_hex(format!("{}: {e}", e.kind()).as_bytes()),
    }
}

impl ResultCache for FileCache {
    fn is_unchanged(&self, path: &Path, timestamp: u64) -> bool {
        self.entries.get(&Self::key(path)) == Some(&timestamp.to_string())
    }

    fn record(&mut self, path: &Path, timestamp: u64) {
        self.entries.insert(Self::key(path), timestamp.to_string());
    }

    fn invalidate(&mut self, path: &Path) {
        self.entries.remove(&Self::key(path));
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.entries.insert(CONFIG_HASH_KEY.to_string(), self.config_hash.clone());
    }

    fn put_external_resources(&mut self, locations: &BTreeSet<String>) {
        let resources: Vec<(String, String)> = locations
            .iter()
            .map(|loc| (format!("{EXTERNAL_RESOURCE_KEY_PREFIX}{loc}"), resource_hash(loc)))
            .collect();
        let changed = resources
            .iter()
            .any(|(key, hash)| self.entries.get(key) != Some(hash));
        if changed {
            debug!(count = resources.len(), "external resources changed, clearing cache");
            self.reset();
            self.entries.extend(resources);
        }
    }

    fn persist(&self) -> Result<(), CacheError> {
        let io_error = |e: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source: e,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| CacheError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(io_error)
    }
}
