//! On-disk response cache.
//!
//! One JSON record per fingerprint, where the fingerprint is a truncated
//! SHA-256 over the exact prompt text and model identifier. Entries expire
//! 24 hours after creation; expiry is lazy (detected and cleaned up on the
//! next lookup). The cache is an optimization only: every failure to read,
//! decode, or write a record is treated as a miss by callers.
//!
//! Concurrent writers to the same fingerprint overwrite each other, which is
//! fine: identical fingerprints mean identical requests, so the content is
//! equivalent and last-write-wins needs no locking.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Wall-clock lifetime of a cache entry.
pub const CACHE_TTL_HOURS: i64 = 24;

/// A cache read or write that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache record decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The persisted record for one fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
}

/// Content-addressable store of generation results under one directory.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic key for a (prompt, model) pair: hex SHA-256, truncated
    /// to 16 characters. Not security-relevant; collisions are negligible at
    /// this scale.
    pub fn fingerprint(prompt: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        hasher.update(model.as_bytes());
        let digest = hasher.finalize();
        let hex = format!("{digest:x}");
        hex[..16].to_string()
    }

    /// Look up cached content for a request. Expired entries are removed and
    /// reported as a miss; so is any record that cannot be read or decoded.
    pub fn get(&self, prompt: &str, model: &str) -> Option<String> {
        let path = self.entry_path(&Self::fingerprint(prompt, model));

        let record = match read_record(&path) {
            Ok(record) => record,
            Err(_) => return None,
        };

        if Utc::now() - record.created_at > Duration::hours(CACHE_TTL_HOURS) {
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(record.content)
    }

    /// Store content for a request, stamped now.
    pub fn set(&self, prompt: &str, model: &str, content: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;

        let record = CacheRecord {
            content: content.to_string(),
            created_at: Utc::now(),
            model: model.to_string(),
        };
        let path = self.entry_path(&Self::fingerprint(prompt, model));
        fs::write(&path, serde_json::to_vec(&record)?)?;

        Ok(())
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }
}

fn read_record(path: &Path) -> Result<CacheRecord, CacheError> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}
