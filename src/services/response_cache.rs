use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tokio::fs::{create_dir_all, read_to_string, rename, write};
use tracing::debug;

/// Identity of one provider request: the provider name, the endpoint and its
/// query parameters sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    provider: String,
    canonical: String,
}

impl CacheKey {
    pub fn new(provider: &str, url: &str, params: &[(&str, String)]) -> Self {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort();
        let query = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Self { provider: provider.to_string(), canonical: format!("{} {}?{}", provider, url, query) }
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    fn file_name(&self) -> String {
        let prefix: String = self
            .provider
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let mut hasher = Md5::new();
        hasher.update(self.canonical.as_bytes());
        let digest = hasher.finalize().iter().map(|x| format!("{:02x}", x)).collect::<String>();
        format!("{}-{}.json", prefix, digest)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    stored_at: DateTime<Utc>,
    key: String,
    body: String,
}

/// On-disk store of raw provider responses with a fixed time-to-live.
///
/// Entries are written to a temporary file and renamed into place, so a
/// concurrent reader sees either the previous entry or the complete new one.
/// Two requests missing the same key both fetch and the last write wins.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the cached body when present, fresh and stored under this exact key.
    /// Unreadable entries count as misses.
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let path = self.dir.join(key.file_name());
        let json = read_to_string(&path).await.ok()?;
        let entry: Entry = serde_json::from_str(&json).ok()?;
        if entry.key != key.canonical {
            debug!(key = key.as_str(), "cache file belongs to another key");
            return None;
        }
        let ttl = TimeDelta::from_std(self.ttl).ok()?;
        if Utc::now() - entry.stored_at > ttl {
            debug!(key = key.as_str(), stored_at = %entry.stored_at, "cache entry expired");
            return None;
        }
        Some(entry.body)
    }

    pub async fn put(&self, key: &CacheKey, body: &str) -> Result<(), std::io::Error> {
        create_dir_all(&self.dir).await?;
        let entry = Entry { stored_at: Utc::now(), key: key.canonical.clone(), body: body.to_string() };
        let json = serde_json::to_string(&entry)?;

        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        write(&tmp, json).await?;
        rename(&tmp, self.dir.join(key.file_name())).await?;
        Ok(())
    }

    /// True when an entry file exists for `key`, fresh or not.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.dir.join(key.file_name())).await.unwrap_or(false)
    }
}
