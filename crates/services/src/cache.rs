use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Filesystem-backed key-value cache for processing artifacts, keyed by
/// `(file_id, kind)`. Entries expire a fixed retention window after they are
/// written; reads never refresh the TTL. Writes go through a temp file plus
/// rename so concurrent readers never observe a torn entry.
pub struct SegmentCache {
    cache_dir: PathBuf,
    retention: Duration,
    max_bytes: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub removed_count: usize,
    pub bytes_freed: u64,
}

impl SegmentCache {
    pub fn new(cache_dir: impl Into<PathBuf>, retention_hours: u64, max_cache_size_mb: u64) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            retention: Duration::from_secs(retention_hours * 3600),
            max_bytes: max_cache_size_mb * 1024 * 1024,
        }
    }

    fn entry_path(&self, file_id: &str, kind: &str) -> PathBuf {
        self.cache_dir.join(format!("{file_id}_{kind}.json"))
    }

    /// Path of the extracted 16kHz mono audio artifact for a file. The
    /// pipeline writes it, the playback endpoints read it; the sweep treats
    /// it like any other cache entry.
    pub fn audio_artifact_path(&self, file_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{file_id}_audio.wav"))
    }

    /// Stores a payload, overwriting any existing entry for the same key.
    pub async fn put<T: Serialize>(
        &self,
        file_id: &str,
        kind: &str,
        payload: &T,
    ) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let envelope = json!({
            "cached_at": Utc::now(),
            "file_id": file_id,
            "data_type": kind,
            "data": payload,
        });
        let bytes = serde_json::to_vec_pretty(&envelope)?;

        let path = self.entry_path(file_id, kind);
        let tmp = self
            .cache_dir
            .join(format!(".{file_id}_{kind}.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(%file_id, kind, bytes = bytes.len(), "Cached entry");
        Ok(())
    }

    /// Retrieves a payload, or None when the entry is missing, expired or
    /// unreadable. Expired entries are deleted on the way out; corrupt ones
    /// are logged and treated as a miss.
    pub async fn get(&self, file_id: &str, kind: &str) -> Option<serde_json::Value> {
        let path = self.entry_path(file_id, kind);
        let bytes = tokio::fs::read(&path).await.ok()?;

        let envelope: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!(%file_id, kind, %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        let cached_at = envelope
            .get("cached_at")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());
        let Some(cached_at) = cached_at else {
            warn!(%file_id, kind, "Cache entry missing timestamp, treating as miss");
            return None;
        };

        let age = Utc::now().signed_duration_since(cached_at);
        if age.num_seconds() >= self.retention.as_secs() as i64 {
            let _ = tokio::fs::remove_file(&path).await;
            info!(%file_id, kind, "Removed expired cache entry");
            return None;
        }

        envelope.get("data").cloned()
    }

    /// Typed variant of [`get`](Self::get); deserialization failures are a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, file_id: &str, kind: &str) -> Option<T> {
        let value = self.get(file_id, kind).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(%file_id, kind, %e, "Cache entry does not match expected shape");
                None
            }
        }
    }

    pub async fn contains(&self, file_id: &str, kind: &str) -> bool {
        self.get(file_id, kind).await.is_some()
    }

    /// Deletes every cached kind (including the audio artifact) for a file.
    pub async fn remove_all(&self, file_id: &str) -> SweepStats {
        let mut stats = SweepStats::default();
        let prefix = format!("{file_id}_");

        let Ok(mut entries) = tokio::fs::read_dir(&self.cache_dir).await else {
            return stats;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(&prefix) {
                continue;
            }
            let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            if tokio::fs::remove_file(entry.path()).await.is_ok() {
                stats.removed_count += 1;
                stats.bytes_freed += size;
            }
        }

        if stats.removed_count > 0 {
            info!(%file_id, count = stats.removed_count, "Cleared cached data");
        }
        stats
    }

    /// Periodic maintenance: drops expired entries, entries whose file id has
    /// no metadata record anymore, and then evicts oldest-by-write-time
    /// entries until the cache is under its byte budget. Safe to run while
    /// readers and writers are active; everything here is whole-file
    /// remove/rename.
    pub async fn sweep(&self, known_ids: &HashSet<String>) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut survivors: Vec<(PathBuf, u64, SystemTime)> = Vec::new();

        let Ok(mut entries) = tokio::fs::read_dir(&self.cache_dir).await else {
            return stats;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            // Stale temp files from interrupted writes age out like entries.
            let is_temp = name.ends_with(".tmp");
            let file_id = name.split('_').next().unwrap_or_default().to_string();
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let expired = modified
                .elapsed()
                .map(|age| age >= self.retention)
                .unwrap_or(false);
            let orphaned = !is_temp && !file_id.is_empty() && !known_ids.contains(&file_id);

            if expired || orphaned {
                if tokio::fs::remove_file(&path).await.is_ok() {
                    stats.removed_count += 1;
                    stats.bytes_freed += meta.len();
                    debug!(name, expired, orphaned, "Swept cache entry");
                }
            } else {
                survivors.push((path, meta.len(), modified));
            }
        }

        // Enforce the size budget, oldest writes first.
        let mut total: u64 = survivors.iter().map(|(_, size, _)| size).sum();
        if total > self.max_bytes {
            survivors.sort_by_key(|(_, _, modified)| *modified);
            for (path, size, _) in survivors {
                if total <= self.max_bytes {
                    break;
                }
                if tokio::fs::remove_file(&path).await.is_ok() {
                    total -= size;
                    stats.removed_count += 1;
                    stats.bytes_freed += size;
                }
            }
        }

        if stats.removed_count > 0 {
            info!(
                removed = stats.removed_count,
                bytes_freed = stats.bytes_freed,
                "Cache sweep completed"
            );
        }
        stats
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
