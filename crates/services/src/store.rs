use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use sawtfeel_models::{FileKind, ProcessingStatus, StoredFileMeta};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

const METADATA_FILE: &str = "file_metadata.json";
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Owns the upload directory and the per-file metadata map. The map is
/// persisted to `file_metadata.json` on every mutation so completed files
/// survive a restart; entries whose backing file vanished are dropped on
/// first access.
pub struct FileStore {
    upload_dir: PathBuf,
    retention: Duration,
    inner: Mutex<HashMap<String, StoredFileMeta>>,
}

impl FileStore {
    pub async fn open(
        upload_dir: impl Into<PathBuf>,
        retention_hours: u64,
    ) -> anyhow::Result<Self> {
        let upload_dir = upload_dir.into();
        tokio::fs::create_dir_all(&upload_dir).await?;

        let metadata_path = upload_dir.join(METADATA_FILE);
        let map = match tokio::fs::read(&metadata_path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(%e, "Unreadable file metadata, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        info!(
            upload_dir = %upload_dir.display(),
            entries = map.len(),
            "File store opened"
        );

        Ok(Self {
            upload_dir,
            retention: Duration::hours(retention_hours as i64),
            inner: Mutex::new(map),
        })
    }

    /// Stores uploaded bytes under a sanitized name and records metadata.
    /// Returns a new unique file id.
    pub async fn store(
        &self,
        filename: &str,
        file_type: FileKind,
        format: &str,
        content: &[u8],
    ) -> anyhow::Result<String> {
        let file_id = Uuid::new_v4().to_string();
        let safe_name = safe_filename(filename, &file_id);
        let path = self.upload_dir.join(&safe_name);

        tokio::fs::write(&path, content).await?;

        let now = Utc::now();
        let meta = StoredFileMeta {
            original_filename: filename.to_string(),
            stored_path: path.to_string_lossy().to_string(),
            file_hash: hex::encode(Sha256::digest(content)),
            file_size: content.len() as u64,
            file_type,
            format: format.to_string(),
            upload_time: now,
            expires_at: now + self.retention,
            status: ProcessingStatus::Uploaded,
        };

        {
            let mut map = self.inner.lock().await;
            map.insert(file_id.clone(), meta);
            self.persist(&map).await;
        }

        info!(%file_id, filename, bytes = content.len(), "Stored uploaded file");
        Ok(file_id)
    }

    /// Metadata for a file, dropping the record when the file is gone
    /// from disk.
    pub async fn get(&self, file_id: &str) -> Option<StoredFileMeta> {
        let mut map = self.inner.lock().await;
        let meta = map.get(file_id)?.clone();
        if tokio::fs::try_exists(&meta.stored_path).await.unwrap_or(false) {
            Some(meta)
        } else {
            warn!(%file_id, path = %meta.stored_path, "File missing on disk, dropping stale metadata");
            map.remove(file_id);
            self.persist(&map).await;
            None
        }
    }

    pub async fn file_path(&self, file_id: &str) -> Option<PathBuf> {
        self.get(file_id).await.map(|m| PathBuf::from(m.stored_path))
    }

    pub async fn set_status(&self, file_id: &str, status: ProcessingStatus) {
        let mut map = self.inner.lock().await;
        if let Some(meta) = map.get_mut(file_id) {
            meta.status = status;
            self.persist(&map).await;
        }
    }

    pub async fn known_ids(&self) -> HashSet<String> {
        self.inner.lock().await.keys().cloned().collect()
    }

    /// All records, newest upload first.
    pub async fn list(&self) -> Vec<(String, StoredFileMeta)> {
        let map = self.inner.lock().await;
        let mut entries: Vec<(String, StoredFileMeta)> =
            map.iter().map(|(id, m)| (id.clone(), m.clone())).collect();
        entries.sort_by(|a, b| b.1.upload_time.cmp(&a.1.upload_time));
        entries
    }

    /// Removes the stored file and its metadata. Returns true if a record
    /// existed.
    pub async fn remove(&self, file_id: &str) -> bool {
        let mut map = self.inner.lock().await;
        let Some(meta) = map.remove(file_id) else {
            return false;
        };
        self.persist(&map).await;
        drop(map);

        if let Err(e) = tokio::fs::remove_file(&meta.stored_path).await {
            // Already-gone files are fine; deletion is idempotent.
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(%file_id, %e, "Failed to remove stored file");
            }
        }
        info!(%file_id, "Removed uploaded file");
        true
    }

    /// Drops uploads past their expiry and returns the removed ids, so the
    /// caller can clear the matching cache entries.
    pub async fn remove_expired(&self) -> Vec<String> {
        let now = Utc::now();
        let expired: Vec<String> = {
            let map = self.inner.lock().await;
            map.iter()
                .filter(|(_, meta)| now > meta.expires_at)
                .map(|(id, _)| id.clone())
                .collect()
        };

        for file_id in &expired {
            self.remove(file_id).await;
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Removed expired uploads");
        }
        expired
    }

    /// Recomputes the stored file's hash and compares with the recorded one.
    pub async fn verify_integrity(&self, file_id: &str) -> bool {
        let Some(meta) = self.get(file_id).await else {
            return false;
        };
        match tokio::fs::read(&meta.stored_path).await {
            Ok(content) => hex::encode(Sha256::digest(&content)) == meta.file_hash,
            Err(_) => false,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    async fn persist(&self, map: &HashMap<String, StoredFileMeta>) {
        let path = self.upload_dir.join(METADATA_FILE);
        let tmp = self.upload_dir.join(format!(".{METADATA_FILE}.tmp"));
        let bytes = match serde_json::to_vec_pretty(map) {
            Ok(b) => b,
            Err(e) => {
                error!(%e, "Failed to serialize file metadata");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            error!(%e, "Failed to write file metadata");
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            error!(%e, "Failed to replace file metadata");
        }
    }
}

/// `{file_id}_{stem truncated to 50 chars}{ext}` with shell-unsafe
/// characters replaced.
fn safe_filename(original: &str, file_id: &str) -> String {
    let path = Path::new(original);
    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().chars().take(50).collect())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    format!("{file_id}_{stem}{ext}")
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 24).await.unwrap();

        let id = store
            .store("clip.wav", FileKind::Audio, "WAV", b"RIFFdata")
            .await
            .unwrap();

        let meta = store.get(&id).await.unwrap();
        assert_eq!(meta.original_filename, "clip.wav");
        assert_eq!(meta.file_size, 8);
        assert_eq!(meta.status, ProcessingStatus::Uploaded);
        assert!(store.verify_integrity(&id).await);
        assert!(store.file_path(&id).await.unwrap().exists());
    }

    #[tokio::test]
    async fn metadata_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FileStore::open(dir.path(), 24).await.unwrap();
            store
                .store("a.mp3", FileKind::Audio, "MP3", b"bytes")
                .await
                .unwrap()
        };

        let reopened = FileStore::open(dir.path(), 24).await.unwrap();
        assert!(reopened.get(&id).await.is_some());
    }

    #[tokio::test]
    async fn stale_entry_dropped_when_file_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 24).await.unwrap();

        let id = store
            .store("b.wav", FileKind::Audio, "WAV", b"bytes")
            .await
            .unwrap();
        let path = store.file_path(&id).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(store.get(&id).await.is_none());
        assert!(!store.known_ids().await.contains(&id));
    }

    #[tokio::test]
    async fn expired_uploads_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 0).await.unwrap();

        let id = store
            .store("c.wav", FileKind::Audio, "WAV", b"bytes")
            .await
            .unwrap();

        let removed = store.remove_expired().await;
        assert_eq!(removed, vec![id.clone()]);
        assert!(store.get(&id).await.is_none());
    }

    #[test]
    fn filenames_are_sanitized() {
        let name = safe_filename("weird:na/me?.WAV", "abc");
        assert!(!name.contains(':'));
        assert!(!name.contains('/'));
        assert!(!name.contains('?'));
        assert!(name.starts_with("abc_"));
        assert!(name.ends_with(".wav"));
    }
}
