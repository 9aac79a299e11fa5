//! Flat-file backend: the entire record set lives in a single serialized
//! JSON blob, rewritten wholesale on every mutation.
//!
//! Known limitation: unlike the database backend there is no transactional
//! atomicity across concurrent writers, so this backend is only valid for
//! single-writer-at-a-time deployments. Within one process the blob rewrite
//! is serialized behind a lock and performed as write-temp-then-rename, so
//! a crash never exposes a partially-written record set.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::PhotoRecord;

pub struct FileStorage {
    blob_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Default blob filename inside the storage directory
    const DEFAULT_BLOB_FILE: &'static str = "photos.json";

    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| {
            error!("Failed to create storage dir {}: {}", base_path.display(), e);
            map_io_error(&e)
        })?;
        info!("File storage initialized at {}", base_path.display());
        Ok(Self {
            blob_path: base_path.join(Self::DEFAULT_BLOB_FILE),
            write_lock: Mutex::new(()),
        })
    }

    /// Construct FileStorage using env var EPHEMERA_STORAGE_DIR if set,
    /// otherwise the current directory.
    pub fn new_default() -> Result<Self, StorageError> {
        if let Ok(dir) = env::var("EPHEMERA_STORAGE_DIR") {
            info!("Using file storage from EPHEMERA_STORAGE_DIR: {}", dir);
            return Self::new(PathBuf::from(dir));
        }
        let cwd = env::current_dir().map_err(|e| {
            error!("Failed to get current dir: {}", e);
            StorageError::Unavailable
        })?;
        Self::new(cwd)
    }

    fn load_records(&self) -> Result<Vec<PhotoRecord>, StorageError> {
        let bytes = match fs::read(&self.blob_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                error!("Failed to read {}: {}", self.blob_path.display(), e);
                return Err(map_io_error(&e));
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            error!("Corrupt photo blob {}: {}", self.blob_path.display(), e);
            StorageError::Unavailable
        })
    }

    /// Rewrite the whole blob. The rename makes the swap atomic: readers
    /// observe either the previous record set or the new one.
    fn store_records(&self, records: &[PhotoRecord]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(records).map_err(|e| {
            error!("Failed to serialize photo blob: {}", e);
            StorageError::Unavailable
        })?;
        let tmp_path = self.blob_path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| {
            error!("Failed to write {}: {}", tmp_path.display(), e);
            map_io_error(&e)
        })?;
        fs::rename(&tmp_path, &self.blob_path).map_err(|e| {
            error!("Failed to replace {}: {}", self.blob_path.display(), e);
            map_io_error(&e)
        })
    }
}

/// Translate an IO error into the normalized taxonomy.
fn map_io_error(err: &io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => StorageError::QuotaExceeded,
        _ => StorageError::Unavailable,
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn add_photo(&self, photo: &PhotoRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.load_records()?;
        if records.iter().any(|r| r.id == photo.id) {
            return Err(StorageError::DuplicateId);
        }
        records.push(photo.clone());
        self.store_records(&records)?;
        debug!("Saved photo {} ({} record(s) total)", photo.id, records.len());
        Ok(())
    }

    async fn get_photos(&self) -> Result<Vec<PhotoRecord>, StorageError> {
        self.load_records()
    }

    async fn delete_photo(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.load_records()?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            // Already gone: a sweep and a user delete can race on the same id.
            debug!("Delete of missing photo {} treated as success", id);
            return Ok(());
        }
        self.store_records(&records)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let records = self.load_records()?;
        let before = records.len();
        let kept: Vec<PhotoRecord> = records.into_iter().filter(|r| !r.is_expired(now)).collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.store_records(&kept)?;
            info!("Swept {} expired photo(s) (cutoff: {})", removed, now.to_rfc3339());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::encode_data_url;
    use chrono::{Duration, TimeZone};
    use serial_test::serial;
    use tempfile::TempDir;

    fn photo_at(taken: DateTime<Utc>, ttl: Duration) -> PhotoRecord {
        PhotoRecord::new(encode_data_url("image/png", b"pixels"), taken, taken + ttl)
    }

    #[tokio::test]
    async fn test_add_and_list_photos() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let p1 = photo_at(now, Duration::hours(1));
        let p2 = photo_at(now, Duration::days(1));
        storage.add_photo(&p1).await.unwrap();
        storage.add_photo(&p2).await.unwrap();
        let all = storage.get_photos().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&p1));
        assert!(all.contains(&p2));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let original = photo_at(now, Duration::hours(1));
        storage.add_photo(&original).await.unwrap();

        let mut imposter = photo_at(now, Duration::days(7));
        imposter.id = original.id.clone();
        let err = storage.add_photo(&imposter).await.unwrap_err();
        assert_eq!(err, StorageError::DuplicateId);
        assert_eq!(storage.get_photos().await.unwrap(), vec![original]);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop_success() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let kept = photo_at(now, Duration::hours(1));
        storage.add_photo(&kept).await.unwrap();
        storage.delete_photo("no-such-id").await.unwrap();
        assert_eq!(storage.get_photos().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_durably() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let taken = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let expired = photo_at(taken, Duration::hours(1));
        let alive = photo_at(taken, Duration::days(1));
        storage.add_photo(&expired).await.unwrap();
        storage.add_photo(&alive).await.unwrap();

        let now = taken + Duration::hours(2);
        assert_eq!(storage.sweep_expired(now).await.unwrap(), 1);
        assert_eq!(storage.get_photos().await.unwrap(), vec![alive.clone()]);
        assert_eq!(storage.sweep_expired(now).await.unwrap(), 0);
        assert_eq!(storage.get_photos().await.unwrap(), vec![alive]);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let photo = photo_at(now, Duration::days(1));
        {
            let storage = FileStorage::new(dir.path()).unwrap();
            storage.add_photo(&photo).await.unwrap();
        }
        let reopened = FileStorage::new(dir.path()).unwrap();
        assert_eq!(reopened.get_photos().await.unwrap(), vec![photo]);
    }

    #[tokio::test]
    async fn test_blob_on_disk_matches_wire_contract() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let photo = photo_at(now, Duration::hours(1));
        storage.add_photo(&photo).await.unwrap();

        let bytes = fs::read(dir.path().join("photos.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let entry = &value.as_array().unwrap()[0];
        assert_eq!(entry["id"], serde_json::Value::String(photo.id.clone()));
        assert_eq!(entry["timestamp"].as_i64().unwrap(), photo.timestamp.timestamp_millis());
        assert_eq!(entry["expiryDate"].as_i64().unwrap(), photo.expiry_date.timestamp_millis());
    }

    #[tokio::test]
    #[serial]
    async fn test_new_default_honors_env_dir() {
        let dir = TempDir::new().unwrap();
        env::set_var("EPHEMERA_STORAGE_DIR", dir.path());
        let storage = FileStorage::new_default().unwrap();
        env::remove_var("EPHEMERA_STORAGE_DIR");

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        storage.add_photo(&photo_at(now, Duration::hours(1))).await.unwrap();
        assert!(dir.path().join("photos.json").exists());
    }
}
