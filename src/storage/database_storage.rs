use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::PhotoRecord;

// Internal row mapping for photos to avoid manual try_get
#[derive(Debug, sqlx::FromRow)]
struct PhotoRow {
    id: String,
    data: String,
    timestamp: i64,
    expiry_date: i64,
}

impl PhotoRow {
    fn into_record(self) -> Result<PhotoRecord, StorageError> {
        let timestamp = DateTime::from_timestamp_millis(self.timestamp).ok_or_else(|| {
            error!("Invalid capture timestamp {} for photo {}", self.timestamp, self.id);
            StorageError::Unavailable
        })?;
        let expiry_date = DateTime::from_timestamp_millis(self.expiry_date).ok_or_else(|| {
            error!("Invalid expiry instant {} for photo {}", self.expiry_date, self.id);
            StorageError::Unavailable
        })?;
        Ok(PhotoRecord {
            id: self.id,
            data: self.data,
            timestamp,
            expiry_date,
        })
    }
}

/// Transactional SQLite backend.
///
/// Uniqueness of record ids is enforced by the primary key; the index on
/// `expiry_date` keeps the sweep scan cheap as the store grows.
pub struct DatabaseStorage {
    pool: Pool<Sqlite>,
}

impl DatabaseStorage {
    /// Default database filename inside the storage directory
    const DEFAULT_DB_FILE: &'static str = "ephemera.sqlite3";

    /// Create or open the database using `EPHEMERA_STORAGE_DIR` if set,
    /// otherwise the current working directory.
    pub async fn new_default() -> Result<Self, StorageError> {
        let dir = match env::var("EPHEMERA_STORAGE_DIR") {
            Ok(dir) => {
                info!("Using database storage from EPHEMERA_STORAGE_DIR: {}", dir);
                PathBuf::from(dir)
            }
            Err(_) => env::current_dir().map_err(|e| {
                error!("Failed to get current dir: {}", e);
                StorageError::Unavailable
            })?,
        };
        Self::new_in_dir(dir).await
    }

    /// Create or open the database under the given storage directory with
    /// the default filename.
    pub async fn new_in_dir<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        Self::new_file(dir.as_ref().join(Self::DEFAULT_DB_FILE)).await
    }

    pub async fn new_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create storage dir {}: {}", parent.display(), e);
                StorageError::Unavailable
            })?;
        }
        let opts = SqliteConnectOptions::from_str("sqlite://")
            .map_err(|_| StorageError::Unavailable)?
            .filename(path_ref)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| {
                error!("Failed to open database {}: {}", path_ref.display(), e);
                StorageError::Unavailable
            })?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS photos (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                expiry_date INTEGER NOT NULL
            );",
        )
        .execute(&pool)
        .await
        .map_err(map_sqlx_error)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_expiry ON photos(expiry_date);")
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
        info!("Database storage ready at {}", path_ref.display());
        Ok(Self { pool })
    }
}

/// Translate a backend error into the normalized taxonomy. Callers above
/// the store never see sqlx error shapes.
fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return StorageError::DuplicateId;
        }
        // SQLITE_FULL (primary result code 13)
        if db.code().as_deref() == Some("13") || db.message().contains("disk is full") {
            return StorageError::QuotaExceeded;
        }
    }
    error!("Database error: {}", err);
    StorageError::Unavailable
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn add_photo(&self, photo: &PhotoRecord) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO photos (id, data, timestamp, expiry_date) VALUES (?1, ?2, ?3, ?4)")
            .bind(&photo.id)
            .bind(&photo.data)
            .bind(photo.timestamp.timestamp_millis())
            .bind(photo.expiry_date.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("Saved photo {}", photo.id);
        Ok(())
    }

    async fn get_photos(&self) -> Result<Vec<PhotoRecord>, StorageError> {
        let rows: Vec<PhotoRow> =
            sqlx::query_as("SELECT id, data, timestamp, expiry_date FROM photos")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.into_record()?);
        }
        Ok(out)
    }

    async fn delete_photo(&self, id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM photos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            // Already gone: a sweep and a user delete can race on the same id.
            debug!("Delete of missing photo {} treated as success", id);
        }
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = now.timestamp_millis();
        let expired: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM photos WHERE expiry_date <= ?1")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        let mut removed = 0usize;
        for (id,) in expired {
            match sqlx::query("DELETE FROM photos WHERE id = ?1")
                .bind(&id)
                .execute(&self.pool)
                .await
            {
                Ok(result) => removed += result.rows_affected() as usize,
                Err(e) => error!("Failed to delete expired photo {}: {}", id, e),
            }
        }
        if removed > 0 {
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
    use tempfile::TempDir;

    async fn temp_db() -> (TempDir, DatabaseStorage) {
        let dir = TempDir::new().unwrap();
        let storage = DatabaseStorage::new_file(dir.path().join("test.sqlite3"))
            .await
            .unwrap();
        (dir, storage)
    }

    fn photo_at(taken: DateTime<Utc>, ttl: Duration) -> PhotoRecord {
        PhotoRecord::new(encode_data_url("image/jpeg", b"pixels"), taken, taken + ttl)
    }

    #[tokio::test]
    async fn test_add_and_list_photos() {
        let (_dir, storage) = temp_db().await;
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
        let (_dir, storage) = temp_db().await;
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let original = photo_at(now, Duration::hours(1));
        storage.add_photo(&original).await.unwrap();

        let mut imposter = photo_at(now, Duration::days(7));
        imposter.id = original.id.clone();
        let err = storage.add_photo(&imposter).await.unwrap_err();
        assert_eq!(err, StorageError::DuplicateId);

        // The stored record keeps its original field values.
        let all = storage.get_photos().await.unwrap();
        assert_eq!(all, vec![original]);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop_success() {
        let (_dir, storage) = temp_db().await;
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let kept = photo_at(now, Duration::hours(1));
        storage.add_photo(&kept).await.unwrap();
        storage.delete_photo("no-such-id").await.unwrap();
        assert_eq!(storage.get_photos().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let (_dir, storage) = temp_db().await;
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let photo = photo_at(now, Duration::hours(1));
        storage.add_photo(&photo).await.unwrap();
        storage.delete_photo(&photo.id).await.unwrap();
        assert!(storage.get_photos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_durably() {
        let (_dir, storage) = temp_db().await;
        let taken = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let expired = photo_at(taken, Duration::hours(1));
        let alive = photo_at(taken, Duration::days(1));
        storage.add_photo(&expired).await.unwrap();
        storage.add_photo(&alive).await.unwrap();

        let now = taken + Duration::hours(2);
        let removed = storage.sweep_expired(now).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(storage.get_photos().await.unwrap(), vec![alive.clone()]);

        // Durable: a second sweep and listing see the same state.
        assert_eq!(storage.sweep_expired(now).await.unwrap(), 0);
        assert_eq!(storage.get_photos().await.unwrap(), vec![alive]);
    }

    #[tokio::test]
    async fn test_sweep_boundary_is_inclusive() {
        let (_dir, storage) = temp_db().await;
        let taken = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let photo = photo_at(taken, Duration::hours(1));
        storage.add_photo(&photo).await.unwrap();

        // One millisecond before expiry nothing happens.
        let removed = storage
            .sweep_expired(photo.expiry_date - Duration::milliseconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        // Exactly at expiry the record goes.
        let removed = storage.sweep_expired(photo.expiry_date).await.unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.sqlite3");
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let photo = photo_at(now, Duration::days(1));
        {
            let storage = DatabaseStorage::new_file(&path).await.unwrap();
            storage.add_photo(&photo).await.unwrap();
        }
        let reopened = DatabaseStorage::new_file(&path).await.unwrap();
        assert_eq!(reopened.get_photos().await.unwrap(), vec![photo]);
    }
}
