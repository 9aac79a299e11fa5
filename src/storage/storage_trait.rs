//! Storage Trait
//!
//! This module defines the `Storage` trait, which provides an interface for
//! photo record storage backends.
//!
//! Implementors of this trait are responsible for:
//! - Persisting photo records durably, keyed by their unique id
//! - Returning full, consistent snapshots of the stored record set
//! - Deleting records idempotently
//! - Sweeping records past their expiry instant
//!
//! All methods return a `Result` whose error type is the normalized
//! `StorageError` taxonomy; backend-specific error shapes never cross this
//! boundary.

use crate::error_handling::types::StorageError;
use crate::storage::types::PhotoRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The `Storage` trait defines the interface for photo record storage
/// backends.
///
/// The store never runs a background timer: expiry is enforced lazily,
/// pull-based, by callers invoking `sweep_expired` after each read that
/// backs a user-facing listing. This keeps the contract correct even when
/// the process was not running at the expiry instant.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persists a new photo record.
    ///
    /// Fails with `StorageError::DuplicateId` if a record with the same id
    /// is already stored, and with `StorageError::QuotaExceeded` when the
    /// backing storage is out of space.
    async fn add_photo(&self, photo: &PhotoRecord) -> Result<(), StorageError>;

    /// Returns a full, consistent snapshot of all stored records.
    ///
    /// Unordered at this layer; ordering is a presentation concern. A
    /// partially-written record is never visible.
    async fn get_photos(&self) -> Result<Vec<PhotoRecord>, StorageError>;

    /// Deletes a record by id.
    ///
    /// Deleting a nonexistent id is a no-op success: expiry sweeps and
    /// user-driven deletes can race on the same id, and the last delete
    /// wins.
    async fn delete_photo(&self, id: &str) -> Result<(), StorageError>;

    /// Deletes every record whose expiry instant is at or before `now`,
    /// returning the number removed.
    ///
    /// Each record's deletion is attempted independently; individual
    /// failures are logged and do not abort the sweep.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError>;
}
