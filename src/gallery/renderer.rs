use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::Storage;
use crate::storage::types::PhotoRecord;

/// A photo record paired with its human-readable remaining lifetime.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub photo: PhotoRecord,
    pub expires_in: String,
}

/// Presentation layer over the photo store: snapshots, sweeps, sorts and
/// labels records, and wires deletion/export actions back to the store.
pub struct Gallery {
    storage: Arc<dyn Storage>,
}

impl Gallery {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Load the gallery view at `now`: a snapshot with expired records
    /// dropped, newest capture first, each paired with its relative-expiry
    /// label.
    ///
    /// The expiry sweep runs on every load so a user browsing the gallery
    /// never sees an expired photo; the sweep is best-effort and its
    /// failure never hides the gallery.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Vec<GalleryEntry>, StorageError> {
        let mut photos = self.storage.get_photos().await?;
        if let Err(e) = self.storage.sweep_expired(now).await {
            warn!("Expiry sweep failed: {}", e);
        }
        photos.retain(|p| !p.is_expired(now));
        // Stable, purely presentational ordering; never persisted.
        photos.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(photos
            .into_iter()
            .map(|photo| {
                let expires_in = format_relative_expiry(photo.expiry_date, now);
                GalleryEntry { photo, expires_in }
            })
            .collect())
    }

    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.storage.delete_photo(id).await?;
        info!("Deleted photo {}", id);
        Ok(())
    }

    /// Write a record's decoded image bytes into `output_dir`, named after
    /// its capture instant, returning the written path.
    pub fn export_photo(&self, photo: &PhotoRecord, output_dir: &Path) -> io::Result<PathBuf> {
        let (mime, bytes) = photo.decode_image().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "photo payload is not a data URL")
        })?;
        let path = output_dir.join(format!(
            "photo-{}.{}",
            photo.timestamp.format("%Y-%m-%dT%H-%M-%S"),
            extension_for(&mime)
        ));
        std::fs::write(&path, bytes)?;
        info!("Exported photo {} to {}", photo.id, path.display());
        Ok(path)
    }
}

fn extension_for(mime: &str) -> &str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "img",
    }
}

/// Remaining lifetime of `expiry_date` as seen from `now`, bucketed into
/// the coarsest nonzero unit (365-day years, 30-day months, days, hours,
/// minutes, seconds), floor-divided and pluralized. Elapsed lifetimes
/// clamp to "0 seconds" rather than going negative.
pub fn format_relative_expiry(expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (expiry_date - now).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = days / 365;

    if years > 0 {
        pluralize(years, "year")
    } else if months > 0 {
        pluralize(months, "month")
    } else if days > 0 {
        pluralize(days, "day")
    } else if hours > 0 {
        pluralize(hours, "hour")
    } else if minutes > 0 {
        pluralize(minutes, "minute")
    } else {
        pluralize(seconds, "second")
    }
}

/// Absolute capture instant for the gallery listing.
pub fn format_taken_at(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%b %e, %Y, %H:%M").to_string()
}

fn pluralize(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}
