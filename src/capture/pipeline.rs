use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use crate::capture::frame_source::FrameSource;
use crate::error_handling::types::CaptureError;
use crate::expiry::policy::{compute_expiry, ExpirySelection};
use crate::storage::storage_trait::Storage;
use crate::storage::types::{encode_data_url, PhotoRecord};

/// Turns a live frame into a stored photo record: grab, encode, stamp with
/// the policy-computed expiry, persist.
pub struct CapturePipeline {
    storage: Arc<dyn Storage>,
}

impl CapturePipeline {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Capture one photo at `now`, alive until the expiry the user picked.
    ///
    /// No automatic retry on failure: retrying an add with the quota
    /// exceeded is pointless without user action.
    pub async fn capture(
        &self,
        source: &dyn FrameSource,
        selection: ExpirySelection,
        custom_expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<PhotoRecord, CaptureError> {
        let frame = source.grab_frame()?;
        let expiry_date = compute_expiry(selection, now, custom_expiry)?;
        let photo = PhotoRecord::new(encode_data_url(&frame.mime, &frame.bytes), now, expiry_date);
        self.storage.add_photo(&photo).await?;
        info!(
            "Captured photo {} (expires {})",
            photo.id,
            photo.expiry_date.to_rfc3339()
        );
        Ok(photo)
    }
}
