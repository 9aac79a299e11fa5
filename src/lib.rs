pub mod capture;
pub mod configuration;
pub mod error_handling;
pub mod expiry;
pub mod gallery;
pub mod storage;

pub use capture::{CapturePipeline, FileFrameSource, Frame, FrameSource};
pub use configuration::{BackendKind, Config};
pub use error_handling::{CaptureError, ConfigError, PolicyError, StorageError};
pub use expiry::{compute_expiry, ExpirySelection};
pub use gallery::{format_relative_expiry, format_taken_at, Gallery, GalleryEntry};
pub use storage::{DatabaseStorage, FileStorage, PhotoRecord, Storage};
