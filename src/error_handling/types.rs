use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Storage failures, normalized at the store boundary.
///
/// Backend-specific error shapes (sqlx errors, IO errors) never leak above
/// the `Storage` trait; they are translated into these variants before
/// callers see them. A missing id on delete is not an error at all:
/// deletes are idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// A record with the same id is already stored.
    DuplicateId,
    /// The backing storage is out of space. Callers should tell the user
    /// to delete photos, not retry.
    QuotaExceeded,
    /// The backing storage could not be opened, read, or written.
    Unavailable,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::DuplicateId => write!(f, "A photo with this id already exists"),
            StorageError::QuotaExceeded => write!(f, "Not enough storage space"),
            StorageError::Unavailable => write!(f, "Photo storage unavailable"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Programming error in an Expiry Policy caller, e.g. requesting a custom
/// expiry without supplying the instant. Fails fast, never defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    InvalidSelection(String),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidSelection(e) => write!(f, "Invalid expiry selection: {}", e),
        }
    }
}

impl std::error::Error for PolicyError {}

#[derive(Debug)]
pub enum CaptureError {
    FrameSourceError(std::io::Error),
    PolicyError(PolicyError),
    StorageError(StorageError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::FrameSourceError(e) => write!(f, "Frame source error: {}", e),
            CaptureError::PolicyError(e) => write!(f, "Expiry policy error: {}", e),
            CaptureError::StorageError(e) => write!(f, "Capture storage error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::FrameSourceError(err)
    }
}

impl From<PolicyError> for CaptureError {
    fn from(err: PolicyError) -> Self {
        CaptureError::PolicyError(err)
    }
}

impl From<StorageError> for CaptureError {
    fn from(err: StorageError) -> Self {
        CaptureError::StorageError(err)
    }
}
