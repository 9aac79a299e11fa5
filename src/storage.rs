//! Storage subsystem
//!
//! This module provides abstractions and implementations for persisting
//! photo records with expiry-aware retrieval.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform API.
//! - `types`: the photo record entity and its wire mapping.
//! - `database_storage`: transactional SQLite implementation using sqlx.
//! - `file_storage`: single-blob filesystem implementation for simple
//!   persistence and inspection.

pub mod database_storage;
pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use database_storage::DatabaseStorage;
pub use file_storage::FileStorage;
pub use storage_trait::Storage;
pub use types::{encode_data_url, PhotoRecord};
