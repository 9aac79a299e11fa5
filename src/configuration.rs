pub mod config;

pub use config::{BackendKind, Config};
