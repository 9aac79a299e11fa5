pub mod policy;

pub use policy::{compute_expiry, ExpirySelection};
