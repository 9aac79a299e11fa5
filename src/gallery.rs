pub mod renderer;

pub use renderer::{format_relative_expiry, format_taken_at, Gallery, GalleryEntry};
