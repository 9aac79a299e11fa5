pub mod frame_source;
pub mod pipeline;

pub use frame_source::{FileFrameSource, Frame, FrameSource};
pub use pipeline::CapturePipeline;
