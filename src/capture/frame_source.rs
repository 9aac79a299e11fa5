//! Frame acquisition, the camera stand-in.
//!
//! The capture pipeline does not care where a frame comes from; anything
//! able to hand over encoded image bytes can feed it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error_handling::types::CaptureError;

/// One still frame: encoded image bytes plus their mime type.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Source of still frames for the capture pipeline.
pub trait FrameSource: Send + Sync {
    fn grab_frame(&self) -> Result<Frame, CaptureError>;
}

/// Frame source reading an encoded still image from disk, mime type
/// derived from the file extension.
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl FrameSource for FileFrameSource {
    fn grab_frame(&self) -> Result<Frame, CaptureError> {
        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Err(CaptureError::FrameSourceError(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is empty", self.path.display()),
            )));
        }
        let mime = mime_for(&self.path);
        debug!("Grabbed {} byte(s) from {} ({})", bytes.len(), self.path.display(), mime);
        Ok(Frame {
            bytes,
            mime: mime.to_string(),
        })
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_grab_frame_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shot.jpg");
        fs::write(&path, b"jpeg bytes").unwrap();

        let frame = FileFrameSource::new(&path).grab_frame().unwrap();
        assert_eq!(frame.bytes, b"jpeg bytes");
        assert_eq!(frame.mime, "image/jpeg");
    }

    #[test]
    fn test_missing_file_is_a_frame_source_error() {
        let dir = TempDir::new().unwrap();
        let source = FileFrameSource::new(dir.path().join("nope.png"));
        assert!(matches!(
            source.grab_frame(),
            Err(CaptureError::FrameSourceError(_))
        ));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.png");
        fs::write(&path, b"").unwrap();
        assert!(FileFrameSource::new(&path).grab_frame().is_err());
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }
}
