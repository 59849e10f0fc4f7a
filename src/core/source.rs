//! Frame source that replays still images from a directory
//!
//! Stands in for the camera on machines without one. Frames are loaded
//! up front so `capture` never touches the disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

use crate::core::boundary::FrameSource;
use crate::error::CaptureError;
use crate::types::Frame;

#[derive(Debug)]
pub struct DirectoryFrameSource {
    frames: Vec<(Vec<u8>, &'static str)>,
    next: AtomicUsize,
    ready: AtomicBool,
}

impl DirectoryFrameSource {
    /// Load every .jpg/.jpeg/.png in `dir`, sorted by file name
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let dir = dir.as_ref();
        let io_err = |source| CaptureError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| mime_for(p).is_some())
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let data = std::fs::read(path).map_err(|source| CaptureError::Io {
                path: path.clone(),
                source,
            })?;
            if let Some(mime) = mime_for(path) {
                frames.push((data, mime));
            }
        }

        if frames.is_empty() {
            return Err(CaptureError::Empty(dir.to_path_buf()));
        }
        info!(count = frames.len(), dir = %dir.display(), "frames loaded");

        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
            ready: AtomicBool::new(true),
        })
    }

    /// Pause or resume delivery
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && !self.frames.is_empty()
    }

    fn capture(&self) -> Result<Frame, CaptureError> {
        if !self.is_ready() {
            return Err(CaptureError::NotReady);
        }
        let i = self.next.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        let (data, mime) = &self.frames[i];
        let mut frame = Frame::jpeg(data.clone());
        frame.mime = mime.to_string();
        Ok(frame)
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_through_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), [1u8]).unwrap();
        std::fs::write(dir.path().join("b.png"), [2u8]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let source = DirectoryFrameSource::load(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.capture().unwrap();
        let second = source.capture().unwrap();
        let third = source.capture().unwrap();
        assert_eq!(first.data, vec![1]);
        assert_eq!(first.mime, "image/jpeg");
        assert_eq!(second.mime, "image/png");
        assert_eq!(third.data, vec![1]);
    }

    #[test]
    fn test_not_ready_when_paused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpeg"), [1u8]).unwrap();
        let source = DirectoryFrameSource::load(dir.path()).unwrap();

        source.set_ready(false);
        assert!(!source.is_ready());
        assert!(matches!(source.capture(), Err(CaptureError::NotReady)));
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DirectoryFrameSource::load(dir.path()),
            Err(CaptureError::Empty(_))
        ));
    }
}
