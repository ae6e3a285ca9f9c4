use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::constants::ENROLLMENT_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays a directory of still images as a finite frame stream.
///
/// Files are read in filename order. Useful for offline runs against
/// recorded captures and for reproducible demos.
pub struct ImageSequenceSource {
    dir: PathBuf,
    queue: Vec<PathBuf>,
    cursor: usize,
    opened_at: Option<Instant>,
}

impl ImageSequenceSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            queue: Vec::new(),
            cursor: 0,
            opened_at: None,
        }
    }

    fn list(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| ENROLLMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.queue = self.list().map_err(|e| CaptureError::Open {
            source_name: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;
        self.cursor = 0;
        self.opened_at = Some(Instant::now());
        log::info!(
            "Replaying {} images from {}",
            self.queue.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.opened_at.is_none() {
            return Err(CaptureError::NotOpen);
        }
        let Some(path) = self.queue.get(self.cursor) else {
            return Ok(None);
        };
        let img = image::open(path)
            .map_err(|e| CaptureError::Read(format!("{}: {e}", path.display())))?;
        let frame = Frame::from_rgb_image(img.to_rgb8(), self.cursor);
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn elapsed(&self) -> Duration {
        self.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    fn close(&mut self) {
        self.queue.clear();
        self.cursor = 0;
        self.opened_at = None;
    }
}
