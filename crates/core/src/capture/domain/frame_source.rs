use std::time::Duration;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot open frame source {source_name}: {reason}")]
    Open { source_name: String, reason: String },
    #[error("frame acquisition failed: {0}")]
    Read(String),
    #[error("frame source is not open")]
    NotOpen,
}

/// A live or recorded stream of frames.
///
/// `next_frame` is the only blocking call: it returns once a frame is
/// available (`Ok(Some)`), the stream has ended (`Ok(None)`), or acquisition
/// failed. The source is exclusively owned between `open` and `close`.
pub trait FrameSource: Send {
    /// Acquires the underlying device or file.
    fn open(&mut self) -> Result<(), CaptureError>;

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Time since a successful `open`; zero before that.
    fn elapsed(&self) -> Duration;

    /// Releases the underlying device or file. Safe to call when not open.
    fn close(&mut self);
}

/// Scoped acquisition of a [`FrameSource`].
///
/// Opens on construction and closes exactly once when dropped, including
/// when `open` itself fails part-way.
pub struct SourceGuard<'a> {
    source: &'a mut dyn FrameSource,
}

impl<'a> SourceGuard<'a> {
    pub fn open(source: &'a mut dyn FrameSource) -> Result<Self, CaptureError> {
        let mut guard = Self { source };
        guard.source.open()?;
        Ok(guard)
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.source.next_frame()
    }

    pub fn elapsed(&self) -> Duration {
        self.source.elapsed()
    }
}

impl Drop for SourceGuard<'_> {
    fn drop(&mut self) {
        self.source.close();
    }
}
