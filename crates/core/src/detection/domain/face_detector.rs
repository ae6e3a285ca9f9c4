use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for face detection.
///
/// Returns every candidate face box in the frame, possibly none. Order is
/// backend-defined but must be stable for a given frame, since primary-face
/// selection breaks ties by position in this list.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
