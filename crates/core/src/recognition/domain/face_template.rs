use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// A normalized face crop: square, 8-bit grayscale, fixed side length.
///
/// Built from exactly one detected face. Enrollment and live frames go
/// through the same constructor so classifiers always compare like with like.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceTemplate {
    pixels: Vec<u8>,
    size: u32,
}

impl FaceTemplate {
    /// Crops `region` out of `frame`, converts to grayscale and resizes to
    /// `size × size`.
    ///
    /// Returns `None` when the region lies entirely outside the frame.
    pub fn from_region(frame: &Frame, region: &Region, size: u32) -> Option<Self> {
        let clamped = region.clamp_to(frame.width(), frame.height())?;
        let gray = frame.to_luma();
        let crop = image::imageops::crop_imm(
            &gray,
            clamped.x as u32,
            clamped.y as u32,
            clamped.width as u32,
            clamped.height as u32,
        )
        .to_image();
        let resized =
            image::imageops::resize(&crop, size, size, image::imageops::FilterType::Triangle);
        Some(Self {
            pixels: resized.into_raw(),
            size,
        })
    }

    /// Wraps already-normalized grayscale pixels.
    pub fn from_pixels(pixels: Vec<u8>, size: u32) -> Result<Self, String> {
        let expected = (size as usize) * (size as usize);
        if pixels.len() != expected {
            return Err(format!(
                "template of side {size} needs {expected} pixels, got {}",
                pixels.len()
            ));
        }
        Ok(Self { pixels, size })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels[(y * self.size + x) as usize]
    }
}
