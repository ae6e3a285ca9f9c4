use ndarray::ArrayView3;

/// A single camera/image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    /// Frames from outside the crate may be malformed; check
    /// [`Frame::is_well_formed`] before reading pixels.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Wraps a decoded RGB image.
    pub fn from_rgb_image(img: image::RgbImage, index: usize) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Gray or RGB, with exactly `width * height * channels` bytes.
    pub fn is_well_formed(&self) -> bool {
        let (h, w, ch) = self.shape();
        matches!(ch, 1 | 3)
            && h.checked_mul(w)
                .and_then(|px| px.checked_mul(ch))
                .is_some_and(|len| len == self.data.len())
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Converts to an 8-bit grayscale image (ITU-R 601 luma).
    ///
    /// Single-channel frames are copied as-is.
    pub fn to_luma(&self) -> image::GrayImage {
        let ch = self.channels as usize;
        let pixels: Vec<u8> = if ch == 1 {
            self.data.clone()
        } else {
            self.data
                .chunks_exact(ch)
                .map(|px| {
                    let r = px[0] as f32;
                    let g = px[1] as f32;
                    let b = px[2] as f32;
                    (0.299 * r + 0.587 * g + 0.114 * b).round().min(255.0) as u8
                })
                .collect()
        };
        image::GrayImage::from_raw(self.width, self.height, pixels)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
