use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

/// Where an [`FfmpegFrameSource`] pulls frames from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// A camera opened through the platform's libavdevice input
    /// (`v4l2`, `avfoundation` or `dshow`).
    Camera { device: String },
    /// A recorded video file, decoded once from start to end.
    File(PathBuf),
}

impl SourceSpec {
    /// Camera by index or platform device name.
    ///
    /// A bare index maps to `/dev/videoN` on Linux, to the avfoundation index
    /// on macOS and is passed through unchanged elsewhere.
    pub fn camera(device: &str) -> Self {
        let device = match device.parse::<u32>() {
            Ok(n) if cfg!(target_os = "linux") => format!("/dev/video{n}"),
            _ => device.to_string(),
        };
        SourceSpec::Camera { device }
    }

    fn name(&self) -> String {
        match self {
            SourceSpec::Camera { device } => device.clone(),
            SourceSpec::File(path) => path.display().to_string(),
        }
    }
}

fn camera_backend() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

struct Decoding {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    flushing: bool,
}

/// Decodes camera or video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24 and wraps it in a [`Frame`].
pub struct FfmpegFrameSource {
    spec: SourceSpec,
    decoding: Option<Decoding>,
    opened_at: Option<Instant>,
    frame_index: usize,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new(spec: SourceSpec) -> Self {
        Self {
            spec,
            decoding: None,
            opened_at: None,
            frame_index: 0,
        }
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        match &self.spec {
            SourceSpec::File(path) => Ok(ffmpeg_next::format::input(path)?),
            SourceSpec::Camera { device } => {
                ffmpeg_next::device::register_all();
                let backend = camera_backend();
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == backend)
                    .ok_or_else(|| format!("ffmpeg was built without the {backend} input device"))?;
                let ctx = ffmpeg_next::format::open_with(
                    device,
                    &ffmpeg_next::format::format::Format::Input(format),
                    ffmpeg_next::Dictionary::new(),
                )?;
                match ctx {
                    ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
                    _ => Err(format!("{backend} device {device} is not an input").into()),
                }
            }
        }
    }

    fn start(&self) -> Result<Decoding, Box<dyn std::error::Error>> {
        let ictx = self.open_input()?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Decoding {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            flushing: false,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        let decoding = self.start().map_err(|e| CaptureError::Open {
            source_name: self.spec.name(),
            reason: e.to_string(),
        })?;
        log::info!(
            "Opened {} ({}x{})",
            self.spec.name(),
            decoding.width,
            decoding.height
        );
        self.decoding = Some(decoding);
        self.opened_at = Some(Instant::now());
        self.frame_index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let decoding = self.decoding.as_mut().ok_or(CaptureError::NotOpen)?;
        let frame = decode_next(decoding, self.frame_index)
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        if frame.is_some() {
            self.frame_index += 1;
        }
        Ok(frame)
    }

    fn elapsed(&self) -> Duration {
        self.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    fn close(&mut self) {
        if self.decoding.take().is_some() {
            log::debug!("Closed {}", self.spec.name());
        }
        self.opened_at = None;
    }
}

/// Pulls packets until one decoded frame is available or the input ends.
fn decode_next(
    d: &mut Decoding,
    frame_index: usize,
) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
    loop {
        if let Some(frame) = try_receive(d, frame_index)? {
            return Ok(Some(frame));
        }
        if d.flushing {
            return Ok(None);
        }

        match d.ictx.packets().next() {
            Some((stream, packet)) => {
                if stream.index() != d.video_stream_index {
                    continue;
                }
                if let Err(e) = d.decoder.send_packet(&packet) {
                    log::debug!("Dropping undecodable packet: {e}");
                }
            }
            None => {
                let _ = d.decoder.send_eof();
                d.flushing = true;
            }
        }
    }
}

fn try_receive(
    d: &mut Decoding,
    frame_index: usize,
) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
    if d.decoder.receive_frame(&mut decoded).is_err() {
        return Ok(None);
    }
    let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
    d.scaler.run(&decoded, &mut rgb_frame)?;
    let pixels = extract_rgb_pixels(&rgb_frame, d.width, d.height);
    Ok(Some(Frame::new(pixels, d.width, d.height, 3, frame_index)))
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
