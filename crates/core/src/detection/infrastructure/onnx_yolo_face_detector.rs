/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Letterbox preprocessing, inference and NMS only: authentication looks at
/// one subject per frame, so no tracking or landmark decoding is done.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::build_session;
use crate::shared::region::Region;

use super::math::{nms, ScoredBox};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloFaceDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloFaceDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!("YOLO face detector loaded, input {input_size}x{input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = decode_rows(data, &shape, self.confidence)?;
        for det in &mut raw {
            det.bbox = unletterbox(det.bbox, scale, pad_x, pad_y);
        }

        let kept = nms(&mut raw, NMS_IOU_THRESH);
        Ok(kept
            .iter()
            .filter_map(|d| to_region(d, frame.width(), frame.height()))
            .collect())
    }
}

/// Parses `[1, features, detections]` (transposed) or
/// `[1, detections, features]` output into scored boxes in letterbox space.
///
/// Row layout: `[cx, cy, w, h, conf, ...keypoints]`.
fn decode_rows(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
) -> Result<Vec<ScoredBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Ok(Vec::new());
    }

    let at = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let conf = at(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));
        dets.push(ScoredBox {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            score: conf,
        });
    }
    Ok(dets)
}

fn unletterbox(bbox: [f64; 4], scale: f64, pad_x: u32, pad_y: u32) -> [f64; 4] {
    [
        (bbox[0] - pad_x as f64) / scale,
        (bbox[1] - pad_y as f64) / scale,
        (bbox[2] - pad_x as f64) / scale,
        (bbox[3] - pad_y as f64) / scale,
    ]
}

fn to_region(det: &ScoredBox, fw: u32, fh: u32) -> Option<Region> {
    let [x1, y1, x2, y2] = det.bbox;
    let region = Region {
        x: x1.round() as i32,
        y: y1.round() as i32,
        width: (x2 - x1).round() as i32,
        height: (y2 - y1).round() as i32,
        confidence: Some(det.score),
    };
    region.clamp_to(fw, fh)
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding uses 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let channels = frame.channels() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                let sc = c.min(channels - 1);
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, sc]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}
