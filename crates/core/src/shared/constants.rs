pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Extensions recognized in the enrollment directory (compared lowercase).
pub const ENROLLMENT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Side length of the square grayscale face template.
pub const DEFAULT_TEMPLATE_SIZE: u32 = 150;

pub const DEFAULT_SESSION_SECONDS: f64 = 10.0;
/// Frame rate used to derive the per-session frame cap, not a camera guarantee.
pub const DEFAULT_ASSUMED_FPS: f64 = 10.0;
pub const DEFAULT_MIN_VOTES: u32 = 3;
/// Per-frame threshold of the default (LBPH) classifier, a chi-square distance.
pub const DEFAULT_THRESHOLD: f64 = 80.0;
