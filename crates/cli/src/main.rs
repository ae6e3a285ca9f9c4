mod identity_map;
mod settings;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use faceauth_core::capture::domain::frame_source::FrameSource;
use faceauth_core::capture::infrastructure::ffmpeg_frame_source::{FfmpegFrameSource, SourceSpec};
use faceauth_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use faceauth_core::capture::infrastructure::prefetch_frame_source::PrefetchFrameSource;
use faceauth_core::detection::domain::face_detector::FaceDetector;
use faceauth_core::detection::domain::face_selection::FaceSelection;
use faceauth_core::detection::infrastructure::onnx_yolo_face_detector::OnnxYoloFaceDetector;
use faceauth_core::recognition::domain::face_classifier::FaceClassifier;
use faceauth_core::recognition::infrastructure::histogram_classifier::HistogramClassifier;
use faceauth_core::recognition::infrastructure::lbph_classifier::LbphClassifier;
use faceauth_core::recognition::infrastructure::onnx_embedding_classifier::OnnxEmbeddingClassifier;
use faceauth_core::session::authenticate_use_case::AuthenticateUseCase;
use faceauth_core::session::domain::authentication_result::{
    AuthenticationResult, Diagnostics, ErrorKind,
};
use faceauth_core::session::domain::session_config::SessionConfig;
use faceauth_core::session::session_logger::LogSessionLogger;
use faceauth_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use faceauth_core::shared::model_resolver;

use identity_map::{AuthOutput, IdentityMap};
use settings::{ClassifierKind, Settings};

/// Live face authentication against a directory of enrolled photos.
///
/// Prints exactly one JSON result line to stdout and exits 0, whether or
/// not the user was authenticated. Setup failures are reported in that
/// record as `"error": "setup"`. Exit status 1 means no record could be written.
#[derive(Parser)]
#[command(name = "faceauth")]
struct Cli {
    /// Session duration in seconds.
    duration: Option<f64>,

    /// Per-frame acceptance threshold (its direction depends on the classifier).
    threshold: Option<f64>,

    /// Directory of enrollment photos, one per identity, named after it.
    #[arg(long)]
    faces_dir: Option<PathBuf>,

    /// Camera index or platform device name.
    #[arg(long)]
    camera: Option<String>,

    /// Read frames from a video file instead of the camera.
    #[arg(long, conflicts_with = "frames_dir")]
    video: Option<PathBuf>,

    /// Read frames from a directory of images instead of the camera.
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Face classifier.
    #[arg(long)]
    classifier: Option<ClassifierKind>,

    /// Matching frames required before a name is accepted.
    #[arg(long)]
    min_votes: Option<u32>,

    /// Assumed camera frame rate, used to cap the number of frames.
    #[arg(long)]
    fps: Option<f64>,

    /// Which face to use when a frame contains several.
    #[arg(long)]
    selection: Option<FaceSelection>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// JSON file mapping enrollment names to usernames.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Decode frames on a background thread.
    #[arg(long)]
    prefetch: bool,

    /// Directory searched for ONNX models before the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let output = match Cli::try_parse() {
        Ok(cli) => run(&cli),
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => setup_failure(e.to_string().trim()),
    };
    let emitted = emit(&output, &mut io::stdout().lock());
    process::exit(exit_code(emitted));
}

/// Always yields a record; setup errors become a fault result.
fn run(cli: &Cli) -> AuthOutput {
    match authenticate(cli) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("Setup failed: {e}");
            setup_failure(&e.to_string())
        }
    }
}

fn authenticate(cli: &Cli) -> Result<AuthOutput, Box<dyn std::error::Error>> {
    let settings = merge(cli, Settings::load());
    validate(cli, &settings)?;

    let config = session_config(&settings)?;
    let mapping = match &settings.mapping {
        Some(path) => IdentityMap::load(path)?,
        None => IdentityMap::default(),
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;

    let detector = build_detector(&settings)?;
    let classifier = build_classifier(&settings)?;
    let mut source = build_source(cli, &settings);

    log::info!(
        "Authenticating with {} classifier, threshold {}",
        settings.classifier,
        config.threshold
    );
    let mut use_case = AuthenticateUseCase::new(
        detector,
        classifier,
        Box::new(LogSessionLogger::default()),
        config,
        cancelled,
    )?;
    let result = use_case.execute(&settings.faces_dir, source.as_mut());
    Ok(mapping.apply(result))
}

fn setup_failure(message: &str) -> AuthOutput {
    AuthOutput {
        result: AuthenticationResult::rejected(
            ErrorKind::Setup,
            format!("System error: {message}"),
            Diagnostics::default(),
        ),
        detected_name: None,
    }
}

/// Writes the record as a single JSON line.
fn emit(output: &AuthOutput, out: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string(output)?;
    writeln!(out, "{json}")?;
    out.flush()
}

fn exit_code(emitted: io::Result<()>) -> i32 {
    match emitted {
        Ok(()) => 0,
        Err(e) => {
            log::error!("Cannot write result: {e}");
            1
        }
    }
}

fn merge(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(kind) = cli.classifier {
        settings.classifier = kind;
    }
    if let Some(selection) = cli.selection {
        settings.selection = selection;
    }
    if let Some(d) = cli.duration {
        settings.duration_secs = d;
    }
    if cli.threshold.is_some() {
        settings.threshold = cli.threshold;
    }
    if let Some(dir) = &cli.faces_dir {
        settings.faces_dir = dir.clone();
    }
    if let Some(camera) = &cli.camera {
        settings.camera = camera.clone();
    }
    if let Some(n) = cli.min_votes {
        settings.min_votes = n;
    }
    if let Some(fps) = cli.fps {
        settings.assumed_fps = fps;
    }
    if let Some(c) = cli.confidence {
        settings.confidence = c;
    }
    if cli.mapping.is_some() {
        settings.mapping = cli.mapping.clone();
    }
    if cli.models_dir.is_some() {
        settings.models_dir = cli.models_dir.clone();
    }
    settings.prefetch |= cli.prefetch;
    settings
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(video) = &cli.video {
        if !video.exists() {
            return Err(format!("Video file not found: {}", video.display()).into());
        }
    }
    if let Some(dir) = &cli.frames_dir {
        if !dir.is_dir() {
            return Err(format!("Frames directory not found: {}", dir.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&settings.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            settings.confidence
        )
        .into());
    }
    Ok(())
}

fn session_config(settings: &Settings) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let duration = Duration::try_from_secs_f64(settings.duration_secs).map_err(|_| {
        format!(
            "Duration must be a positive number of seconds, got {}",
            settings.duration_secs
        )
    })?;
    let config = SessionConfig {
        duration,
        assumed_fps: settings.assumed_fps,
        threshold: settings.threshold(),
        min_votes: settings.min_votes,
        selection: settings.selection,
        template_size: settings.template_size,
    };
    config.validate()?;
    Ok(config)
}

fn build_detector(settings: &Settings) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        settings.models_dir.as_deref(),
        Some(download_progress("face detection")),
    )?;
    Ok(Box::new(OnnxYoloFaceDetector::new(
        &model_path,
        settings.confidence,
    )?))
}

fn build_classifier(
    settings: &Settings,
) -> Result<Box<dyn FaceClassifier>, Box<dyn std::error::Error>> {
    match settings.classifier {
        ClassifierKind::Lbph => Ok(Box::new(LbphClassifier::default())),
        ClassifierKind::Histogram => Ok(Box::new(HistogramClassifier::new())),
        ClassifierKind::Embedding => {
            log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
            let model_path = model_resolver::resolve(
                EMBEDDING_MODEL_NAME,
                EMBEDDING_MODEL_URL,
                settings.models_dir.as_deref(),
                Some(download_progress("face embedding")),
            )?;
            Ok(Box::new(OnnxEmbeddingClassifier::new(&model_path)?))
        }
    }
}

fn build_source(cli: &Cli, settings: &Settings) -> Box<dyn FrameSource> {
    let source: Box<dyn FrameSource> = if let Some(video) = &cli.video {
        Box::new(FfmpegFrameSource::new(SourceSpec::File(video.clone())))
    } else if let Some(dir) = &cli.frames_dir {
        Box::new(ImageSequenceSource::new(dir))
    } else {
        Box::new(FfmpegFrameSource::new(SourceSpec::camera(&settings.camera)))
    };
    if settings.prefetch {
        Box::new(PrefetchFrameSource::new(source))
    } else {
        source
    }
}

/// Logs download progress in 10% steps.
fn download_progress(what: &'static str) -> model_resolver::ProgressFn {
    let last_step = AtomicU64::new(u64::MAX);
    Box::new(move |downloaded: u64, total: u64| {
        if total == 0 {
            log::debug!("Downloading {what} model... {downloaded} bytes");
            return;
        }
        let pct = downloaded.saturating_mul(100) / total;
        if last_step.swap(pct / 10, Ordering::Relaxed) != pct / 10 {
            log::info!("Downloading {what} model... {pct}%");
        }
    })
}
