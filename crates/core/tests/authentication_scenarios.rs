//! End-to-end authentication scenarios through the public API.
//!
//! Enrollment photos and camera frames are flat gray images; the stub
//! classifier scores by mean-brightness distance, so a frame of value `v`
//! matches whichever enrolled photo is closest to `v`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use faceauth_core::capture::domain::frame_source::{CaptureError, FrameSource};
use faceauth_core::detection::domain::face_detector::FaceDetector;
use faceauth_core::detection::domain::face_selection::FaceSelection;
use faceauth_core::enrollment::domain::enrollment_record::Identity;
use faceauth_core::enrollment::enrollment_store::EnrollmentStore;
use faceauth_core::recognition::domain::face_classifier::{
    ClassifierError, FaceClassifier, Prediction, ScoreDirection, TrainedModel,
};
use faceauth_core::recognition::domain::face_template::FaceTemplate;
use faceauth_core::session::authenticate_use_case::AuthenticateUseCase;
use faceauth_core::session::domain::authentication_result::ErrorKind;
use faceauth_core::session::domain::decision_policy::{resolve, Verdict};
use faceauth_core::session::domain::session_config::SessionConfig;
use faceauth_core::session::domain::vote_tally::VoteTally;
use faceauth_core::session::match_session::{SessionReport, SessionState, TerminationReason};
use faceauth_core::session::session_logger::NullSessionLogger;
use faceauth_core::shared::frame::Frame;
use faceauth_core::shared::region::Region;
use rstest::rstest;
use tempfile::TempDir;

const ALICE: u8 = 200;
const BOB: u8 = 60;
/// Equidistant from both enrolled photos, far outside the threshold.
const STRANGER: u8 = 130;
const BLANK: u8 = 0;

// --- Stubs ---

/// One face covering the whole frame, unless the frame is black.
struct WholeFrameDetector;

impl FaceDetector for WholeFrameDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if frame.data().iter().all(|&b| b == 0) {
            return Ok(vec![]);
        }
        Ok(vec![Region::new(
            0,
            0,
            frame.width() as i32,
            frame.height() as i32,
        )])
    }
}

struct BrightnessClassifier;

fn mean(t: &FaceTemplate) -> f64 {
    t.pixels().iter().map(|&p| p as f64).sum::<f64>() / t.pixels().len() as f64
}

impl FaceClassifier for BrightnessClassifier {
    fn score_direction(&self) -> ScoreDirection {
        ScoreDirection::LowerIsBetter
    }

    fn train(
        &self,
        templates: &[FaceTemplate],
        labels: &[u32],
    ) -> Result<TrainedModel, ClassifierError> {
        let features = templates.iter().map(|t| vec![mean(t)]).collect();
        TrainedModel::new(features, labels.to_vec())
    }

    fn predict(
        &self,
        model: &TrainedModel,
        query: &FaceTemplate,
    ) -> Result<Prediction, ClassifierError> {
        Ok(model.nearest(&[mean(query)], ScoreDirection::LowerIsBetter, |a, b| {
            (a[0] - b[0]).abs()
        }))
    }
}

/// Camera double: replays gray frames on a virtual 100ms clock and counts
/// how often it is opened and released.
struct CameraDouble {
    values: Vec<u8>,
    cursor: usize,
    fail_at: Option<usize>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl CameraDouble {
    fn new(values: Vec<u8>) -> Self {
        Self {
            values,
            cursor: 0,
            fail_at: None,
            cancel_after: None,
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl FrameSource for CameraDouble {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.fail_at == Some(self.cursor) {
            return Err(CaptureError::Read("device disconnected".into()));
        }
        let Some(&v) = self.values.get(self.cursor) else {
            return Ok(None);
        };
        let frame = Frame::new(vec![v; 24 * 24 * 3], 24, 24, 3, self.cursor);
        self.cursor += 1;
        if let Some((n, flag)) = &self.cancel_after {
            if self.cursor >= *n {
                flag.store(true, Ordering::SeqCst);
            }
        }
        Ok(Some(frame))
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(100) * self.cursor as u32
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// --- Helpers ---

fn write_photo(dir: &Path, name: &str, value: u8) {
    image::RgbImage::from_pixel(24, 24, image::Rgb([value, value, value]))
        .save(dir.join(name))
        .unwrap();
}

fn enrolled_alice_and_bob() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_photo(dir.path(), "alice.png", ALICE);
    write_photo(dir.path(), "bob.jpg", BOB);
    dir
}

fn config(threshold: f64, min_votes: u32) -> SessionConfig {
    SessionConfig {
        duration: Duration::from_secs(10),
        assumed_fps: 10.0,
        threshold,
        min_votes,
        selection: FaceSelection::Largest,
        template_size: 16,
    }
}

fn authenticate(
    dir: &Path,
    camera: &mut CameraDouble,
    config: SessionConfig,
    cancelled: Arc<AtomicBool>,
) -> SessionReport {
    let mut use_case = AuthenticateUseCase::new(
        Box::new(WholeFrameDetector),
        Box::new(BrightnessClassifier),
        Box::new(NullSessionLogger),
        config,
        cancelled,
    )
    .unwrap();
    use_case.execute_with_report(dir, camera)
}

fn not_cancelled() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

fn votes_for(report: &SessionReport, name: &str) -> u32 {
    report
        .result
        .diagnostics
        .votes
        .iter()
        .find(|v| v.identity.as_str() == name)
        .map_or(0, |v| v.votes)
}

// --- Scenarios ---

#[test]
fn scenario_a_majority_identity_is_authenticated() {
    let dir = enrolled_alice_and_bob();
    let mut camera = CameraDouble::new(vec![
        ALICE, BOB, ALICE, ALICE, BOB, ALICE, BOB, ALICE, BOB, ALICE,
    ]);

    let report = authenticate(dir.path(), &mut camera, config(20.0, 3), not_cancelled());

    assert!(report.result.success);
    assert_eq!(report.result.username.as_ref().unwrap().as_str(), "alice");
    assert!(report.result.error.is_none());
    assert_eq!(report.state, SessionState::Succeeded);
    assert_eq!(votes_for(&report, "alice"), 6);
    assert_eq!(votes_for(&report, "bob"), 4);
    assert_eq!(report.result.diagnostics.frames_seen, 10);
}

#[test]
fn scenario_b_too_few_matches_is_insufficient_evidence() {
    let dir = enrolled_alice_and_bob();
    let mut frames = vec![ALICE, ALICE];
    frames.extend([STRANGER; 8]);
    let mut camera = CameraDouble::new(frames);

    let report = authenticate(dir.path(), &mut camera, config(20.0, 3), not_cancelled());

    assert!(!report.result.success);
    assert!(report.result.username.is_none());
    assert_eq!(report.result.error, Some(ErrorKind::InsufficientEvidence));
    assert_eq!(votes_for(&report, "alice"), 2);
    assert_eq!(votes_for(&report, "bob"), 0);
}

#[rstest]
#[case::empty_directory(&[])]
#[case::all_photos_faceless(&[("alice.png", BLANK), ("bob.png", BLANK)])]
fn scenario_c_no_enrollments_never_opens_camera(#[case] photos: &[(&str, u8)]) {
    let dir = TempDir::new().unwrap();
    for (name, value) in photos {
        write_photo(dir.path(), name, *value);
    }
    let mut camera = CameraDouble::new(vec![ALICE; 10]);

    let report = authenticate(dir.path(), &mut camera, config(20.0, 3), not_cancelled());

    assert!(!report.result.success);
    assert_eq!(report.result.error, Some(ErrorKind::NoEnrollments));
    assert_eq!(camera.opens(), 0);
    assert_eq!(camera.closes(), 0);
}

#[test]
fn scenario_d_cancellation_after_three_frames() {
    let dir = enrolled_alice_and_bob();
    let cancelled = not_cancelled();
    let mut camera = CameraDouble::new(vec![ALICE, BOB, STRANGER, ALICE, ALICE, ALICE]);
    camera.cancel_after = Some((3, cancelled.clone()));

    let report = authenticate(dir.path(), &mut camera, config(20.0, 3), cancelled);

    assert!(!report.result.success);
    assert_eq!(report.result.error, Some(ErrorKind::Cancelled));
    assert_eq!(report.state, SessionState::Cancelled);
    assert_eq!(report.result.diagnostics.frames_seen, 3);
    assert_eq!(camera.closes(), 1);
}

// --- Laws ---

#[rstest]
#[case::time_limit(TerminationReason::TimeLimit)]
#[case::end_of_stream(TerminationReason::EndOfStream)]
#[case::cancellation(TerminationReason::Cancelled)]
#[case::frame_source_error(TerminationReason::SourceError)]
fn camera_is_released_exactly_once(#[case] path: TerminationReason) {
    let dir = enrolled_alice_and_bob();
    let cancelled = not_cancelled();
    let mut config = config(20.0, 3);
    let mut camera = CameraDouble::new(vec![ALICE; 50]);
    match path {
        TerminationReason::TimeLimit => config.duration = Duration::from_millis(700),
        TerminationReason::EndOfStream => camera.values.truncate(4),
        TerminationReason::Cancelled => camera.cancel_after = Some((2, cancelled.clone())),
        TerminationReason::SourceError => camera.fail_at = Some(5),
        _ => unreachable!(),
    }

    let report = authenticate(dir.path(), &mut camera, config, cancelled);

    assert_eq!(report.reason, path);
    assert_eq!(camera.opens(), 1);
    assert_eq!(camera.closes(), 1);
}

#[test]
fn frame_source_error_is_a_fault() {
    let dir = enrolled_alice_and_bob();
    let mut camera = CameraDouble::new(vec![ALICE; 10]);
    camera.fail_at = Some(4);

    let report = authenticate(dir.path(), &mut camera, config(20.0, 3), not_cancelled());

    let kind = report.result.error.unwrap();
    assert_eq!(kind, ErrorKind::FrameSource);
    assert!(kind.is_fault());
    assert!(report
        .result
        .message
        .as_deref()
        .unwrap()
        .contains("device disconnected"));
}

#[test]
fn min_votes_minus_one_never_accepts() {
    let dir = enrolled_alice_and_bob();
    for min_votes in 2..=6u32 {
        let mut frames = vec![ALICE; (min_votes - 1) as usize];
        frames.extend([STRANGER; 5]);
        let mut camera = CameraDouble::new(frames);

        let report = authenticate(
            dir.path(),
            &mut camera,
            config(20.0, min_votes),
            not_cancelled(),
        );

        assert_eq!(
            report.result.error,
            Some(ErrorKind::InsufficientEvidence),
            "min_votes = {min_votes}"
        );
    }
}

#[test]
fn raising_the_threshold_never_loses_votes() {
    let dir = enrolled_alice_and_bob();
    // distances to the nearest enrolled photo: 0, 10, 25, 40, 70, 5, 55
    let frames = vec![ALICE, 190, 175, 100, STRANGER, 65, 115];
    let thresholds = [1.0, 7.0, 15.0, 30.0, 45.0, 60.0, 80.0];

    let mut previous = (0, 0);
    for threshold in thresholds {
        let mut camera = CameraDouble::new(frames.clone());
        let report = authenticate(
            dir.path(),
            &mut camera,
            config(threshold, 1),
            not_cancelled(),
        );
        let current = (votes_for(&report, "alice"), votes_for(&report, "bob"));
        assert!(
            current.0 >= previous.0 && current.1 >= previous.1,
            "threshold {threshold}: {current:?} < {previous:?}"
        );
        previous = current;
    }
    assert_eq!(previous.0 + previous.1, 7);
}

/// Keeps every log record so tests can assert on what was reported.
struct CapturedLog {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CapturedLog {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURED: CapturedLog = CapturedLog {
    records: Mutex::new(Vec::new()),
};

fn captured_log() -> &'static CapturedLog {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&CAPTURED).unwrap();
        log::set_max_level(log::LevelFilter::Trace);
    });
    &CAPTURED
}

#[test]
fn enrollment_skips_faceless_photo_without_failing() {
    let captured = captured_log();
    let dir = TempDir::new().unwrap();
    write_photo(dir.path(), "alice.png", ALICE);
    write_photo(dir.path(), "nobody.png", BLANK);

    let store = EnrollmentStore::new(FaceSelection::Largest, 16);
    let report = store.scan(dir.path(), &mut WholeFrameDetector).unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].identity.as_str(), "alice");
    assert_eq!(report.records[0].label, 0);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("nobody.png"));

    let skipped_path = dir.path().join("nobody.png").display().to_string();
    let records = captured.records.lock().unwrap();
    assert!(records
        .iter()
        .any(|(level, msg)| *level == log::Level::Warn && msg.contains(&skipped_path)));
}

#[test]
fn tied_tally_resolves_the_same_way_every_time() {
    let mut tally = VoteTally::new(ScoreDirection::LowerIsBetter);
    let a = Identity::new("A").unwrap();
    let b = Identity::new("B").unwrap();
    for _ in 0..5 {
        tally.record(&b, 12.0);
        tally.record(&a, 12.0);
    }

    let first = resolve(&tally, 3);
    for _ in 0..100 {
        assert_eq!(resolve(&tally, 3), first);
    }
    assert_eq!(first, Verdict::Accepted(a));
}
