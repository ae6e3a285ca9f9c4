use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{CaptureError, FrameSource, SourceGuard};
use crate::detection::domain::face_detector::FaceDetector;
use crate::recognition::domain::face_classifier::FaceClassifier;
use crate::recognition::domain::face_template::FaceTemplate;
use crate::recognition::domain::gallery::Gallery;
use crate::session::domain::authentication_result::{
    AuthenticationResult, Diagnostics, ErrorKind,
};
use crate::session::domain::decision_policy::{resolve, Verdict};
use crate::session::domain::session_config::SessionConfig;
use crate::session::domain::vote_tally::VoteTally;
use crate::session::session_logger::SessionLogger;
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Why the frame loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The session never reached the frame loop.
    NotStarted,
    Cancelled,
    TimeLimit,
    FrameLimit,
    EndOfStream,
    SourceError,
}

/// Final state of a finished session together with its result.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub state: SessionState,
    pub reason: TerminationReason,
    pub result: AuthenticationResult,
}

/// Counters for a running session. Only ever increase.
#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    frames_seen: u64,
    faces_seen: u64,
    elapsed: Duration,
}

/// One bounded authentication attempt against a live frame stream.
///
/// Pulls frames until cancelled, out of time, out of frame budget or out of
/// frames; classifies the primary face in each; and resolves the accumulated
/// votes into a single [`AuthenticationResult`]. The frame source is opened
/// when the loop starts and closed exactly once on every exit path.
pub struct MatchSession<'a> {
    config: SessionConfig,
    detector: &'a mut dyn FaceDetector,
    classifier: &'a dyn FaceClassifier,
    logger: &'a mut dyn SessionLogger,
    cancelled: Arc<AtomicBool>,
    state: SessionState,
}

impl<'a> MatchSession<'a> {
    pub fn new(
        config: SessionConfig,
        detector: &'a mut dyn FaceDetector,
        classifier: &'a dyn FaceClassifier,
        logger: &'a mut dyn SessionLogger,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            detector,
            classifier,
            logger,
            cancelled,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion.
    ///
    /// Fails with [`ErrorKind::NoEnrollments`] without touching `source` when
    /// `gallery` is absent or empty, and with [`ErrorKind::Training`] when the
    /// gallery was trained for the other score direction.
    pub fn run(mut self, gallery: Option<&Gallery>, source: &mut dyn FrameSource) -> SessionReport {
        let Some(gallery) = gallery.filter(|g| !g.is_empty()) else {
            log::warn!("Session refused: no enrolled identities");
            return self.finish(
                SessionState::Failed,
                TerminationReason::NotStarted,
                AuthenticationResult::rejected(
                    ErrorKind::NoEnrollments,
                    ErrorKind::NoEnrollments.to_string(),
                    Diagnostics::default(),
                ),
            );
        };

        let direction = self.classifier.score_direction();
        if direction != gallery.direction() {
            let message = format!(
                "gallery expects {:?} scores but the classifier produces {direction:?}",
                gallery.direction()
            );
            log::error!("Session refused: {message}");
            return self.finish(
                SessionState::Failed,
                TerminationReason::NotStarted,
                AuthenticationResult::rejected(ErrorKind::Training, message, Diagnostics::default()),
            );
        }

        let mut tally = VoteTally::new(gallery.direction());
        let mut progress = Progress::default();

        let mut guard = match SourceGuard::open(source) {
            Ok(guard) => guard,
            Err(e) => {
                log::error!("Cannot start session: {e}");
                return self.finish(
                    SessionState::Failed,
                    TerminationReason::SourceError,
                    AuthenticationResult::rejected(
                        ErrorKind::FrameSource,
                        e.to_string(),
                        Diagnostics::default(),
                    ),
                );
            }
        };

        self.state = SessionState::Running;
        let max_frames = self.config.max_frames();
        self.logger.info(&format!(
            "Session running: {:.1}s or {max_frames} frames, threshold {} ({:?}), min_votes {}",
            self.config.duration.as_secs_f64(),
            self.config.threshold,
            gallery.direction(),
            self.config.min_votes
        ));

        let mut source_error: Option<CaptureError> = None;
        let reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break TerminationReason::Cancelled;
            }
            progress.elapsed = progress.elapsed.max(guard.elapsed());
            if progress.elapsed >= self.config.duration {
                break TerminationReason::TimeLimit;
            }
            if progress.frames_seen >= max_frames {
                break TerminationReason::FrameLimit;
            }

            match guard.next_frame() {
                Ok(Some(frame)) if !frame.is_well_formed() => {
                    source_error = Some(CaptureError::Read(format!(
                        "frame {} is malformed: {} bytes for {}x{}x{}",
                        frame.index(),
                        frame.data().len(),
                        frame.width(),
                        frame.height(),
                        frame.channels()
                    )));
                    break TerminationReason::SourceError;
                }
                Ok(Some(frame)) => {
                    progress.frames_seen += 1;
                    self.logger.progress(progress.frames_seen, max_frames);
                    if self.process_frame(&frame, gallery, &mut tally) {
                        progress.faces_seen += 1;
                    }
                }
                Ok(None) => break TerminationReason::EndOfStream,
                Err(e) => {
                    source_error = Some(e);
                    break TerminationReason::SourceError;
                }
            }
        };
        progress.elapsed = progress.elapsed.max(guard.elapsed());
        drop(guard);

        log::info!(
            "Session stopped ({reason:?}) after {} frames, {} votes",
            progress.frames_seen,
            tally.total_votes()
        );

        let diagnostics = Diagnostics {
            frames_seen: progress.frames_seen,
            faces_seen: progress.faces_seen,
            elapsed_ms: progress.elapsed.as_millis() as u64,
            votes: tally.snapshot(),
        };

        let (state, result) = match reason {
            TerminationReason::Cancelled => (
                SessionState::Cancelled,
                AuthenticationResult::rejected(
                    ErrorKind::Cancelled,
                    ErrorKind::Cancelled.to_string(),
                    diagnostics,
                ),
            ),
            TerminationReason::SourceError => {
                let message = source_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| ErrorKind::FrameSource.to_string());
                (
                    SessionState::Failed,
                    AuthenticationResult::rejected(ErrorKind::FrameSource, message, diagnostics),
                )
            }
            _ => self.decide(&tally, diagnostics),
        };
        self.finish(state, reason, result)
    }

    /// Detects, selects, classifies and possibly votes for one frame.
    ///
    /// Returns whether a face was selected. Detector and classifier errors
    /// only cost this frame its vote.
    fn process_frame(&mut self, frame: &Frame, gallery: &Gallery, tally: &mut VoteTally) -> bool {
        let t0 = Instant::now();
        let regions = match self.detector.detect(frame) {
            Ok(regions) => regions,
            Err(e) => {
                log::warn!("Frame {}: detection failed: {e}", frame.index());
                return false;
            }
        };
        self.logger.timing("detect", elapsed_ms(t0));
        self.logger.metric("faces", regions.len() as f64);

        let Some(face) = self.config.selection.select(&regions) else {
            return false;
        };
        let Some(template) = FaceTemplate::from_region(frame, face, self.config.template_size)
        else {
            return false;
        };

        let t1 = Instant::now();
        let prediction = match self.classifier.predict(gallery.model(), &template) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Frame {}: classification failed: {e}", frame.index());
                return true;
            }
        };
        self.logger.timing("classify", elapsed_ms(t1));
        self.logger.metric("score", prediction.score);

        let Some(identity) = gallery.identity(prediction.label) else {
            log::warn!(
                "Frame {}: classifier returned unknown label {}",
                frame.index(),
                prediction.label
            );
            return true;
        };

        if gallery
            .direction()
            .accepts(prediction.score, self.config.threshold)
        {
            tally.record(identity, prediction.score);
            log::debug!(
                "Frame {}: vote for '{identity}' (score {:.3})",
                frame.index(),
                prediction.score
            );
        } else {
            log::debug!(
                "Frame {}: '{identity}' rejected (score {:.3}, threshold {})",
                frame.index(),
                prediction.score,
                self.config.threshold
            );
        }
        true
    }

    fn decide(
        &self,
        tally: &VoteTally,
        diagnostics: Diagnostics,
    ) -> (SessionState, AuthenticationResult) {
        match resolve(tally, self.config.min_votes) {
            Verdict::Accepted(identity) => {
                log::info!("Authenticated as '{identity}'");
                (
                    SessionState::Succeeded,
                    AuthenticationResult::accepted(identity, diagnostics),
                )
            }
            Verdict::NoMatch => (
                SessionState::Failed,
                AuthenticationResult::rejected(
                    ErrorKind::NoMatch,
                    ErrorKind::NoMatch.to_string(),
                    diagnostics,
                ),
            ),
            Verdict::InsufficientEvidence { leader, votes } => (
                SessionState::Failed,
                AuthenticationResult::rejected(
                    ErrorKind::InsufficientEvidence,
                    format!(
                        "'{leader}' matched {votes} of {} required frames",
                        self.config.min_votes
                    ),
                    diagnostics,
                ),
            ),
        }
    }

    fn finish(
        &mut self,
        state: SessionState,
        reason: TerminationReason,
        result: AuthenticationResult,
    ) -> SessionReport {
        self.state = state;
        self.logger.summary();
        SessionReport {
            state,
            reason,
            result,
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
