use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::enrollment::enrollment_store::{EnrollmentError, EnrollmentStore};
use crate::recognition::domain::face_classifier::FaceClassifier;
use crate::recognition::domain::gallery::Gallery;
use crate::session::domain::authentication_result::{
    AuthenticationResult, Diagnostics, ErrorKind,
};
use crate::session::domain::session_config::{ConfigError, SessionConfig};
use crate::session::match_session::{MatchSession, SessionReport, SessionState, TerminationReason};
use crate::session::session_logger::SessionLogger;

/// Full authentication flow: enroll → train → match → verdict.
///
/// Enrollment and training finish before the frame source is touched. Every
/// outcome, including setup failures, comes back as an
/// [`AuthenticationResult`].
pub struct AuthenticateUseCase {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn FaceClassifier>,
    logger: Box<dyn SessionLogger>,
    config: SessionConfig,
    cancelled: Arc<AtomicBool>,
}

impl AuthenticateUseCase {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        classifier: Box<dyn FaceClassifier>,
        logger: Box<dyn SessionLogger>,
        config: SessionConfig,
        cancelled: Arc<AtomicBool>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            detector,
            classifier,
            logger,
            config,
            cancelled,
        })
    }

    pub fn execute(&mut self, faces_dir: &Path, source: &mut dyn FrameSource) -> AuthenticationResult {
        self.execute_with_report(faces_dir, source).result
    }

    /// Like [`execute`](Self::execute) but also returns the session's final
    /// state and termination reason.
    pub fn execute_with_report(
        &mut self,
        faces_dir: &Path,
        source: &mut dyn FrameSource,
    ) -> SessionReport {
        let store = EnrollmentStore::new(self.config.selection, self.config.template_size);
        let gallery = match store.build(faces_dir, self.detector.as_mut()) {
            Ok(records) => match Gallery::train(self.classifier.as_ref(), &records) {
                Ok(gallery) => Some(gallery),
                Err(e) => {
                    log::error!("Training failed: {e}");
                    return setup_failure(ErrorKind::Training, e.to_string());
                }
            },
            Err(EnrollmentError::Empty { dir }) => {
                log::warn!("No usable enrollment photos in {}", dir.display());
                None
            }
            Err(e @ EnrollmentError::ReadDir { .. }) => {
                log::error!("{e}");
                return setup_failure(ErrorKind::EmptyEnrollment, e.to_string());
            }
        };

        let session = MatchSession::new(
            self.config.clone(),
            self.detector.as_mut(),
            self.classifier.as_ref(),
            self.logger.as_mut(),
            self.cancelled.clone(),
        );
        session.run(gallery.as_ref(), source)
    }
}

fn setup_failure(kind: ErrorKind, message: String) -> SessionReport {
    SessionReport {
        state: SessionState::Failed,
        reason: TerminationReason::NotStarted,
        result: AuthenticationResult::rejected(kind, message, Diagnostics::default()),
    }
}
