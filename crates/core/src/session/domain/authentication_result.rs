use serde::Serialize;

use crate::enrollment::domain::enrollment_record::Identity;

use super::vote_tally::VoteSnapshot;

/// Why an authentication attempt did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No usable enrollment templates could be built because the
    /// enrollment directory could not be listed.
    EmptyEnrollment,
    /// Classifier training preconditions were violated.
    Training,
    /// A session was started with zero trained identities.
    NoEnrollments,
    /// Frame acquisition failed mid-session.
    FrameSource,
    /// The host could not assemble a session, e.g. a model failed to load.
    Setup,
    NoMatch,
    InsufficientEvidence,
    Cancelled,
}

impl ErrorKind {
    /// True for system faults, false for valid negative outcomes.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyEnrollment
                | ErrorKind::Training
                | ErrorKind::NoEnrollments
                | ErrorKind::FrameSource
                | ErrorKind::Setup
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::EmptyEnrollment => "enrollment photos could not be loaded",
            ErrorKind::Training => "classifier training failed",
            ErrorKind::NoEnrollments => "no enrolled identities",
            ErrorKind::FrameSource => "frame acquisition failed",
            ErrorKind::Setup => "system setup failed",
            ErrorKind::NoMatch => "no face matched any enrolled identity",
            ErrorKind::InsufficientEvidence => "not enough matching frames",
            ErrorKind::Cancelled => "authentication cancelled",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub frames_seen: u64,
    /// Frames in which a face was detected and selected.
    pub faces_seen: u64,
    pub elapsed_ms: u64,
    pub votes: Vec<VoteSnapshot>,
}

/// The single outcome of an authentication session.
///
/// `username` is present exactly when `success` is true; `error` exactly
/// when it is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationResult {
    pub success: bool,
    pub username: Option<Identity>,
    pub error: Option<ErrorKind>,
    pub message: Option<String>,
    pub diagnostics: Diagnostics,
}

impl AuthenticationResult {
    pub fn accepted(identity: Identity, diagnostics: Diagnostics) -> Self {
        Self {
            success: true,
            username: Some(identity),
            error: None,
            message: None,
            diagnostics,
        }
    }

    pub fn rejected(kind: ErrorKind, message: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self {
            success: false,
            username: None,
            error: Some(kind),
            message: Some(message.into()),
            diagnostics,
        }
    }
}
