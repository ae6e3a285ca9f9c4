use std::time::Duration;

use thiserror::Error;

use crate::detection::domain::face_selection::FaceSelection;
use crate::shared::constants::{
    DEFAULT_ASSUMED_FPS, DEFAULT_MIN_VOTES, DEFAULT_SESSION_SECONDS, DEFAULT_TEMPLATE_SIZE,
    DEFAULT_THRESHOLD,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("session duration must be positive")]
    Duration,
    #[error("assumed frame rate must be a positive number, got {0}")]
    FrameRate(f64),
    #[error("threshold must be a finite number, got {0}")]
    Threshold(f64),
    #[error("min_votes must be at least 1")]
    MinVotes,
    #[error("template size must be at least {min}, got {size}")]
    TemplateSize { size: u32, min: u32 },
}

const MIN_TEMPLATE_SIZE: u32 = 16;

/// Bounds and thresholds for one authentication session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub duration: Duration,
    /// Used only to derive the frame cap.
    pub assumed_fps: f64,
    /// Per-frame acceptance threshold, read in the classifier's score direction.
    pub threshold: f64,
    pub min_votes: u32,
    pub selection: FaceSelection,
    pub template_size: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs_f64(DEFAULT_SESSION_SECONDS),
            assumed_fps: DEFAULT_ASSUMED_FPS,
            threshold: DEFAULT_THRESHOLD,
            min_votes: DEFAULT_MIN_VOTES,
            selection: FaceSelection::default(),
            template_size: DEFAULT_TEMPLATE_SIZE,
        }
    }
}

impl SessionConfig {
    /// Frame cap derived from duration × assumed frame rate, at least 1.
    pub fn max_frames(&self) -> u64 {
        let frames = (self.duration.as_secs_f64() * self.assumed_fps).ceil();
        (frames as u64).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::Duration);
        }
        if !(self.assumed_fps.is_finite() && self.assumed_fps > 0.0) {
            return Err(ConfigError::FrameRate(self.assumed_fps));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if self.min_votes == 0 {
            return Err(ConfigError::MinVotes);
        }
        if self.template_size < MIN_TEMPLATE_SIZE {
            return Err(ConfigError::TemplateSize {
                size: self.template_size,
                min: MIN_TEMPLATE_SIZE,
            });
        }
        Ok(())
    }
}
