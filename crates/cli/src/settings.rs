use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use faceauth_core::detection::domain::face_selection::FaceSelection;
use faceauth_core::detection::infrastructure::onnx_yolo_face_detector::DEFAULT_CONFIDENCE;
use faceauth_core::recognition::infrastructure::{
    histogram_classifier, lbph_classifier, onnx_embedding_classifier,
};
use faceauth_core::shared::constants::{
    DEFAULT_ASSUMED_FPS, DEFAULT_MIN_VOTES, DEFAULT_SESSION_SECONDS, DEFAULT_TEMPLATE_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    Lbph,
    Histogram,
    Embedding,
}

impl ClassifierKind {
    /// Per-frame acceptance threshold used when none is configured.
    pub fn default_threshold(&self) -> f64 {
        match self {
            ClassifierKind::Lbph => lbph_classifier::DEFAULT_THRESHOLD,
            ClassifierKind::Histogram => histogram_classifier::DEFAULT_THRESHOLD,
            ClassifierKind::Embedding => onnx_embedding_classifier::DEFAULT_THRESHOLD,
        }
    }
}

impl std::str::FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lbph" => Ok(ClassifierKind::Lbph),
            "histogram" => Ok(ClassifierKind::Histogram),
            "embedding" => Ok(ClassifierKind::Embedding),
            other => Err(format!(
                "Classifier must be 'lbph', 'histogram' or 'embedding', got '{other}'"
            )),
        }
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierKind::Lbph => write!(f, "lbph"),
            ClassifierKind::Histogram => write!(f, "histogram"),
            ClassifierKind::Embedding => write!(f, "embedding"),
        }
    }
}

/// Persistent defaults for the `faceauth` binary. Command-line flags win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub faces_dir: PathBuf,
    pub camera: String,
    pub classifier: ClassifierKind,
    /// `None` means the classifier's own default.
    pub threshold: Option<f64>,
    pub duration_secs: f64,
    pub min_votes: u32,
    pub assumed_fps: f64,
    pub selection: FaceSelection,
    pub template_size: u32,
    pub confidence: f64,
    pub mapping: Option<PathBuf>,
    pub prefetch: bool,
    pub models_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            faces_dir: PathBuf::from("Faces"),
            camera: "0".to_string(),
            classifier: ClassifierKind::Lbph,
            threshold: None,
            duration_secs: DEFAULT_SESSION_SECONDS,
            min_votes: DEFAULT_MIN_VOTES,
            assumed_fps: DEFAULT_ASSUMED_FPS,
            selection: FaceSelection::Largest,
            template_size: DEFAULT_TEMPLATE_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            mapping: None,
            prefetch: false,
            models_dir: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceAuth").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.classifier.default_threshold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "classifier": "histogram", "min_votes": 5, "selection": "first" }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.classifier, ClassifierKind::Histogram);
        assert_eq!(settings.min_votes, 5);
        assert_eq!(settings.selection, FaceSelection::First);
        assert_eq!(settings.duration_secs, DEFAULT_SESSION_SECONDS);
        assert_eq!(settings.threshold(), histogram_classifier::DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_explicit_threshold_overrides_classifier_default() {
        let settings = Settings {
            threshold: Some(65.0),
            ..Default::default()
        };
        assert_eq!(settings.threshold(), 65.0);
    }

    #[test]
    fn test_classifier_names_round_trip() {
        for kind in [
            ClassifierKind::Lbph,
            ClassifierKind::Histogram,
            ClassifierKind::Embedding,
        ] {
            assert_eq!(kind.to_string().parse::<ClassifierKind>(), Ok(kind));
        }
        assert!("eigen".parse::<ClassifierKind>().is_err());
    }
}
