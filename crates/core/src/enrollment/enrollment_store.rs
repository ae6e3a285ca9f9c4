use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_selection::FaceSelection;
use crate::enrollment::domain::enrollment_record::{EnrollmentRecord, Identity};
use crate::recognition::domain::face_template::FaceTemplate;
use crate::shared::constants::{DEFAULT_TEMPLATE_SIZE, ENROLLMENT_EXTENSIONS};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("no usable enrollment photos in {}", dir.display())]
    Empty { dir: PathBuf },
    #[error("cannot read enrollment directory {}: {source}", dir.display())]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A photo that did not produce an enrollment record, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPhoto {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of scanning an enrollment directory.
#[derive(Debug, Default)]
pub struct EnrollmentReport {
    pub records: Vec<EnrollmentRecord>,
    pub skipped: Vec<SkippedPhoto>,
}

/// Builds one face template per identity from a directory of reference photos.
///
/// Files are visited in lexicographic filename order, so labels are stable
/// across runs for the same directory contents. A photo that cannot be
/// decoded or contains no detectable face is logged and skipped.
pub struct EnrollmentStore {
    selection: FaceSelection,
    template_size: u32,
}

impl EnrollmentStore {
    pub fn new(selection: FaceSelection, template_size: u32) -> Self {
        Self {
            selection,
            template_size,
        }
    }

    /// Returns the enrollment records for `dir`, failing when none could be built.
    pub fn build(
        &self,
        dir: &Path,
        detector: &mut dyn FaceDetector,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        let report = self.scan(dir, detector)?;
        if report.records.is_empty() {
            return Err(EnrollmentError::Empty {
                dir: dir.to_path_buf(),
            });
        }
        Ok(report.records)
    }

    /// Like [`build`](Self::build) but also reports skipped photos and
    /// never fails on an empty result.
    pub fn scan(
        &self,
        dir: &Path,
        detector: &mut dyn FaceDetector,
    ) -> Result<EnrollmentReport, EnrollmentError> {
        let mut report = EnrollmentReport::default();
        let mut seen: HashSet<Identity> = HashSet::new();

        for path in list_photos(dir)? {
            let identity = match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Identity::new(s))
            {
                Some(id) => id,
                None => {
                    skip(&mut report, path, "file name is not a usable identity".into());
                    continue;
                }
            };
            if seen.contains(&identity) {
                skip(
                    &mut report,
                    path,
                    format!("identity '{identity}' is already enrolled"),
                );
                continue;
            }

            match self.template_for(&path, detector) {
                Ok(template) => {
                    let label = report.records.len() as u32;
                    log::info!("Enrolled '{identity}' as label {label}");
                    seen.insert(identity.clone());
                    report.records.push(EnrollmentRecord {
                        identity,
                        label,
                        template,
                    });
                }
                Err(reason) => skip(&mut report, path, reason),
            }
        }

        log::info!(
            "Enrollment: {} identities, {} photos skipped",
            report.records.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn template_for(
        &self,
        path: &Path,
        detector: &mut dyn FaceDetector,
    ) -> Result<FaceTemplate, String> {
        let img = image::open(path).map_err(|e| format!("cannot decode image: {e}"))?;
        let frame = Frame::from_rgb_image(img.to_rgb8(), 0);
        let regions = detector
            .detect(&frame)
            .map_err(|e| format!("face detection failed: {e}"))?;
        let face = self
            .selection
            .select(&regions)
            .ok_or_else(|| "no face detected".to_string())?;
        FaceTemplate::from_region(&frame, face, self.template_size)
            .ok_or_else(|| "detected face lies outside the image".to_string())
    }
}

impl Default for EnrollmentStore {
    fn default() -> Self {
        Self::new(FaceSelection::default(), DEFAULT_TEMPLATE_SIZE)
    }
}

fn skip(report: &mut EnrollmentReport, path: PathBuf, reason: String) {
    log::warn!("Skipping enrollment photo {}: {reason}", path.display());
    report.skipped.push(SkippedPhoto { path, reason });
}

/// Regular files with a recognized image extension, sorted by file name.
fn list_photos(dir: &Path) -> Result<Vec<PathBuf>, EnrollmentError> {
    let read_err = |source| EnrollmentError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    };
    let mut photos = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && has_photo_extension(&path) {
            photos.push(path);
        }
    }
    photos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(photos)
}

fn has_photo_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ENROLLMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
