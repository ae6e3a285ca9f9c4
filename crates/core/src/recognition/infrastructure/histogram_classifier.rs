/// Intensity-histogram classifier.
///
/// Compares face templates by their grayscale distribution using Pearson
/// correlation. No ML model required; a coarse fallback when neither LBPH
/// nor the embedding model suits the deployment.
use crate::recognition::domain::face_classifier::{
    check_training_set, ClassifierError, FaceClassifier, Prediction, ScoreDirection, TrainedModel,
};
use crate::recognition::domain::face_template::FaceTemplate;

use super::math::pearson_correlation;

pub const DEFAULT_THRESHOLD: f64 = 0.6;

const BINS: usize = 256;

#[derive(Default)]
pub struct HistogramClassifier;

impl HistogramClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl FaceClassifier for HistogramClassifier {
    fn score_direction(&self) -> ScoreDirection {
        ScoreDirection::HigherIsBetter
    }

    fn train(
        &self,
        templates: &[FaceTemplate],
        labels: &[u32],
    ) -> Result<TrainedModel, ClassifierError> {
        check_training_set(templates, labels)?;
        let features = templates.iter().map(compute_histogram).collect();
        TrainedModel::new(features, labels.to_vec())
    }

    fn predict(
        &self,
        model: &TrainedModel,
        query: &FaceTemplate,
    ) -> Result<Prediction, ClassifierError> {
        let hist = compute_histogram(query);
        Ok(model.nearest(&hist, self.score_direction(), pearson_correlation))
    }
}

fn compute_histogram(template: &FaceTemplate) -> Vec<f64> {
    let mut hist = vec![0.0f64; BINS];
    for &p in template.pixels() {
        hist[p as usize] += 1.0;
    }
    let total = template.pixels().len() as f64;
    if total > 0.0 {
        for v in &mut hist {
            *v /= total;
        }
    }
    hist
}
