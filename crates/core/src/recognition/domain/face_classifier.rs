use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::face_template::FaceTemplate;

/// How to read a classifier's match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDirection {
    /// Score is a distance: smaller means a closer match.
    LowerIsBetter,
    /// Score is a similarity: larger means a closer match.
    HigherIsBetter,
}

impl ScoreDirection {
    /// Per-frame acceptance test against `threshold`. Equality never accepts.
    pub fn accepts(&self, score: f64, threshold: f64) -> bool {
        match self {
            ScoreDirection::LowerIsBetter => score < threshold,
            ScoreDirection::HigherIsBetter => score > threshold,
        }
    }

    /// True when `candidate` is a strictly better score than `incumbent`.
    pub fn is_better(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            ScoreDirection::LowerIsBetter => candidate < incumbent,
            ScoreDirection::HigherIsBetter => candidate > incumbent,
        }
    }
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("cannot train on an empty template set")]
    NoTemplates,
    #[error("{templates} templates but {labels} labels")]
    LengthMismatch { templates: usize, labels: usize },
    #[error("template side {size} is below the minimum of {min}")]
    TemplateTooSmall { size: u32, min: u32 },
    #[error("label {label} at position {position}; labels must run 0..n without gaps or repeats")]
    LabelGap { position: usize, label: u32 },
    #[error("classifier backend failed: {0}")]
    Backend(String),
}

/// A classifier's best guess for one query face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u32,
    pub score: f64,
}

/// Immutable gallery produced by [`FaceClassifier::train`].
///
/// Holds one feature vector per training template together with its label.
/// The feature encoding is private to the classifier that built it.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    features: Vec<Vec<f64>>,
    labels: Vec<u32>,
}

impl TrainedModel {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<u32>) -> Result<Self, ClassifierError> {
        if features.is_empty() {
            return Err(ClassifierError::NoTemplates);
        }
        if features.len() != labels.len() {
            return Err(ClassifierError::LengthMismatch {
                templates: features.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Nearest-neighbour search: scores `query` against every stored feature
    /// and returns the best one under `direction`. Earlier entries win ties.
    pub fn nearest<F>(&self, query: &[f64], direction: ScoreDirection, score: F) -> Prediction
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        let mut best = Prediction {
            label: self.labels[0],
            score: score(query, &self.features[0]),
        };
        for (feature, &label) in self.features.iter().zip(&self.labels).skip(1) {
            let s = score(query, feature);
            if direction.is_better(s, best.score) {
                best = Prediction { label, score: s };
            }
        }
        best
    }
}

/// Domain interface for the face classifier capability.
///
/// Training produces an explicit [`TrainedModel`] value that the caller
/// threads into every `predict` call; implementations keep no per-session
/// mutable state.
pub trait FaceClassifier: Send {
    fn score_direction(&self) -> ScoreDirection;

    fn train(
        &self,
        templates: &[FaceTemplate],
        labels: &[u32],
    ) -> Result<TrainedModel, ClassifierError>;

    fn predict(
        &self,
        model: &TrainedModel,
        query: &FaceTemplate,
    ) -> Result<Prediction, ClassifierError>;
}

/// Precondition shared by every `train` implementation.
pub fn check_training_set(templates: &[FaceTemplate], labels: &[u32]) -> Result<(), ClassifierError> {
    if templates.is_empty() {
        return Err(ClassifierError::NoTemplates);
    }
    if templates.len() != labels.len() {
        return Err(ClassifierError::LengthMismatch {
            templates: templates.len(),
            labels: labels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lower_below(ScoreDirection::LowerIsBetter, 50.0, 80.0, true)]
    #[case::lower_equal(ScoreDirection::LowerIsBetter, 80.0, 80.0, false)]
    #[case::lower_above(ScoreDirection::LowerIsBetter, 95.0, 80.0, false)]
    #[case::higher_above(ScoreDirection::HigherIsBetter, 0.8, 0.6, true)]
    #[case::higher_equal(ScoreDirection::HigherIsBetter, 0.6, 0.6, false)]
    #[case::higher_below(ScoreDirection::HigherIsBetter, 0.2, 0.6, false)]
    fn test_accepts(
        #[case] direction: ScoreDirection,
        #[case] score: f64,
        #[case] threshold: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(direction.accepts(score, threshold), expected);
    }

    #[test]
    fn test_is_better_follows_direction() {
        assert!(ScoreDirection::LowerIsBetter.is_better(1.0, 2.0));
        assert!(ScoreDirection::HigherIsBetter.is_better(2.0, 1.0));
        assert!(!ScoreDirection::HigherIsBetter.is_better(1.0, 1.0));
    }

    #[test]
    fn test_model_rejects_empty() {
        assert!(matches!(
            TrainedModel::new(vec![], vec![]),
            Err(ClassifierError::NoTemplates)
        ));
    }

    #[test]
    fn test_model_rejects_length_mismatch() {
        assert!(matches!(
            TrainedModel::new(vec![vec![0.0]], vec![0, 1]),
            Err(ClassifierError::LengthMismatch {
                templates: 1,
                labels: 2
            })
        ));
    }

    fn l1(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    #[test]
    fn test_nearest_lower_is_better() {
        let model = TrainedModel::new(vec![vec![0.0], vec![10.0], vec![4.0]], vec![0, 1, 2]).unwrap();
        let p = model.nearest(&[5.0], ScoreDirection::LowerIsBetter, l1);
        assert_eq!(p.label, 2);
        assert!((p.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_higher_is_better() {
        let model = TrainedModel::new(vec![vec![0.0], vec![10.0]], vec![7, 9]).unwrap();
        let p = model.nearest(&[1.0], ScoreDirection::HigherIsBetter, l1);
        assert_eq!(p.label, 9);
    }

    #[test]
    fn test_nearest_tie_keeps_earlier_entry() {
        let model = TrainedModel::new(vec![vec![4.0], vec![6.0]], vec![0, 1]).unwrap();
        let p = model.nearest(&[5.0], ScoreDirection::LowerIsBetter, l1);
        assert_eq!(p.label, 0);
    }

    #[test]
    fn test_check_training_set() {
        let t = FaceTemplate::from_pixels(vec![0; 4], 2).unwrap();
        assert!(check_training_set(&[t.clone()], &[0]).is_ok());
        assert!(matches!(
            check_training_set(&[], &[]),
            Err(ClassifierError::NoTemplates)
        ));
        assert!(matches!(
            check_training_set(&[t], &[]),
            Err(ClassifierError::LengthMismatch { .. })
        ));
    }
}
