use crate::enrollment::domain::enrollment_record::{EnrollmentRecord, Identity};

use super::face_classifier::{ClassifierError, FaceClassifier, ScoreDirection, TrainedModel};

/// A trained model together with the label → identity table it was built from.
///
/// Built once before a session starts and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Gallery {
    model: TrainedModel,
    identities: Vec<Identity>,
    direction: ScoreDirection,
}

impl Gallery {
    /// Trains `classifier` on every record.
    ///
    /// Labels must be exactly `0..records.len()` in some order; anything else
    /// fails with [`ClassifierError::LabelGap`] before training starts.
    pub fn train(
        classifier: &dyn FaceClassifier,
        records: &[EnrollmentRecord],
    ) -> Result<Self, ClassifierError> {
        let mut sorted: Vec<&EnrollmentRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.label);
        if let Some((position, r)) = sorted
            .iter()
            .enumerate()
            .find(|(i, r)| r.label as usize != *i)
        {
            return Err(ClassifierError::LabelGap {
                position,
                label: r.label,
            });
        }

        let templates: Vec<_> = sorted.iter().map(|r| r.template.clone()).collect();
        let labels: Vec<u32> = sorted.iter().map(|r| r.label).collect();
        let model = classifier.train(&templates, &labels)?;

        log::info!("Trained classifier on {} identities", sorted.len());
        Ok(Self {
            model,
            identities: sorted.into_iter().map(|r| r.identity.clone()).collect(),
            direction: classifier.score_direction(),
        })
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn direction(&self) -> ScoreDirection {
        self.direction
    }

    pub fn identity(&self, label: u32) -> Option<&Identity> {
        self.identities.get(label as usize)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::face_classifier::Prediction;
    use crate::recognition::domain::face_template::FaceTemplate;

    struct MeanClassifier;

    impl FaceClassifier for MeanClassifier {
        fn score_direction(&self) -> ScoreDirection {
            ScoreDirection::LowerIsBetter
        }

        fn train(
            &self,
            templates: &[FaceTemplate],
            labels: &[u32],
        ) -> Result<TrainedModel, ClassifierError> {
            let features = templates
                .iter()
                .map(|t| vec![t.pixels()[0] as f64])
                .collect();
            TrainedModel::new(features, labels.to_vec())
        }

        fn predict(
            &self,
            model: &TrainedModel,
            query: &FaceTemplate,
        ) -> Result<Prediction, ClassifierError> {
            let q = [query.pixels()[0] as f64];
            Ok(model.nearest(&q, ScoreDirection::LowerIsBetter, |a, b| (a[0] - b[0]).abs()))
        }
    }

    fn record(name: &str, label: u32, value: u8) -> EnrollmentRecord {
        EnrollmentRecord {
            identity: Identity::new(name).unwrap(),
            label,
            template: FaceTemplate::from_pixels(vec![value; 4], 2).unwrap(),
        }
    }

    #[test]
    fn test_labels_map_back_to_identities() {
        let records = vec![record("bob", 1, 100), record("alice", 0, 10)];
        let gallery = Gallery::train(&MeanClassifier, &records).unwrap();

        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.identity(0).unwrap().as_str(), "alice");
        assert_eq!(gallery.identity(1).unwrap().as_str(), "bob");
        assert!(gallery.identity(2).is_none());
        assert_eq!(gallery.direction(), ScoreDirection::LowerIsBetter);
    }

    #[test]
    fn test_sparse_labels_fail_training() {
        let records = vec![record("alice", 3, 10), record("bob", 7, 100)];
        let result = Gallery::train(&MeanClassifier, &records);
        assert!(matches!(
            result,
            Err(ClassifierError::LabelGap { position: 0, label: 3 })
        ));
    }

    #[test]
    fn test_repeated_label_fails_training() {
        let records = vec![
            record("alice", 0, 10),
            record("bob", 1, 100),
            record("carol", 1, 200),
        ];
        let result = Gallery::train(&MeanClassifier, &records);
        assert!(matches!(
            result,
            Err(ClassifierError::LabelGap { position: 2, label: 1 })
        ));
    }

    #[test]
    fn test_empty_records_fail_training() {
        let result = Gallery::train(&MeanClassifier, &[]);
        assert!(matches!(result, Err(ClassifierError::NoTemplates)));
    }
}
