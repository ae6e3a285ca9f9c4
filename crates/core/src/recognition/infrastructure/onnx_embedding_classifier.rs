/// ArcFace embedding classifier using ONNX Runtime.
///
/// Templates are embedded once at training time; queries are matched by
/// cosine similarity of L2-normalized embeddings, so higher scores are better.
use std::path::Path;
use std::sync::Mutex;

use crate::recognition::domain::face_classifier::{
    check_training_set, ClassifierError, FaceClassifier, Prediction, ScoreDirection, TrainedModel,
};
use crate::recognition::domain::face_template::FaceTemplate;
use crate::shared::onnx_session::build_session;

use super::math::{cosine_similarity, l2_normalize};

pub const DEFAULT_THRESHOLD: f64 = 0.4;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxEmbeddingClassifier {
    session: Mutex<ort::session::Session>,
}

impl OnnxEmbeddingClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    fn embed(&self, template: &FaceTemplate) -> Result<Vec<f64>, ClassifierError> {
        self.run(template)
            .map_err(|e| ClassifierError::Backend(e.to_string()))
    }

    fn run(&self, template: &FaceTemplate) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
        let tensor = preprocess(template);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut embedding: Vec<f64> = embedding_slice.iter().map(|&v| v as f64).collect();
        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

impl FaceClassifier for OnnxEmbeddingClassifier {
    fn score_direction(&self) -> ScoreDirection {
        ScoreDirection::HigherIsBetter
    }

    fn train(
        &self,
        templates: &[FaceTemplate],
        labels: &[u32],
    ) -> Result<TrainedModel, ClassifierError> {
        check_training_set(templates, labels)?;
        let embeddings = templates
            .iter()
            .map(|t| self.embed(t))
            .collect::<Result<Vec<_>, _>>()?;
        TrainedModel::new(embeddings, labels.to_vec())
    }

    fn predict(
        &self,
        model: &TrainedModel,
        query: &FaceTemplate,
    ) -> Result<Prediction, ClassifierError> {
        let embedding = self.embed(query)?;
        Ok(model.nearest(&embedding, self.score_direction(), cosine_similarity))
    }
}

/// Resize the grayscale template to 112x112, replicate it into three
/// channels, normalize, NCHW layout.
fn preprocess(template: &FaceTemplate) -> ndarray::Array4<f32> {
    let src = template.size() as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src as f64 / INPUT_SIZE as f64) as usize).min(src - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src as f64 / INPUT_SIZE as f64) as usize).min(src - 1);
            let v = (template.pixel(src_x as u32, src_y as u32) as f32 - NORM_MEAN) / NORM_STD;
            for c in 0..3 {
                tensor[[0, c, y, x]] = v;
            }
        }
    }

    tensor
}
