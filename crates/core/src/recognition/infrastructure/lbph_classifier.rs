/// Local Binary Pattern Histogram classifier.
///
/// Each template becomes a grid of 256-bin LBP histograms (radius 1,
/// 8 neighbours). Queries are matched to the nearest enrolled template by
/// chi-square distance, so lower scores are better.
use crate::recognition::domain::face_classifier::{
    check_training_set, ClassifierError, FaceClassifier, Prediction, ScoreDirection, TrainedModel,
};
use crate::recognition::domain::face_template::FaceTemplate;

use super::math::chi_square;

pub use crate::shared::constants::DEFAULT_THRESHOLD;

const DEFAULT_GRID: u32 = 8;
const BINS: usize = 256;

pub struct LbphClassifier {
    grid_x: u32,
    grid_y: u32,
}

impl LbphClassifier {
    pub fn new(grid_x: u32, grid_y: u32) -> Self {
        Self {
            grid_x: grid_x.max(1),
            grid_y: grid_y.max(1),
        }
    }

    fn min_template_size(&self) -> u32 {
        self.grid_x.max(self.grid_y) + 2
    }

    fn extract(&self, template: &FaceTemplate) -> Result<Vec<f64>, ClassifierError> {
        let min = self.min_template_size();
        if template.size() < min {
            return Err(ClassifierError::TemplateTooSmall {
                size: template.size(),
                min,
            });
        }
        let (codes, side) = lbp_image(template);
        Ok(spatial_histogram(&codes, side, self.grid_x, self.grid_y))
    }
}

impl Default for LbphClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_GRID, DEFAULT_GRID)
    }
}

impl FaceClassifier for LbphClassifier {
    fn score_direction(&self) -> ScoreDirection {
        ScoreDirection::LowerIsBetter
    }

    fn train(
        &self,
        templates: &[FaceTemplate],
        labels: &[u32],
    ) -> Result<TrainedModel, ClassifierError> {
        check_training_set(templates, labels)?;
        let features = templates
            .iter()
            .map(|t| self.extract(t))
            .collect::<Result<Vec<_>, _>>()?;
        TrainedModel::new(features, labels.to_vec())
    }

    fn predict(
        &self,
        model: &TrainedModel,
        query: &FaceTemplate,
    ) -> Result<Prediction, ClassifierError> {
        let feature = self.extract(query)?;
        Ok(model.nearest(&feature, self.score_direction(), chi_square))
    }
}

/// Computes the LBP code of every interior pixel.
///
/// Neighbours are visited clockwise from the top-left; a bit is set when the
/// neighbour is at least as bright as the centre. Returns the
/// `(side - 2)²` code image and its side length.
fn lbp_image(template: &FaceTemplate) -> (Vec<u8>, u32) {
    const OFFSETS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
    ];

    let size = template.size();
    let side = size - 2;
    let mut codes = Vec::with_capacity((side * side) as usize);
    for y in 1..size - 1 {
        for x in 1..size - 1 {
            let center = template.pixel(x, y);
            let mut code = 0u8;
            for (bit, (dx, dy)) in OFFSETS.iter().enumerate() {
                let n = template.pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32);
                if n >= center {
                    code |= 1 << (7 - bit);
                }
            }
            codes.push(code);
        }
    }
    (codes, side)
}

/// Concatenates per-cell LBP histograms, each normalized by its pixel count.
///
/// Pixels past the last full cell on the right or bottom edge are ignored.
fn spatial_histogram(codes: &[u8], side: u32, grid_x: u32, grid_y: u32) -> Vec<f64> {
    let cell_w = side / grid_x;
    let cell_h = side / grid_y;
    let cell_pixels = (cell_w * cell_h) as f64;
    let mut hist = vec![0.0f64; (grid_x * grid_y) as usize * BINS];

    for gy in 0..grid_y {
        for gx in 0..grid_x {
            let base = ((gy * grid_x + gx) as usize) * BINS;
            for y in gy * cell_h..(gy + 1) * cell_h {
                for x in gx * cell_w..(gx + 1) * cell_w {
                    let code = codes[(y * side + x) as usize];
                    hist[base + code as usize] += 1.0;
                }
            }
            for v in &mut hist[base..base + BINS] {
                *v /= cell_pixels;
            }
        }
    }
    hist
}
