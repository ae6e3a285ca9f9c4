pub mod histogram_classifier;
pub mod lbph_classifier;
mod math;
pub mod onnx_embedding_classifier;
