pub mod face_classifier;
pub mod face_template;
pub mod gallery;
