pub mod domain;
pub mod enrollment_store;
