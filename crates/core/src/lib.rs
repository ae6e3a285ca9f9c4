pub mod capture;
pub mod detection;
pub mod enrollment;
pub mod recognition;
pub mod session;
pub mod shared;
