use serde::{Deserialize, Serialize};

use crate::recognition::domain::face_template::FaceTemplate;

/// A registered person, named by the stem of their reference photo.
///
/// Always non-empty. Case is preserved exactly as found on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One enrolled identity: its dense classifier label and face template.
#[derive(Debug, Clone)]
pub struct EnrollmentRecord {
    pub identity: Identity,
    pub label: u32,
    pub template: FaceTemplate,
}
