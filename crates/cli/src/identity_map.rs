use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use faceauth_core::enrollment::domain::enrollment_record::Identity;
use faceauth_core::session::domain::authentication_result::AuthenticationResult;

/// Maps detected enrollment names to account usernames,
/// e.g. `{ "alice_2023": "alice" }`. Unmapped names pass through.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct IdentityMap(HashMap<String, String>);

/// The printed result: the authentication record plus the enrollment name
/// that matched when a mapping changed it.
#[derive(Debug, Serialize)]
pub struct AuthOutput {
    #[serde(flatten)]
    pub result: AuthenticationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_name: Option<String>,
}

impl IdentityMap {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read mapping {}: {e}", path.display()))?;
        let map = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid mapping {}: {e}", path.display()))?;
        Ok(map)
    }

    pub fn apply(&self, mut result: AuthenticationResult) -> AuthOutput {
        let mut detected_name = None;
        if let Some(detected) = &result.username {
            let mapped = self
                .0
                .get(detected.as_str())
                .and_then(|name| Identity::new(name.as_str()));
            if let Some(mapped) = mapped.filter(|m| m != detected) {
                log::info!("Mapped '{detected}' to '{mapped}'");
                detected_name = Some(detected.to_string());
                result.username = Some(mapped);
            }
        }
        AuthOutput {
            result,
            detected_name,
        }
    }
}
