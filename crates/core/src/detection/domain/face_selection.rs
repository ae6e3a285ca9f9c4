use serde::{Deserialize, Serialize};

use crate::shared::region::Region;

/// Rule for picking the subject when a frame contains several faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceSelection {
    /// Largest box area; equal areas keep the earliest detection.
    #[default]
    Largest,
    /// First box in detector order.
    First,
}

impl FaceSelection {
    /// Picks the primary face, or `None` when there are no candidates.
    pub fn select<'a>(&self, regions: &'a [Region]) -> Option<&'a Region> {
        match self {
            FaceSelection::First => regions.first(),
            FaceSelection::Largest => {
                let mut best: Option<&Region> = None;
                for r in regions {
                    // strict comparison keeps the first of equal-area boxes
                    if best.map_or(true, |b| r.area() > b.area()) {
                        best = Some(r);
                    }
                }
                best
            }
        }
    }
}

impl std::str::FromStr for FaceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "largest" => Ok(FaceSelection::Largest),
            "first" => Ok(FaceSelection::First),
            other => Err(format!(
                "Face selection must be 'largest' or 'first', got '{other}'"
            )),
        }
    }
}

impl std::fmt::Display for FaceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaceSelection::Largest => write!(f, "largest"),
            FaceSelection::First => write!(f, "first"),
        }
    }
}
