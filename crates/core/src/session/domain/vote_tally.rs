use std::collections::BTreeMap;

use serde::Serialize;

use crate::enrollment::domain::enrollment_record::Identity;
use crate::recognition::domain::face_classifier::ScoreDirection;

/// Accepted-match count and best single-frame score for one identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteEntry {
    pub votes: u32,
    pub best_score: f64,
}

/// Serializable view of one tally entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteSnapshot {
    pub identity: Identity,
    pub votes: u32,
    pub best_score: f64,
}

/// Per-identity votes accumulated over a session.
///
/// Keys are kept sorted so iteration order never depends on insertion order.
#[derive(Debug, Clone)]
pub struct VoteTally {
    direction: ScoreDirection,
    entries: BTreeMap<Identity, VoteEntry>,
}

impl VoteTally {
    pub fn new(direction: ScoreDirection) -> Self {
        Self {
            direction,
            entries: BTreeMap::new(),
        }
    }

    /// Records one accepted frame for `identity`.
    pub fn record(&mut self, identity: &Identity, score: f64) {
        match self.entries.get_mut(identity) {
            Some(entry) => {
                entry.votes += 1;
                if self.direction.is_better(score, entry.best_score) {
                    entry.best_score = score;
                }
            }
            None => {
                self.entries.insert(
                    identity.clone(),
                    VoteEntry {
                        votes: 1,
                        best_score: score,
                    },
                );
            }
        }
    }

    pub fn direction(&self) -> ScoreDirection {
        self.direction
    }

    pub fn total_votes(&self) -> u32 {
        self.entries.values().map(|e| e.votes).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &VoteEntry)> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<VoteSnapshot> {
        self.entries
            .iter()
            .map(|(identity, e)| VoteSnapshot {
                identity: identity.clone(),
                votes: e.votes,
                best_score: e.best_score,
            })
            .collect()
    }
}
