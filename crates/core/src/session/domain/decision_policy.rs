use std::cmp::Ordering;

use crate::enrollment::domain::enrollment_record::Identity;

use super::vote_tally::{VoteEntry, VoteTally};

/// Session-level outcome before it is wrapped into an authentication result.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(Identity),
    /// No frame produced an accepted match.
    NoMatch,
    /// A leader exists but has fewer than `min_votes` votes.
    InsufficientEvidence { leader: Identity, votes: u32 },
}

/// Identity with the most votes.
///
/// Ties go to the better best-score under the tally's direction, then to the
/// lexicographically smaller name.
pub fn leader(tally: &VoteTally) -> Option<(&Identity, &VoteEntry)> {
    let direction = tally.direction();
    tally.iter().min_by(|(a_id, a), (b_id, b)| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| {
                if direction.is_better(a.best_score, b.best_score) {
                    Ordering::Less
                } else if direction.is_better(b.best_score, a.best_score) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a_id.cmp(b_id))
    })
}

/// Turns a vote tally into a verdict. Pure and deterministic.
pub fn resolve(tally: &VoteTally, min_votes: u32) -> Verdict {
    match leader(tally) {
        None => Verdict::NoMatch,
        Some((identity, entry)) if entry.votes < min_votes => Verdict::InsufficientEvidence {
            leader: identity.clone(),
            votes: entry.votes,
        },
        Some((identity, _)) => Verdict::Accepted(identity.clone()),
    }
}
