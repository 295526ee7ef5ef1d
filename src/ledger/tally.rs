// Tally - winner computation and vote totals

use crate::ledger::{Candidate, Election, ElectionId, ElectionStatus};
use crate::ledger::clock::Timestamp;
use serde::{Deserialize, Serialize};

/// Outcome of `election_winner`. A tie for first place, or an election with
/// no votes, has no winner: empty name and zero votes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub name: String,
    pub votes: u64,
}

impl Winner {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_decided(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Pick the candidate holding the unique maximum vote count
pub fn winner(candidates: &[Candidate]) -> Winner {
    let mut leader: Option<&Candidate> = None;
    let mut max_votes = 0u64;
    let mut tied = false;

    for candidate in candidates {
        if candidate.votes() > max_votes {
            max_votes = candidate.votes();
            leader = Some(candidate);
            tied = false;
        } else if candidate.votes() == max_votes && max_votes > 0 {
            tied = true;
        }
    }

    match leader {
        Some(candidate) if !tied => Winner {
            name: candidate.name().to_string(),
            votes: max_votes,
        },
        _ => Winner::none(),
    }
}

/// Sum of all candidates' votes
pub fn total_votes(candidates: &[Candidate]) -> u64 {
    candidates.iter().map(Candidate::votes).sum()
}

/// One consistent snapshot of an election's standing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub id: ElectionId,
    pub status: ElectionStatus,
    pub candidates: Vec<Candidate>,
    pub total_votes: u64,
    pub winner: Winner,
}

impl ElectionResults {
    pub fn from_election(election: &Election, now: Timestamp) -> Self {
        let candidates = election.candidates().to_vec();
        Self {
            id: election.id(),
            status: election.status(now),
            total_votes: total_votes(&candidates),
            winner: winner(&candidates),
            candidates,
        }
    }

    /// Results are final once voting has closed
    pub fn is_final(&self) -> bool {
        self.status == ElectionStatus::Ended
    }
}
