// Election records - candidates, voter roster and per-election vote flags

use crate::identity::Address;
use crate::ledger::clock::Timestamp;
use crate::ledger::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

// ============================================================================
// ELECTION ID
// ============================================================================

/// Identifier of an election. Allocated from 1 upwards and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElectionId(u64);

impl ElectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The following id, or `None` once the id space is exhausted
    pub(crate) fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for ElectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ElectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// CANDIDATES
// ============================================================================

/// A candidate as submitted by the owner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    pub name: String,
    pub image_url: String,
}

impl NewCandidate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            image_url: String::new(),
        }
    }

    pub fn with_image(name: &str, image_url: &str) -> Self {
        Self {
            name: name.to_string(),
            image_url: image_url.to_string(),
        }
    }
}

impl From<&str> for NewCandidate {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A candidate and its running vote count
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    name: String,
    image_url: String,
    votes: u64,
}

impl Candidate {
    fn from_new(candidate: &NewCandidate) -> Self {
        Self {
            name: candidate.name.clone(),
            image_url: candidate.image_url.clone(),
            votes: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn votes(&self) -> u64 {
        self.votes
    }
}

/// Validate a candidate list and seed every entry with zero votes
pub(crate) fn build_candidates(
    candidates: &[NewCandidate],
    max_candidates: usize,
) -> Result<Vec<Candidate>, LedgerError> {
    if candidates.is_empty() {
        return Err(LedgerError::invalid("at least one candidate is required"));
    }
    if candidates.len() > max_candidates {
        return Err(LedgerError::invalid(format!(
            "too many candidates: {} (limit {})",
            candidates.len(),
            max_candidates
        )));
    }

    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.name.trim().is_empty() {
            return Err(LedgerError::invalid("candidate name cannot be empty"));
        }
        if !seen.insert(candidate.name.as_str()) {
            return Err(LedgerError::invalid(format!(
                "duplicate candidate name '{}'",
                candidate.name
            )));
        }
    }

    Ok(candidates.iter().map(Candidate::from_new).collect())
}

/// Validate a voter roster; duplicates collapse
pub(crate) fn build_roster(
    voters: &[Address],
    max_voters: usize,
) -> Result<BTreeSet<Address>, LedgerError> {
    let roster: BTreeSet<Address> = voters.iter().copied().collect();
    if roster.len() > max_voters {
        return Err(LedgerError::invalid(format!(
            "too many voters: {} (limit {})",
            roster.len(),
            max_voters
        )));
    }
    Ok(roster)
}

// ============================================================================
// NEW ELECTION
// ============================================================================

/// Arguments of `create_election`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewElection {
    pub name: String,
    pub duration_minutes: u64,
    pub candidates: Vec<NewCandidate>,
    pub allowed_voters: Vec<Address>,
    pub description: String,
    pub image_url: String,
}

impl NewElection {
    pub fn new(name: &str, duration_minutes: u64) -> Self {
        Self {
            name: name.to_string(),
            duration_minutes,
            ..Self::default()
        }
    }

    pub fn candidate(mut self, name: &str) -> Self {
        self.candidates.push(NewCandidate::new(name));
        self
    }

    pub fn candidate_with_image(mut self, name: &str, image_url: &str) -> Self {
        self.candidates.push(NewCandidate::with_image(name, image_url));
        self
    }

    pub fn candidates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.candidates
            .extend(names.into_iter().map(|n| NewCandidate::new(n.as_ref())));
        self
    }

    pub fn voter(mut self, voter: Address) -> Self {
        self.allowed_voters.push(voter);
        self
    }

    pub fn voters<I: IntoIterator<Item = Address>>(mut self, voters: I) -> Self {
        self.allowed_voters.extend(voters);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn image_url(mut self, image_url: &str) -> Self {
        self.image_url = image_url.to_string();
        self
    }
}

// ============================================================================
// ELECTION
// ============================================================================

/// Lifecycle state of an election at a given time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStatus {
    /// Accepting votes (now <= end time)
    Open,
    /// Voting closed; results are final
    Ended,
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Stored election record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    id: ElectionId,
    name: String,
    description: String,
    image_url: String,
    created_at: Timestamp,
    end_time: Timestamp,
    exists: bool,
    candidates: Vec<Candidate>,
    allowed_voters: BTreeSet<Address>,
    /// Voters whose vote has been counted
    has_voted: BTreeSet<Address>,
}

impl Election {
    pub(crate) fn new(
        id: ElectionId,
        params: &NewElection,
        candidates: Vec<Candidate>,
        allowed_voters: BTreeSet<Address>,
        created_at: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            id,
            name: params.name.clone(),
            description: params.description.clone(),
            image_url: params.image_url.clone(),
            created_at,
            end_time,
            exists: true,
            candidates,
            allowed_voters,
            has_voted: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn allowed_voters(&self) -> &BTreeSet<Address> {
        &self.allowed_voters
    }

    pub fn status(&self, now: Timestamp) -> ElectionStatus {
        if now <= self.end_time {
            ElectionStatus::Open
        } else {
            ElectionStatus::Ended
        }
    }

    pub fn is_open(&self, now: Timestamp) -> bool {
        self.exists && self.status(now) == ElectionStatus::Open
    }

    pub fn is_allowed(&self, voter: &Address) -> bool {
        self.allowed_voters.contains(voter)
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.has_voted.contains(voter)
    }

    /// Number of voters whose vote has been counted
    pub fn voted_count(&self) -> usize {
        self.has_voted.len()
    }

    pub fn candidate(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    pub(crate) fn candidate_index(&self, name: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.name == name)
    }

    /// Count a vote. Callers have already checked every admission rule.
    pub(crate) fn record_vote(&mut self, candidate_index: usize, voter: Address) {
        self.candidates[candidate_index].votes += 1;
        self.has_voted.insert(voter);
    }

    /// Replace the candidate list; vote history of the old list is dropped
    pub(crate) fn replace_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.has_voted.clear();
    }

    /// Replace the roster; vote flags are kept so re-added voters cannot vote twice
    pub(crate) fn replace_voters(&mut self, voters: BTreeSet<Address>) {
        self.allowed_voters = voters;
    }

    pub(crate) fn tombstone(&mut self) {
        self.exists = false;
    }

    /// Check the invariants a stored record must satisfy
    pub(crate) fn check_integrity(&self) -> Result<(), String> {
        if self.candidates.is_empty() {
            return Err(format!("election {} has no candidates", self.id));
        }
        let mut seen = HashSet::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            if candidate.name.trim().is_empty() {
                return Err(format!("election {} has an unnamed candidate", self.id));
            }
            if !seen.insert(candidate.name.as_str()) {
                return Err(format!(
                    "election {} lists candidate '{}' twice",
                    self.id, candidate.name
                ));
            }
        }

        let counted = self
            .candidates
            .iter()
            .try_fold(0u64, |sum, c| sum.checked_add(c.votes))
            .ok_or_else(|| format!("election {} vote total overflows", self.id))?;
        if counted != self.has_voted.len() as u64 {
            return Err(format!(
                "election {} counts {} votes but {} voters",
                self.id,
                counted,
                self.has_voted.len()
            ));
        }
        if self.end_time < self.created_at {
            return Err(format!("election {} ends before it was created", self.id));
        }
        Ok(())
    }

    pub fn detail(&self, now: Timestamp) -> ElectionDetail {
        ElectionDetail {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            created_at: self.created_at,
            end_time: self.end_time,
            candidates: self.candidates.clone(),
            allowed_voters: self.allowed_voters.iter().copied().collect(),
            status: self.status(now),
        }
    }

    pub fn summary(&self) -> ElectionSummary {
        ElectionSummary {
            id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

// ============================================================================
// READ VIEWS
// ============================================================================

/// Full read view returned by `detail_election`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDetail {
    pub id: ElectionId,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub created_at: Timestamp,
    pub end_time: Timestamp,
    pub candidates: Vec<Candidate>,
    pub allowed_voters: Vec<Address>,
    pub status: ElectionStatus,
}

/// Entry of `all_election_names`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub name: String,
    pub image_url: String,
}
