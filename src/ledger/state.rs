// Election Ledger - the authoritative election state machine
//
// Every transition takes the caller and the current time explicitly and
// validates everything before it mutates anything.

use crate::identity::Address;
use crate::ledger::clock::Timestamp;
use crate::ledger::election::{build_candidates, build_roster};
use crate::ledger::tally::{self, ElectionResults, Winner};
use crate::ledger::{
    Candidate, Election, ElectionDetail, ElectionId, ElectionStatus, ElectionSummary,
    LedgerError, NewCandidate, NewElection,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Size limits applied to submitted lists
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLimits {
    pub max_candidates: usize,
    pub max_voters: usize,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_candidates: 64,
            max_voters: 10_000,
        }
    }
}

/// Statistics about the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerStatistics {
    pub live_elections: usize,
    pub deleted_elections: usize,
    pub total_votes: u64,
}

/// Ledger-wide fields, stored apart from the election records
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LedgerHeader {
    pub owner: Address,
    pub next_id: ElectionId,
    pub limits: LedgerLimits,
    pub version: u64,
}

/// State needed to undo one transition on one election
#[derive(Debug)]
pub(crate) struct LedgerCheckpoint {
    header: LedgerHeader,
    id: ElectionId,
    election: Option<Election>,
}

/// The election ledger: one owner and every election ever created
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionLedger {
    owner: Address,
    /// All elections by id, tombstones included
    elections: BTreeMap<ElectionId, Election>,
    /// Id the next created election receives
    next_id: ElectionId,
    limits: LedgerLimits,
    /// Bumped by every successful transition
    version: u64,
}

impl ElectionLedger {
    /// Create an empty ledger administered by `owner`
    pub fn new(owner: Address) -> Self {
        Self::with_limits(owner, LedgerLimits::default())
    }

    pub fn with_limits(owner: Address, limits: LedgerLimits) -> Self {
        Self {
            owner,
            elections: BTreeMap::new(),
            next_id: ElectionId::new(1),
            limits,
            version: 0,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_owner(&self, identity: &Address) -> bool {
        self.owner == *identity
    }

    pub fn limits(&self) -> &LedgerLimits {
        &self.limits
    }

    pub(crate) fn set_limits(&mut self, limits: LedgerLimits) {
        self.limits = limits;
    }

    /// Current version (logical clock)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of ids ever allocated, deleted elections included
    pub fn election_count(&self) -> u64 {
        self.next_id.value().saturating_sub(1)
    }

    /// Check the invariants a ledger rebuilt from storage must satisfy
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.next_id.value() == 0 {
            return Err(LedgerError::invalid("next election id must be at least 1"));
        }
        for (key, election) in &self.elections {
            if *key != election.id() {
                return Err(LedgerError::invalid(format!(
                    "election {} stored under id {}",
                    election.id(),
                    key
                )));
            }
            if *key >= self.next_id {
                return Err(LedgerError::invalid(format!(
                    "election {} is not below next id {}",
                    key, self.next_id
                )));
            }
            election.check_integrity().map_err(LedgerError::InvalidArgument)?;
        }
        Ok(())
    }

    pub(crate) fn header(&self) -> LedgerHeader {
        LedgerHeader {
            owner: self.owner,
            next_id: self.next_id,
            limits: self.limits,
            version: self.version,
        }
    }

    /// Rebuild a ledger from its header and election records
    pub(crate) fn from_parts<I>(header: LedgerHeader, elections: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = Election>,
    {
        let mut map = BTreeMap::new();
        for election in elections {
            let id = election.id();
            if map.insert(id, election).is_some() {
                return Err(LedgerError::invalid(format!("election {} stored twice", id)));
            }
        }
        let ledger = Self {
            owner: header.owner,
            elections: map,
            next_id: header.next_id,
            limits: header.limits,
            version: header.version,
        };
        ledger.validate()?;
        Ok(ledger)
    }

    /// All records, tombstones included, in id order
    pub(crate) fn records(&self) -> impl Iterator<Item = &Election> {
        self.elections.values()
    }

    /// The record stored under `id`, tombstone or not
    pub(crate) fn record(&self, id: ElectionId) -> Option<&Election> {
        self.elections.get(&id)
    }

    /// Capture what a transition on `target` can change. `None` stands for
    /// the election the next `create_election` would allocate.
    pub(crate) fn checkpoint(&self, target: Option<ElectionId>) -> LedgerCheckpoint {
        let id = target.unwrap_or(self.next_id);
        LedgerCheckpoint {
            header: self.header(),
            id,
            election: self.elections.get(&id).cloned(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: LedgerCheckpoint) {
        let LedgerCheckpoint { header, id, election } = checkpoint;
        self.owner = header.owner;
        self.next_id = header.next_id;
        self.limits = header.limits;
        self.version = header.version;
        match election {
            Some(election) => {
                self.elections.insert(id, election);
            }
            None => {
                self.elections.remove(&id);
            }
        }
    }

    fn require_owner(&self, caller: &Address, action: &'static str) -> Result<(), LedgerError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(action))
        }
    }

    /// Look up a live election
    pub fn election(&self, id: ElectionId) -> Result<&Election, LedgerError> {
        self.elections
            .get(&id)
            .filter(|e| e.exists())
            .ok_or(LedgerError::NotFound(id))
    }

    fn election_mut(&mut self, id: ElectionId) -> Result<&mut Election, LedgerError> {
        self.elections
            .get_mut(&id)
            .filter(|e| e.exists())
            .ok_or(LedgerError::NotFound(id))
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Create an election; returns its id
    pub fn create_election(
        &mut self,
        caller: &Address,
        params: NewElection,
        now: Timestamp,
    ) -> Result<ElectionId, LedgerError> {
        self.require_owner(caller, "create elections")?;

        if params.name.trim().is_empty() {
            return Err(LedgerError::invalid("election name cannot be empty"));
        }
        if params.duration_minutes == 0 {
            return Err(LedgerError::invalid("duration must be greater than zero"));
        }
        let end_time = params
            .duration_minutes
            .checked_mul(60)
            .and_then(|secs| now.checked_add(secs))
            .ok_or_else(|| LedgerError::invalid("duration is too large"))?;

        let candidates = build_candidates(&params.candidates, self.limits.max_candidates)?;
        let roster = build_roster(&params.allowed_voters, self.limits.max_voters)?;

        let id = self.next_id;
        let next_id = id
            .next()
            .ok_or_else(|| LedgerError::invalid("election ids exhausted"))?;
        let election = Election::new(id, &params, candidates, roster, now, end_time);
        self.elections.insert(id, election);
        self.next_id = next_id;
        self.version += 1;

        info!(
            election = %id,
            name = %params.name,
            end_time,
            candidates = params.candidates.len(),
            "election created"
        );
        Ok(id)
    }

    /// Cast the caller's vote for `candidate`
    pub fn vote(
        &mut self,
        caller: &Address,
        id: ElectionId,
        candidate: &str,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let election = self.election_mut(id)?;

        if !election.is_open(now) {
            return Err(LedgerError::ElectionEnded(id));
        }
        if !election.is_allowed(caller) {
            return Err(LedgerError::NotAuthorizedVoter(id));
        }
        if election.has_voted(caller) {
            return Err(LedgerError::AlreadyVoted(id));
        }
        let index = election
            .candidate_index(candidate)
            .ok_or_else(|| LedgerError::CandidateNotFound {
                election: id,
                name: candidate.to_string(),
            })?;

        election.record_vote(index, *caller);
        self.version += 1;

        debug!(election = %id, voter = %caller.short(), candidate, "vote recorded");
        Ok(())
    }

    /// Replace the candidate list wholesale. Resets all votes of the election.
    pub fn set_candidates(
        &mut self,
        caller: &Address,
        id: ElectionId,
        candidates: &[NewCandidate],
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller, "edit candidates")?;
        let max_candidates = self.limits.max_candidates;
        let election = self.election_mut(id)?;
        if !election.is_open(now) {
            return Err(LedgerError::ElectionEnded(id));
        }

        let built = build_candidates(candidates, max_candidates)?;
        election.replace_candidates(built);
        self.version += 1;

        info!(election = %id, candidates = candidates.len(), "candidates replaced");
        Ok(())
    }

    /// Replace the voter roster wholesale. Existing vote flags are kept.
    pub fn set_allowed_voters(
        &mut self,
        caller: &Address,
        id: ElectionId,
        voters: &[Address],
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller, "edit voters")?;
        let max_voters = self.limits.max_voters;
        let election = self.election_mut(id)?;
        if !election.is_open(now) {
            return Err(LedgerError::ElectionEnded(id));
        }

        let roster = build_roster(voters, max_voters)?;
        let size = roster.len();
        election.replace_voters(roster);
        self.version += 1;

        info!(election = %id, voters = size, "allowed voters replaced");
        Ok(())
    }

    /// Tombstone an election; its id is never handed out again
    pub fn delete_election(&mut self, caller: &Address, id: ElectionId) -> Result<(), LedgerError> {
        self.require_owner(caller, "delete elections")?;
        self.election_mut(id)?.tombstone();
        self.version += 1;

        info!(election = %id, "election deleted");
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn detail_election(&self, id: ElectionId, now: Timestamp) -> Result<ElectionDetail, LedgerError> {
        Ok(self.election(id)?.detail(now))
    }

    /// Candidates in insertion order
    pub fn candidates(&self, id: ElectionId) -> Result<Vec<Candidate>, LedgerError> {
        Ok(self.election(id)?.candidates().to_vec())
    }

    pub fn votes(&self, id: ElectionId, candidate: &str) -> Result<u64, LedgerError> {
        self.election(id)?
            .candidate(candidate)
            .map(Candidate::votes)
            .ok_or_else(|| LedgerError::CandidateNotFound {
                election: id,
                name: candidate.to_string(),
            })
    }

    /// Live elections in ascending id order
    pub fn all_election_names(&self) -> Vec<ElectionSummary> {
        self.elections
            .values()
            .filter(|e| e.exists())
            .map(Election::summary)
            .collect()
    }

    pub fn election_winner(&self, id: ElectionId) -> Result<Winner, LedgerError> {
        Ok(tally::winner(self.election(id)?.candidates()))
    }

    pub fn election_status(&self, id: ElectionId, now: Timestamp) -> Result<ElectionStatus, LedgerError> {
        Ok(self.election(id)?.status(now))
    }

    pub fn has_voted(&self, id: ElectionId, voter: &Address) -> Result<bool, LedgerError> {
        Ok(self.election(id)?.has_voted(voter))
    }

    pub fn results(&self, id: ElectionId, now: Timestamp) -> Result<ElectionResults, LedgerError> {
        Ok(ElectionResults::from_election(self.election(id)?, now))
    }

    /// Get statistics about the ledger
    pub fn statistics(&self) -> LedgerStatistics {
        let live_elections = self.elections.values().filter(|e| e.exists()).count();
        let total_votes = self
            .elections
            .values()
            .filter(|e| e.exists())
            .map(|e| tally::total_votes(e.candidates()))
            .sum();

        LedgerStatistics {
            live_elections,
            deleted_elections: self.elections.len() - live_elections,
            total_votes,
        }
    }
}
