// VotingContract - the typed capability surface of the ledger
//
// Front-ends depend on this trait, never on a concrete ledger handle.

use crate::config::ConfigError;
use crate::identity::Address;
use crate::ledger::{
    Candidate, ElectionDetail, ElectionId, ElectionResults, ElectionStatus, ElectionSummary,
    LedgerError, NewCandidate, NewElection, Winner,
};
use crate::storage::StoreError;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a ledger service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No ledger initialised in {0}")]
    NotInitialized(PathBuf),

    #[error("A ledger already exists in {0}")]
    AlreadyInitialized(PathBuf),
}

impl ServiceError {
    /// The ledger rejection behind this error, if any
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

/// Operations of the election ledger. Mutating calls carry the caller identity
/// supplied by the authentication layer; the ledger only authorizes it.
#[async_trait]
pub trait VotingContract: Send + Sync {
    async fn create_election(&self, caller: &Address, params: NewElection) -> Result<ElectionId, ServiceError>;

    async fn vote(&self, caller: &Address, id: ElectionId, candidate: &str) -> Result<(), ServiceError>;

    async fn set_candidates(
        &self,
        caller: &Address,
        id: ElectionId,
        candidates: Vec<NewCandidate>,
    ) -> Result<(), ServiceError>;

    async fn set_allowed_voters(
        &self,
        caller: &Address,
        id: ElectionId,
        voters: Vec<Address>,
    ) -> Result<(), ServiceError>;

    async fn delete_election(&self, caller: &Address, id: ElectionId) -> Result<(), ServiceError>;

    async fn detail_election(&self, id: ElectionId) -> Result<ElectionDetail, ServiceError>;

    async fn get_candidates(&self, id: ElectionId) -> Result<Vec<Candidate>, ServiceError>;

    async fn get_votes(&self, id: ElectionId, candidate: &str) -> Result<u64, ServiceError>;

    async fn get_all_election_names(&self) -> Vec<ElectionSummary>;

    async fn get_election_winner(&self, id: ElectionId) -> Result<Winner, ServiceError>;

    async fn owner(&self) -> Address;

    async fn election_count(&self) -> u64;

    async fn election_status(&self, id: ElectionId) -> Result<ElectionStatus, ServiceError>;

    async fn has_voted(&self, id: ElectionId, voter: &Address) -> Result<bool, ServiceError>;

    async fn results(&self, id: ElectionId) -> Result<ElectionResults, ServiceError>;
}
