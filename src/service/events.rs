use crate::identity::Address;
use crate::ledger::{ElectionId, Timestamp};
use serde::{Deserialize, Serialize};

/// What a successful transition changed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    ElectionCreated { id: ElectionId, name: String },
    VoteCast { id: ElectionId, voter: Address, candidate: String },
    CandidatesReplaced { id: ElectionId, count: usize },
    VotersReplaced { id: ElectionId, count: usize },
    ElectionDeleted { id: ElectionId },
}

impl LedgerEventKind {
    pub fn election_id(&self) -> ElectionId {
        match self {
            Self::ElectionCreated { id, .. }
            | Self::VoteCast { id, .. }
            | Self::CandidatesReplaced { id, .. }
            | Self::VotersReplaced { id, .. }
            | Self::ElectionDeleted { id } => *id,
        }
    }
}

/// Notification published after a transition has been applied (and persisted)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Ledger version after the transition
    pub version: u64,
    pub at: Timestamp,
    pub kind: LedgerEventKind,
}
