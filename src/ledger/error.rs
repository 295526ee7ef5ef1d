use crate::ledger::ElectionId;
use thiserror::Error;

/// Rejections of a ledger operation. None of them leave partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unauthorized: only the ledger owner may {0}")]
    Unauthorized(&'static str),

    #[error("Election {0} not found")]
    NotFound(ElectionId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Election {0} has ended")]
    ElectionEnded(ElectionId),

    #[error("Caller is not an allowed voter in election {0}")]
    NotAuthorizedVoter(ElectionId),

    #[error("You have already voted in election {0}")]
    AlreadyVoted(ElectionId),

    #[error("Candidate '{name}' not found in election {election}")]
    CandidateNotFound { election: ElectionId, name: String },
}

impl LedgerError {
    /// Stable name of the error kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "Unauthorized",
            Self::NotFound(_) => "NotFound",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::ElectionEnded(_) => "ElectionEnded",
            Self::NotAuthorizedVoter(_) => "NotAuthorizedVoter",
            Self::AlreadyVoted(_) => "AlreadyVoted",
            Self::CandidateNotFound { .. } => "CandidateNotFound",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
