// Ledger module - THE ELECTION STATE MACHINE
// Elections, votes, rosters, tallies and snapshot encoding

mod clock;
mod codec;
mod election;
mod error;
mod state;
mod tally;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use codec::{CodecError, LedgerCodec};
pub use election::{
    Candidate, Election, ElectionDetail, ElectionId, ElectionStatus, ElectionSummary,
    NewCandidate, NewElection,
};
#[cfg(test)]
pub(crate) use election::build_candidates;
pub use error::LedgerError;
pub(crate) use state::LedgerHeader;
pub use state::{ElectionLedger, LedgerLimits, LedgerStatistics};
pub use tally::{total_votes, winner, ElectionResults, Winner};
