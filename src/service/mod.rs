// Service module - the ledger as a shared, concurrently accessed resource
// Exposes the typed capability interface and publishes change events

mod contract;
mod events;
mod ledger_service;

pub use contract::{ServiceError, VotingContract};
pub use events::{LedgerEvent, LedgerEventKind};
pub use ledger_service::LedgerService;
