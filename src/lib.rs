//! Election ledger: owner-administered elections, voter rosters, double-vote
//! prevention and winner computation, behind a typed capability interface.

pub mod config;
pub mod identity;
pub mod ledger;
pub mod service;
pub mod storage;
