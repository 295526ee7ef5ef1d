// Election Ledger Tests
// Tests for election lifecycle, vote admission and roster/candidate edits

use votes_ledger::identity::Address;
use votes_ledger::ledger::{
    ElectionId, ElectionLedger, ElectionStatus, LedgerError, LedgerLimits, NewCandidate,
    NewElection,
};

const T0: u64 = 1_700_000_000;

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn owner() -> Address {
    addr(1)
}

fn two_candidate_election(voters: &[Address]) -> NewElection {
    NewElection::new("Election 1", 60)
        .candidates(["Alice", "Bob"])
        .voters(voters.iter().copied())
        .description("Presidential election")
}

fn ledger_with_election(voters: &[Address]) -> (ElectionLedger, ElectionId) {
    let mut ledger = ElectionLedger::new(owner());
    let id = ledger
        .create_election(&owner(), two_candidate_election(voters), T0)
        .unwrap();
    (ledger, id)
}

// ============================================================================
// CREATE ELECTION
// ============================================================================

#[test]
fn test_create_election_stores_fields() {
    let (ledger, id) = ledger_with_election(&[addr(2), addr(3)]);

    assert_eq!(id, ElectionId::new(1));
    let detail = ledger.detail_election(id, T0).unwrap();
    assert_eq!(detail.name, "Election 1");
    assert_eq!(detail.description, "Presidential election");
    assert_eq!(detail.end_time, T0 + 60 * 60);
    assert_eq!(detail.created_at, T0);
    assert_eq!(detail.candidates.len(), 2);
    assert_eq!(detail.allowed_voters.len(), 2);
    assert_eq!(detail.status, ElectionStatus::Open);
}

#[test]
fn test_create_election_ids_increase() {
    let mut ledger = ElectionLedger::new(owner());
    let first = ledger.create_election(&owner(), two_candidate_election(&[]), T0).unwrap();
    let second = ledger.create_election(&owner(), two_candidate_election(&[]), T0).unwrap();

    assert_eq!(first.value(), 1);
    assert_eq!(second.value(), 2);
    assert_eq!(ledger.election_count(), 2);
}

#[test]
fn test_create_election_requires_owner() {
    let mut ledger = ElectionLedger::new(owner());
    let result = ledger.create_election(&addr(9), two_candidate_election(&[]), T0);

    assert!(matches!(result, Err(LedgerError::Unauthorized(_))));
    assert_eq!(ledger.election_count(), 0);
    assert_eq!(ledger.version(), 0);
}

#[test]
fn test_create_election_zero_duration_rejected() {
    let mut ledger = ElectionLedger::new(owner());
    let params = NewElection::new("E", 0).candidate("Alice");

    assert!(matches!(
        ledger.create_election(&owner(), params, T0),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn test_create_election_duplicate_candidates_rejected() {
    let mut ledger = ElectionLedger::new(owner());
    let params = NewElection::new("E", 60).candidates(["Alice", "Bob", "Alice"]);

    assert!(matches!(
        ledger.create_election(&owner(), params, T0),
        Err(LedgerError::InvalidArgument(_))
    ));
    assert!(ledger.all_election_names().is_empty());
}

#[test]
fn test_create_election_empty_name_rejected() {
    let mut ledger = ElectionLedger::new(owner());
    let params = NewElection::new("  ", 60).candidate("Alice");

    assert!(matches!(
        ledger.create_election(&owner(), params, T0),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn test_create_election_without_candidates_rejected() {
    let mut ledger = ElectionLedger::new(owner());
    let params = NewElection::new("E", 60);

    assert!(matches!(
        ledger.create_election(&owner(), params, T0),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn test_create_election_huge_duration_rejected() {
    let mut ledger = ElectionLedger::new(owner());
    let params = NewElection::new("E", u64::MAX).candidate("Alice");

    assert!(matches!(
        ledger.create_election(&owner(), params, T0),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn test_create_election_respects_candidate_limit() {
    let limits = LedgerLimits {
        max_candidates: 2,
        max_voters: 10,
    };
    let mut ledger = ElectionLedger::with_limits(owner(), limits);
    let params = NewElection::new("E", 60).candidates(["A", "B", "C"]);

    assert!(matches!(
        ledger.create_election(&owner(), params, T0),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn test_create_election_keeps_image_references() {
    let mut ledger = ElectionLedger::new(owner());
    let params = NewElection::new("E", 60)
        .candidate_with_image("Alice", "https://img.example/alice.png")
        .candidate("Bob")
        .image_url("https://img.example/e.png");
    let id = ledger.create_election(&owner(), params, T0).unwrap();

    let candidates = ledger.candidates(id).unwrap();
    assert_eq!(candidates[0].image_url(), "https://img.example/alice.png");
    assert_eq!(candidates[1].image_url(), "");
    assert_eq!(ledger.all_election_names()[0].image_url, "https://img.example/e.png");
}

// ============================================================================
// VOTE
// ============================================================================

#[test]
fn test_vote_increments_candidate() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);

    ledger.vote(&voter, id, "Alice", T0 + 10).unwrap();

    assert_eq!(ledger.votes(id, "Alice").unwrap(), 1);
    assert_eq!(ledger.votes(id, "Bob").unwrap(), 0);
    assert!(ledger.has_voted(id, &voter).unwrap());
}

#[test]
fn test_vote_twice_rejected_and_counts_unchanged() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);

    ledger.vote(&voter, id, "Alice", T0).unwrap();
    let second = ledger.vote(&voter, id, "Bob", T0);

    assert_eq!(second, Err(LedgerError::AlreadyVoted(id)));
    assert_eq!(ledger.votes(id, "Alice").unwrap(), 1);
    assert_eq!(ledger.votes(id, "Bob").unwrap(), 0);
}

#[test]
fn test_vote_after_end_rejected_even_for_allowed_voter() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);

    let result = ledger.vote(&voter, id, "Alice", T0 + 60 * 60 + 1);

    assert_eq!(result, Err(LedgerError::ElectionEnded(id)));
    assert_eq!(ledger.votes(id, "Alice").unwrap(), 0);
}

#[test]
fn test_vote_after_end_rejected_for_outsider_too() {
    let (mut ledger, id) = ledger_with_election(&[addr(2)]);

    let result = ledger.vote(&addr(7), id, "Alice", T0 + 60 * 60 + 1);
    assert_eq!(result, Err(LedgerError::ElectionEnded(id)));
}

#[test]
fn test_vote_by_outsider_rejected() {
    let (mut ledger, id) = ledger_with_election(&[addr(2)]);

    let result = ledger.vote(&addr(7), id, "Alice", T0);
    assert_eq!(result, Err(LedgerError::NotAuthorizedVoter(id)));
}

#[test]
fn test_vote_unknown_candidate_rejected_without_marking_voter() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);

    let result = ledger.vote(&voter, id, "Carol", T0);
    assert!(matches!(result, Err(LedgerError::CandidateNotFound { .. })));

    // The failed attempt left no trace; the voter can still vote
    assert!(!ledger.has_voted(id, &voter).unwrap());
    ledger.vote(&voter, id, "Bob", T0).unwrap();
}

#[test]
fn test_vote_unknown_election_not_found() {
    let mut ledger = ElectionLedger::new(owner());
    let result = ledger.vote(&addr(2), ElectionId::new(42), "Alice", T0);

    assert_eq!(result, Err(LedgerError::NotFound(ElectionId::new(42))));
}

#[test]
fn test_owner_must_be_on_roster_to_vote() {
    let (mut ledger, id) = ledger_with_election(&[addr(2)]);

    assert_eq!(
        ledger.vote(&owner(), id, "Alice", T0),
        Err(LedgerError::NotAuthorizedVoter(id))
    );
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn test_candidates_keep_insertion_order() {
    let voters = [addr(2), addr(3), addr(4)];
    let (mut ledger, id) = ledger_with_election(&voters);

    // Bob ends up ahead, order must not change
    ledger.vote(&voters[0], id, "Bob", T0).unwrap();
    ledger.vote(&voters[1], id, "Bob", T0).unwrap();
    ledger.vote(&voters[2], id, "Alice", T0).unwrap();

    let names: Vec<_> = ledger
        .candidates(id)
        .unwrap()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[test]
fn test_get_votes_unknown_candidate() {
    let (ledger, id) = ledger_with_election(&[]);

    assert!(matches!(
        ledger.votes(id, "Nobody"),
        Err(LedgerError::CandidateNotFound { .. })
    ));
}

#[test]
fn test_status_transitions_with_time() {
    let (ledger, id) = ledger_with_election(&[]);

    assert_eq!(ledger.election_status(id, T0).unwrap(), ElectionStatus::Open);
    assert_eq!(ledger.election_status(id, T0 + 3_600).unwrap(), ElectionStatus::Open);
    assert_eq!(ledger.election_status(id, T0 + 3_601).unwrap(), ElectionStatus::Ended);
}

#[test]
fn test_owner_query_is_case_insensitive() {
    let owner = Address::parse("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap();
    let ledger = ElectionLedger::new(owner);
    let lower = Address::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();

    assert!(ledger.is_owner(&lower));
    assert!(!ledger.is_owner(&addr(3)));
}

#[test]
fn test_results_snapshot() {
    let voters = [addr(2), addr(3), addr(4)];
    let (mut ledger, id) = ledger_with_election(&voters);
    ledger.vote(&voters[0], id, "Alice", T0).unwrap();
    ledger.vote(&voters[1], id, "Alice", T0).unwrap();
    ledger.vote(&voters[2], id, "Bob", T0).unwrap();

    let provisional = ledger.results(id, T0).unwrap();
    assert!(!provisional.is_final());
    assert_eq!(provisional.total_votes, 3);
    assert_eq!(provisional.winner.name, "Alice");

    let final_results = ledger.results(id, T0 + 7_200).unwrap();
    assert!(final_results.is_final());
}

// ============================================================================
// SET CANDIDATES
// ============================================================================

#[test]
fn test_set_candidates_replaces_and_resets_votes() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);
    ledger.vote(&voter, id, "Alice", T0).unwrap();

    let new_list = vec![NewCandidate::new("Carol"), NewCandidate::new("Dave")];
    ledger.set_candidates(&owner(), id, &new_list, T0).unwrap();

    let candidates = ledger.candidates(id).unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name(), "Carol");
    assert!(candidates.iter().all(|c| c.votes() == 0));

    // Vote history was discarded with the old list
    assert!(!ledger.has_voted(id, &voter).unwrap());
    ledger.vote(&voter, id, "Dave", T0).unwrap();
    assert_eq!(ledger.votes(id, "Dave").unwrap(), 1);
}

#[test]
fn test_set_candidates_requires_owner() {
    let (mut ledger, id) = ledger_with_election(&[]);
    let result = ledger.set_candidates(&addr(5), id, &[NewCandidate::new("Eve")], T0);

    assert!(matches!(result, Err(LedgerError::Unauthorized(_))));
    assert_eq!(ledger.candidates(id).unwrap().len(), 2);
}

#[test]
fn test_set_candidates_validation() {
    let (mut ledger, id) = ledger_with_election(&[]);

    assert!(matches!(
        ledger.set_candidates(&owner(), id, &[], T0),
        Err(LedgerError::InvalidArgument(_))
    ));
    assert!(matches!(
        ledger.set_candidates(
            &owner(),
            id,
            &[NewCandidate::new("X"), NewCandidate::new("X")],
            T0
        ),
        Err(LedgerError::InvalidArgument(_))
    ));
    assert!(matches!(
        ledger.set_candidates(&owner(), ElectionId::new(99), &[NewCandidate::new("X")], T0),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn test_set_candidates_after_end_rejected() {
    let (mut ledger, id) = ledger_with_election(&[]);
    let result = ledger.set_candidates(&owner(), id, &[NewCandidate::new("X")], T0 + 9_999);

    assert_eq!(result, Err(LedgerError::ElectionEnded(id)));
}

// ============================================================================
// SET ALLOWED VOTERS
// ============================================================================

#[test]
fn test_set_allowed_voters_replaces_roster() {
    let (mut ledger, id) = ledger_with_election(&[addr(2), addr(3)]);

    ledger.set_allowed_voters(&owner(), id, &[addr(4), addr(5)], T0).unwrap();

    let detail = ledger.detail_election(id, T0).unwrap();
    assert_eq!(detail.allowed_voters, vec![addr(4), addr(5)]);
    assert_eq!(
        ledger.vote(&addr(2), id, "Alice", T0),
        Err(LedgerError::NotAuthorizedVoter(id))
    );
}

#[test]
fn test_voter_removed_after_voting_keeps_vote() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);
    ledger.vote(&voter, id, "Alice", T0).unwrap();

    ledger.set_allowed_voters(&owner(), id, &[addr(3)], T0).unwrap();

    assert_eq!(ledger.votes(id, "Alice").unwrap(), 1);
}

#[test]
fn test_readded_voter_cannot_vote_again() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);
    ledger.vote(&voter, id, "Alice", T0).unwrap();

    ledger.set_allowed_voters(&owner(), id, &[addr(3)], T0).unwrap();
    ledger.set_allowed_voters(&owner(), id, &[voter, addr(3)], T0).unwrap();

    assert_eq!(
        ledger.vote(&voter, id, "Bob", T0),
        Err(LedgerError::AlreadyVoted(id))
    );
}

#[test]
fn test_voter_added_later_can_vote_once() {
    let (mut ledger, id) = ledger_with_election(&[addr(2)]);
    let latecomer = addr(6);

    ledger.set_allowed_voters(&owner(), id, &[addr(2), latecomer], T0).unwrap();
    ledger.vote(&latecomer, id, "Bob", T0).unwrap();

    assert_eq!(
        ledger.vote(&latecomer, id, "Bob", T0),
        Err(LedgerError::AlreadyVoted(id))
    );
}

#[test]
fn test_set_allowed_voters_requires_owner() {
    let (mut ledger, id) = ledger_with_election(&[addr(2)]);

    assert!(matches!(
        ledger.set_allowed_voters(&addr(2), id, &[addr(2), addr(8)], T0),
        Err(LedgerError::Unauthorized(_))
    ));
}

#[test]
fn test_set_allowed_voters_empty_closes_roster() {
    let (mut ledger, id) = ledger_with_election(&[addr(2)]);
    ledger.set_allowed_voters(&owner(), id, &[], T0).unwrap();

    assert_eq!(
        ledger.vote(&addr(2), id, "Alice", T0),
        Err(LedgerError::NotAuthorizedVoter(id))
    );
}

// ============================================================================
// DELETE ELECTION
// ============================================================================

#[test]
fn test_delete_election_tombstones() {
    let voter = addr(2);
    let (mut ledger, id) = ledger_with_election(&[voter]);

    ledger.delete_election(&owner(), id).unwrap();

    assert_eq!(ledger.detail_election(id, T0), Err(LedgerError::NotFound(id)));
    assert_eq!(ledger.candidates(id), Err(LedgerError::NotFound(id)));
    assert_eq!(ledger.vote(&voter, id, "Alice", T0), Err(LedgerError::NotFound(id)));
    assert_eq!(ledger.election_winner(id), Err(LedgerError::NotFound(id)));
    assert_eq!(ledger.delete_election(&owner(), id), Err(LedgerError::NotFound(id)));
    assert!(ledger.all_election_names().iter().all(|s| s.id != id));
}

#[test]
fn test_deleted_id_never_reused() {
    let (mut ledger, id) = ledger_with_election(&[]);
    ledger.delete_election(&owner(), id).unwrap();

    let next = ledger
        .create_election(&owner(), two_candidate_election(&[]), T0)
        .unwrap();

    assert_ne!(next, id);
    assert_eq!(next.value(), 2);
    assert_eq!(ledger.all_election_names().len(), 1);
    assert_eq!(ledger.election_count(), 2);

    let stats = ledger.statistics();
    assert_eq!(stats.live_elections, 1);
    assert_eq!(stats.deleted_elections, 1);
}

#[test]
fn test_delete_election_requires_owner() {
    let (mut ledger, id) = ledger_with_election(&[]);

    assert!(matches!(
        ledger.delete_election(&addr(2), id),
        Err(LedgerError::Unauthorized(_))
    ));
    assert!(ledger.detail_election(id, T0).is_ok());
}

#[test]
fn test_list_excludes_deleted_and_is_ordered() {
    let mut ledger = ElectionLedger::new(owner());
    let a = ledger.create_election(&owner(), NewElection::new("A", 5).candidate("x"), T0).unwrap();
    let b = ledger.create_election(&owner(), NewElection::new("B", 5).candidate("x"), T0).unwrap();
    let c = ledger.create_election(&owner(), NewElection::new("C", 5).candidate("x"), T0).unwrap();
    ledger.delete_election(&owner(), b).unwrap();

    let names: Vec<_> = ledger.all_election_names().into_iter().map(|s| (s.id, s.name)).collect();
    assert_eq!(names, vec![(a, "A".to_string()), (c, "C".to_string())]);
}
