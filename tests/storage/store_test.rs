// Store Tests
// Tests for the sled-backed ledger and account store

use tempfile::TempDir;
use votes_ledger::identity::{Address, Keypair};
use votes_ledger::ledger::{ElectionLedger, NewElection};
use votes_ledger::storage::{LedgerStore, StoreError};

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

/// Test: A fresh store holds nothing
#[test]
fn test_open_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();

    assert!(store.is_empty().unwrap());
    assert!(!store.has_ledger().unwrap());
    assert!(store.load_ledger().unwrap().is_none());
    assert!(store.account_labels().unwrap().is_empty());
}

/// Test: Ledger with elections and votes survives reopening
#[test]
fn test_ledger_roundtrip_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let owner = addr(1);
    let voter = addr(2);

    let mut ledger = ElectionLedger::new(owner);
    let id = ledger
        .create_election(
            &owner,
            NewElection::new("Stored", 30)
                .candidate_with_image("Alice", "https://img.example/alice.png")
                .candidate("Bob")
                .voter(voter),
            100,
        )
        .unwrap();
    ledger.vote(&voter, id, "Alice", 200).unwrap();

    {
        let store = LedgerStore::open(temp_dir.path()).unwrap();
        store.save_ledger(&ledger).unwrap();
        store.flush().unwrap();
    }

    let store = LedgerStore::open(temp_dir.path()).unwrap();
    assert!(store.has_ledger().unwrap());
    let loaded = store.load_ledger().unwrap().unwrap();
    assert_eq!(loaded, ledger);
    assert_eq!(loaded.votes(id, "Alice").unwrap(), 1);
    assert!(loaded.has_voted(id, &voter).unwrap());
}

/// Test: Saving again replaces the previous snapshot
#[test]
fn test_save_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let owner = addr(1);

    let mut ledger = ElectionLedger::new(owner);
    store.save_ledger(&ledger).unwrap();

    ledger
        .create_election(&owner, NewElection::new("Later", 5).candidate("A"), 0)
        .unwrap();
    store.save_ledger(&ledger).unwrap();

    let loaded = store.load_ledger().unwrap().unwrap();
    assert_eq!(loaded.version(), 1);
    assert_eq!(loaded.election_count(), 1);
}

/// Test: Accounts are stored by label and listed in order
#[test]
fn test_accounts() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();

    let alice = Keypair::generate();
    let bob = Keypair::generate();
    store.save_account("bob", &bob).unwrap();
    store.save_account("alice", &alice).unwrap();

    assert_eq!(store.account_labels().unwrap(), vec!["alice", "bob"]);
    assert_eq!(
        store.load_account("alice").unwrap().unwrap().address(),
        alice.address()
    );
    assert!(store.load_account("carol").unwrap().is_none());
}

/// Test: Accounts and ledger live side by side
#[test]
fn test_accounts_do_not_clash_with_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();

    let owner = Keypair::generate();
    store.save_account("owner", &owner).unwrap();
    store
        .save_ledger(&ElectionLedger::new(owner.address()))
        .unwrap();

    assert_eq!(store.account_labels().unwrap(), vec!["owner"]);
    assert_eq!(store.stats().unwrap().key_count, 2);
    assert_eq!(
        store.load_ledger().unwrap().unwrap().owner(),
        &owner.address()
    );
}

/// Test: A corrupt snapshot is reported, not silently dropped
#[test]
fn test_corrupt_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    {
        let db = sled::open(temp_dir.path()).unwrap();
        db.insert(&b"ledger:header"[..], &[0xff, 0xff, 0xff][..]).unwrap();
        db.flush().unwrap();
    }

    let store = LedgerStore::open(temp_dir.path()).unwrap();
    assert!(matches!(
        store.load_ledger(),
        Err(StoreError::DeserializationFailed(_))
    ));
}

/// Test: A header whose next id falls behind the stored elections is refused
#[test]
fn test_header_behind_elections_refused() {
    let owner = addr(1);
    let fresh_dir = TempDir::new().unwrap();
    let fresh_header = {
        let store = LedgerStore::open(fresh_dir.path()).unwrap();
        store.save_ledger(&ElectionLedger::new(owner)).unwrap();
        store.flush().unwrap();
        drop(store);
        let db = sled::open(fresh_dir.path()).unwrap();
        db.get(b"ledger:header").unwrap().unwrap()
    };

    let temp_dir = TempDir::new().unwrap();
    {
        let mut ledger = ElectionLedger::new(owner);
        ledger
            .create_election(&owner, NewElection::new("Kept", 5).candidate("A"), 0)
            .unwrap();
        let store = LedgerStore::open(temp_dir.path()).unwrap();
        store.save_ledger(&ledger).unwrap();
        store.flush().unwrap();
    }
    {
        // Header says no id was ever handed out, yet election 1 exists
        let db = sled::open(temp_dir.path()).unwrap();
        db.insert(&b"ledger:header"[..], fresh_header).unwrap();
        db.flush().unwrap();
    }

    let store = LedgerStore::open(temp_dir.path()).unwrap();
    assert!(matches!(
        store.load_ledger(),
        Err(StoreError::DeserializationFailed(_))
    ));
}

/// Test: Saving one election leaves the others untouched
#[test]
fn test_save_single_election() {
    let temp_dir = TempDir::new().unwrap();
    let store = LedgerStore::open(temp_dir.path()).unwrap();
    let owner = addr(1);
    let voter = addr(2);

    let mut ledger = ElectionLedger::new(owner);
    let first = ledger
        .create_election(&owner, NewElection::new("First", 30).candidate("A").voter(voter), 0)
        .unwrap();
    ledger
        .create_election(&owner, NewElection::new("Second", 30).candidate("B"), 0)
        .unwrap();
    store.save_ledger(&ledger).unwrap();

    ledger.vote(&voter, first, "A", 10).unwrap();
    store.save_election(&ledger, first).unwrap();

    assert_eq!(store.load_ledger().unwrap(), Some(ledger));
}
