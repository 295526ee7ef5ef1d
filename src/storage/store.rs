// LedgerStore - Persistent key-value storage using sled
//
// Provides typed access for storing:
// - The ledger header (owner, next id, limits, version)
// - One record per election, keyed by id
// - Labelled wallet keypairs (local accounts for the CLI)

use crate::identity::Keypair;
use crate::ledger::{CodecError, Election, ElectionId, ElectionLedger, LedgerCodec, LedgerHeader};
use std::path::Path;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Key prefixes for organizing data
mod keys {
    pub const LEDGER_HEADER: &[u8] = b"ledger:header";
    pub const ELECTION_PREFIX: &[u8] = b"ledger:election:";
    pub const ACCOUNT_PREFIX: &[u8] = b"account:keypair:";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EncodeError(msg) => StoreError::SerializationFailed(msg),
            other => StoreError::DeserializationFailed(other.to_string()),
        }
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store for the ledger and local accounts
///
/// Uses sled for crash-safe, embedded storage.
/// All writes are atomic and durable after flush.
pub struct LedgerStore {
    db: sled::Db,
    #[cfg(test)]
    refuse_writes: AtomicBool,
}

impl LedgerStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self {
            db,
            #[cfg(test)]
            refuse_writes: AtomicBool::new(false),
        })
    }

    /// Make every ledger write fail until switched off again
    #[cfg(test)]
    pub(crate) fn refuse_writes(&self, refuse: bool) {
        self.refuse_writes.store(refuse, Ordering::SeqCst);
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn apply(&self, batch: sled::Batch) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.refuse_writes.load(Ordering::SeqCst) {
            return Err(StoreError::DatabaseError("writes refused".to_string()));
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    // ========================================================================
    // LEDGER PERSISTENCE
    // ========================================================================

    fn election_key(id: ElectionId) -> Vec<u8> {
        [keys::ELECTION_PREFIX, &id.value().to_be_bytes()[..]].concat()
    }

    fn write_header(batch: &mut sled::Batch, ledger: &ElectionLedger) -> Result<(), StoreError> {
        batch.insert(keys::LEDGER_HEADER, LedgerCodec::to_bytes(&ledger.header())?);
        Ok(())
    }

    fn write_election(batch: &mut sled::Batch, election: &Election) -> Result<(), StoreError> {
        batch.insert(Self::election_key(election.id()), LedgerCodec::to_bytes(election)?);
        Ok(())
    }

    /// Replace everything stored for the ledger with `ledger`
    pub fn save_ledger(&self, ledger: &ElectionLedger) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for result in self.db.scan_prefix(keys::ELECTION_PREFIX) {
            let (key, _) = result?;
            batch.remove(key);
        }
        Self::write_header(&mut batch, ledger)?;
        for election in ledger.records() {
            Self::write_election(&mut batch, election)?;
        }
        self.apply(batch)
    }

    /// Write the header and the one election a transition touched, atomically
    pub fn save_election(&self, ledger: &ElectionLedger, id: ElectionId) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        Self::write_header(&mut batch, ledger)?;
        match ledger.record(id) {
            Some(election) => Self::write_election(&mut batch, election)?,
            None => batch.remove(Self::election_key(id)),
        }
        self.apply(batch)
    }

    /// Load the ledger; records that break a ledger invariant are refused
    pub fn load_ledger(&self) -> Result<Option<ElectionLedger>, StoreError> {
        let header: LedgerHeader = match self.get_raw(keys::LEDGER_HEADER)? {
            Some(bytes) => LedgerCodec::from_bytes(&bytes)?,
            None => return Ok(None),
        };

        let mut elections = Vec::new();
        for result in self.db.scan_prefix(keys::ELECTION_PREFIX) {
            let (_, value) = result?;
            let election: Election = LedgerCodec::from_bytes(&value)?;
            elections.push(election);
        }

        let ledger = ElectionLedger::from_parts(header, elections)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
        Ok(Some(ledger))
    }

    pub fn has_ledger(&self) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(keys::LEDGER_HEADER)?)
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    fn account_key(label: &str) -> Vec<u8> {
        [keys::ACCOUNT_PREFIX, label.as_bytes()].concat()
    }

    /// Save a keypair under a label
    pub fn save_account(&self, label: &str, keypair: &Keypair) -> Result<(), StoreError> {
        self.put_raw(&Self::account_key(label), &keypair.to_bytes())
    }

    /// Load a keypair by label
    pub fn load_account(&self, label: &str) -> Result<Option<Keypair>, StoreError> {
        match self.get_raw(&Self::account_key(label))? {
            Some(bytes) => {
                let keypair = Keypair::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(keypair))
            }
            None => Ok(None),
        }
    }

    /// Labels of all stored accounts, sorted
    pub fn account_labels(&self) -> Result<Vec<String>, StoreError> {
        let mut labels = Vec::new();
        for result in self.db.scan_prefix(keys::ACCOUNT_PREFIX) {
            let (key, _) = result?;
            let label = String::from_utf8_lossy(&key[keys::ACCOUNT_PREFIX.len()..]).into_owned();
            labels.push(label);
        }
        Ok(labels)
    }
}
