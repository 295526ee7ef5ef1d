// LedgerService - serially consistent access to a shared election ledger
//
// Transitions run under the write lock one at a time; each one is validated,
// applied, persisted and published before the lock is released. A failed
// write restores the touched election so memory never runs ahead of disk.
// Reads share the read lock and always see a fully applied state.

use crate::config::LedgerConfig;
use crate::identity::Address;
use crate::ledger::{
    Candidate, Clock, ElectionDetail, ElectionId, ElectionLedger, ElectionResults,
    ElectionStatus, ElectionSummary, LedgerError, LedgerLimits, NewCandidate, NewElection,
    SystemClock, Timestamp, Winner,
};
use crate::service::{LedgerEvent, LedgerEventKind, ServiceError, VotingContract};
use crate::storage::LedgerStore;
use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

pub struct LedgerService<C: Clock = SystemClock> {
    ledger: RwLock<ElectionLedger>,
    clock: C,
    store: Option<LedgerStore>,
    flush_on_write: bool,
    events: broadcast::Sender<LedgerEvent>,
}

impl<C: Clock> LedgerService<C> {
    /// Serve a ledger kept only in memory
    pub fn in_memory(ledger: ElectionLedger, clock: C) -> Self {
        Self::from_parts(ledger, clock, None, &LedgerConfig::default())
    }

    /// Create a fresh ledger owned by `owner` inside an empty store
    pub fn init(
        store: LedgerStore,
        config: &LedgerConfig,
        owner: Address,
        clock: C,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        if store.has_ledger()? {
            return Err(ServiceError::AlreadyInitialized(config.data_dir.clone()));
        }

        let ledger = ElectionLedger::with_limits(owner, config.limits_over(LedgerLimits::default()));
        store.save_ledger(&ledger)?;
        store.flush()?;

        info!(owner = %owner, data_dir = %config.data_dir.display(), "ledger initialised");
        Ok(Self::from_parts(ledger, clock, Some(store), config))
    }

    /// Serve the ledger saved in `store`
    pub fn open(store: LedgerStore, config: &LedgerConfig, clock: C) -> Result<Self, ServiceError> {
        config.validate()?;
        let mut ledger = store
            .load_ledger()?
            .ok_or_else(|| ServiceError::NotInitialized(config.data_dir.clone()))?;
        let limits = config.limits_over(*ledger.limits());
        if limits != *ledger.limits() {
            info!(
                max_candidates = limits.max_candidates,
                max_voters = limits.max_voters,
                "ledger limits changed"
            );
            ledger.set_limits(limits);
            store.save_ledger(&ledger)?;
            store.flush()?;
        }

        debug!(
            version = ledger.version(),
            elections = ledger.election_count(),
            "ledger loaded"
        );
        Ok(Self::from_parts(ledger, clock, Some(store), config))
    }

    fn from_parts(
        ledger: ElectionLedger,
        clock: C,
        store: Option<LedgerStore>,
        config: &LedgerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            ledger: RwLock::new(ledger),
            clock,
            store,
            flush_on_write: config.flush_on_write,
            events,
        }
    }

    /// Subscribe to events of transitions applied from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> Option<&LedgerStore> {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn version(&self) -> u64 {
        self.ledger.read().await.version()
    }

    /// Copy of the full ledger at one point of the serial order
    pub async fn snapshot(&self) -> ElectionLedger {
        self.ledger.read().await.clone()
    }

    fn rejected(op: &'static str, err: LedgerError) -> ServiceError {
        warn!(op, kind = err.kind(), error = %err, "transition rejected");
        err.into()
    }

    fn persist(&self, store: &LedgerStore, ledger: &ElectionLedger, id: ElectionId) -> Result<(), ServiceError> {
        let written = store.save_election(ledger, id).and_then(|_| {
            if self.flush_on_write {
                store.flush()
            } else {
                Ok(())
            }
        });
        if let Err(e) = &written {
            error!(error = %e, version = ledger.version(), "failed to persist ledger");
        }
        Ok(written?)
    }

    /// Apply one transition on `target` (`None` for a new election)
    async fn transition<T, F>(
        &self,
        op: &'static str,
        target: Option<ElectionId>,
        apply: F,
    ) -> Result<T, ServiceError>
    where
        T: Send,
        F: FnOnce(&mut ElectionLedger, Timestamp) -> Result<(T, LedgerEventKind), LedgerError> + Send,
    {
        let mut ledger = self.ledger.write().await;
        let now = self.clock.now();

        let checkpoint = self.store.as_ref().map(|_| ledger.checkpoint(target));
        // Rejections happen before any mutation, so nothing needs undoing here
        let (value, kind) = apply(&mut *ledger, now).map_err(|e| Self::rejected(op, e))?;

        if let (Some(store), Some(checkpoint)) = (&self.store, checkpoint) {
            if let Err(e) = self.persist(store, &ledger, kind.election_id()) {
                ledger.restore(checkpoint);
                return Err(e);
            }
        }

        // Published under the lock so subscribers see events in serial order.
        // Having no subscribers is fine.
        let _ = self.events.send(LedgerEvent {
            version: ledger.version(),
            at: now,
            kind,
        });
        Ok(value)
    }

    async fn query<T, F>(&self, query: F) -> Result<T, ServiceError>
    where
        T: Send,
        F: FnOnce(&ElectionLedger, Timestamp) -> Result<T, LedgerError> + Send,
    {
        let ledger = self.ledger.read().await;
        Ok(query(&*ledger, self.clock.now())?)
    }
}

#[async_trait]
impl<C: Clock + 'static> VotingContract for LedgerService<C> {
    async fn create_election(&self, caller: &Address, params: NewElection) -> Result<ElectionId, ServiceError> {
        self.transition("create_election", None, move |ledger, now| {
            let name = params.name.clone();
            let id = ledger.create_election(caller, params, now)?;
            Ok((id, LedgerEventKind::ElectionCreated { id, name }))
        })
        .await
    }

    async fn vote(&self, caller: &Address, id: ElectionId, candidate: &str) -> Result<(), ServiceError> {
        self.transition("vote", Some(id), |ledger, now| {
            ledger.vote(caller, id, candidate, now)?;
            Ok((
                (),
                LedgerEventKind::VoteCast {
                    id,
                    voter: *caller,
                    candidate: candidate.to_string(),
                },
            ))
        })
        .await
    }

    async fn set_candidates(
        &self,
        caller: &Address,
        id: ElectionId,
        candidates: Vec<NewCandidate>,
    ) -> Result<(), ServiceError> {
        self.transition("set_candidates", Some(id), |ledger, now| {
            ledger.set_candidates(caller, id, &candidates, now)?;
            Ok(((), LedgerEventKind::CandidatesReplaced { id, count: candidates.len() }))
        })
        .await
    }

    async fn set_allowed_voters(
        &self,
        caller: &Address,
        id: ElectionId,
        voters: Vec<Address>,
    ) -> Result<(), ServiceError> {
        self.transition("set_allowed_voters", Some(id), |ledger, now| {
            ledger.set_allowed_voters(caller, id, &voters, now)?;
            let count = ledger.election(id)?.allowed_voters().len();
            Ok(((), LedgerEventKind::VotersReplaced { id, count }))
        })
        .await
    }

    async fn delete_election(&self, caller: &Address, id: ElectionId) -> Result<(), ServiceError> {
        self.transition("delete_election", Some(id), |ledger, _now| {
            ledger.delete_election(caller, id)?;
            Ok(((), LedgerEventKind::ElectionDeleted { id }))
        })
        .await
    }

    async fn detail_election(&self, id: ElectionId) -> Result<ElectionDetail, ServiceError> {
        self.query(|ledger, now| ledger.detail_election(id, now)).await
    }

    async fn get_candidates(&self, id: ElectionId) -> Result<Vec<Candidate>, ServiceError> {
        self.query(|ledger, _| ledger.candidates(id)).await
    }

    async fn get_votes(&self, id: ElectionId, candidate: &str) -> Result<u64, ServiceError> {
        self.query(|ledger, _| ledger.votes(id, candidate)).await
    }

    async fn get_all_election_names(&self) -> Vec<ElectionSummary> {
        self.ledger.read().await.all_election_names()
    }

    async fn get_election_winner(&self, id: ElectionId) -> Result<Winner, ServiceError> {
        self.query(|ledger, _| ledger.election_winner(id)).await
    }

    async fn owner(&self) -> Address {
        *self.ledger.read().await.owner()
    }

    async fn election_count(&self) -> u64 {
        self.ledger.read().await.election_count()
    }

    async fn election_status(&self, id: ElectionId) -> Result<ElectionStatus, ServiceError> {
        self.query(|ledger, now| ledger.election_status(id, now)).await
    }

    async fn has_voted(&self, id: ElectionId, voter: &Address) -> Result<bool, ServiceError> {
        self.query(|ledger, _| ledger.has_voted(id, voter)).await
    }

    async fn results(&self, id: ElectionId) -> Result<ElectionResults, ServiceError> {
        self.query(|ledger, now| ledger.results(id, now)).await
    }
}
