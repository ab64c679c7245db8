//! The per-kingdom persistence actor.
//!
//! One tokio task owns each loaded [`KingdomLedger`] exclusively. Ticks,
//! collection attempts, and remote changes all arrive through the actor's
//! inbox (or its internal timer) and are processed one at a time, so every
//! mutation to a kingdom's ledger is serialized without a lock.
//! Cross-kingdom actors are fully independent.
//!
//! # Flush discipline
//!
//! Background flushes never block the loop: the record snapshot is taken
//! in memory and the store write runs on a spawned task. At most one
//! flush is in flight per kingdom; mutations during that window set a
//! dirty flag and coalesce into the next flush instead of queueing.
//! A flush that fails or times out leaves local state untouched -- it
//! represents real elapsed time -- and the next flush carries it forward.
//!
//! The collection flush is the one write the actor awaits (bounded by the
//! same timeout), because the cooldown transition is conditional on it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use astral_economy::bonus::BonusTables;
use astral_economy::collection::CollectAttempt;
use astral_economy::{clock, collection};
use astral_types::{KingdomId, KingdomLedger, KingdomRecord, ResourceType, ZodiacSign};

use crate::error::SyncError;
use crate::hydrate;
use crate::store::KingdomStore;

/// Inbox capacity per kingdom actor.
const INBOX_CAPACITY: usize = 32;

/// Commands delivered into a kingdom actor's inbox.
#[derive(Debug)]
pub enum KingdomCommand {
    /// A player-triggered manual collection attempt.
    Collect {
        /// Channel for the outcome.
        reply: oneshot::Sender<CollectOutcome>,
    },
    /// A remote-change notification from the subscription feed.
    RemoteChange(KingdomRecord),
    /// Unload the kingdom: stop ticking and shut the actor down.
    Unload,
}

/// Outcome of a manual collection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// The collection succeeded; the per-resource amounts were granted
    /// and the cooldown started.
    Collected(BTreeMap<ResourceType, Decimal>),
    /// A collection was already in progress or the cooldown is running.
    /// Nothing changed.
    Rejected,
    /// The persistence flush failed; the ledger returned to idle with no
    /// state change.
    Failed,
}

/// Tunables for a kingdom actor.
#[derive(Debug, Clone)]
pub struct ActorOptions {
    /// Interval between passive-accrual ticks.
    pub tick_period: Duration,
    /// Bound on any single store write.
    pub flush_timeout: Duration,
    /// Zodiac sign of the allied kingdom, if an alliance exists.
    pub ally_sign: Option<ZodiacSign>,
}

impl Default for ActorOptions {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(5),
            flush_timeout: Duration::from_secs(5),
            ally_sign: None,
        }
    }
}

/// Handle to a spawned kingdom actor.
pub struct KingdomHandle {
    kingdom_id: KingdomId,
    tx: mpsc::Sender<KingdomCommand>,
    join: JoinHandle<()>,
}

impl KingdomHandle {
    /// The kingdom this handle drives.
    pub const fn kingdom_id(&self) -> KingdomId {
        self.kingdom_id
    }

    /// A sender for delivering commands (used by the remote-change feed).
    pub fn sender(&self) -> mpsc::Sender<KingdomCommand> {
        self.tx.clone()
    }

    /// Attempt a manual collection and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ActorGone`] if the actor has been unloaded.
    pub async fn collect(&self) -> Result<CollectOutcome, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(KingdomCommand::Collect { reply })
            .await
            .map_err(|_| SyncError::ActorGone)?;
        rx.await.map_err(|_| SyncError::ActorGone)
    }

    /// Unload the kingdom: stop the periodic task and wait for the actor
    /// to finish. A final flush is attempted if local changes are unsaved.
    pub async fn unload(self) {
        let _ = self.tx.send(KingdomCommand::Unload).await;
        let _ = self.join.await;
    }
}

/// Spawn the owning actor for one kingdom.
pub fn spawn<S: KingdomStore>(
    ledger: KingdomLedger,
    tables: Arc<BonusTables>,
    store: S,
    options: ActorOptions,
) -> KingdomHandle {
    let kingdom_id = ledger.kingdom_id;
    let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
    let tick_period = options.tick_period;

    let actor = Actor {
        ledger,
        tables,
        ally_sign: options.ally_sign,
        store: Arc::new(store),
        flush_timeout: options.flush_timeout,
        dirty: false,
        flush_in_flight: None,
    };

    info!(kingdom_id = %kingdom_id, "kingdom actor starting");
    let join = tokio::spawn(actor.run(inbox, tick_period));

    KingdomHandle {
        kingdom_id,
        tx,
        join,
    }
}

struct Actor<S: KingdomStore> {
    ledger: KingdomLedger,
    tables: Arc<BonusTables>,
    ally_sign: Option<ZodiacSign>,
    store: Arc<S>,
    flush_timeout: Duration,
    dirty: bool,
    flush_in_flight: Option<JoinHandle<Result<(), SyncError>>>,
}

impl<S: KingdomStore> Actor<S> {
    async fn run(mut self, mut inbox: mpsc::Receiver<KingdomCommand>, tick_period: Duration) {
        let mut ticker = interval(tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.handle_tick(),
                cmd = inbox.recv() => match cmd {
                    Some(KingdomCommand::Collect { reply }) => {
                        let outcome = self.handle_collect().await;
                        let _ = reply.send(outcome);
                    }
                    Some(KingdomCommand::RemoteChange(record)) => self.handle_remote(&record),
                    Some(KingdomCommand::Unload) | None => break,
                },
                result = flush_done(&mut self.flush_in_flight) => {
                    self.flush_in_flight = None;
                    self.note_flush_result(result);
                }
            }
            self.maybe_start_flush();
        }

        self.finish().await;
    }

    /// Run one generation tick and mark the ledger dirty if anything
    /// accrued.
    fn handle_tick(&mut self) {
        let now = Utc::now();
        self.refresh_modifiers(now);
        match clock::tick(&mut self.ledger, now) {
            Ok(outcome) => {
                if outcome.changed {
                    self.dirty = true;
                }
            }
            Err(e) => {
                warn!(kingdom_id = %self.ledger.kingdom_id, error = %e, "tick failed");
            }
        }
    }

    /// Process a manual collection attempt end to end.
    async fn handle_collect(&mut self) -> CollectOutcome {
        // Drain any background flush first so at most one store write is
        // in flight per kingdom.
        if let Some(handle) = self.flush_in_flight.take() {
            let result = handle.await;
            self.note_flush_result(result);
        }

        let now = Utc::now();
        self.refresh_modifiers(now);

        let staged = match collection::try_begin(&mut self.ledger, now) {
            Ok(CollectAttempt::Rejected) => return CollectOutcome::Rejected,
            Ok(CollectAttempt::Staged(staged)) => staged,
            Err(e) => {
                warn!(kingdom_id = %self.ledger.kingdom_id, error = %e, "burst computation failed");
                collection::abort(&mut self.ledger);
                return CollectOutcome::Failed;
            }
        };

        // Flush the post-burst record; the transition to Cooldown is
        // conditional on the write landing.
        let mut preview = self.ledger.clone();
        collection::commit(&mut preview, staged.clone(), now);
        let record = hydrate::snapshot(&preview, now);

        match write_record(
            self.store.as_ref(),
            self.ledger.kingdom_id,
            &record,
            self.flush_timeout,
        )
        .await
        {
            Ok(()) => {
                let collected = staged.collected.clone();
                collection::commit(&mut self.ledger, staged, now);
                info!(
                    kingdom_id = %self.ledger.kingdom_id,
                    resources = collected.len(),
                    "collection committed"
                );
                CollectOutcome::Collected(collected)
            }
            Err(e) => {
                collection::abort(&mut self.ledger);
                warn!(
                    kingdom_id = %self.ledger.kingdom_id,
                    error = %e,
                    "collection flush failed; burst discarded"
                );
                CollectOutcome::Failed
            }
        }
    }

    /// Merge a remote change under last-write-wins.
    fn handle_remote(&mut self, record: &KingdomRecord) {
        if hydrate::apply_remote(&mut self.ledger, record, Utc::now()) {
            self.dirty = true;
        }
    }

    /// Re-derive the modifier list from the injected bonus tables.
    fn refresh_modifiers(&mut self, now: DateTime<Utc>) {
        self.ledger.modifiers = self.tables.active_modifiers(
            self.ledger.kingdom_id,
            self.ledger.zodiac_sign,
            self.ally_sign,
            now,
        );
    }

    /// Start a background flush if there are unsaved changes and none is
    /// already in flight.
    fn maybe_start_flush(&mut self) {
        if !self.dirty || self.flush_in_flight.is_some() {
            return;
        }
        self.dirty = false;

        let store = Arc::clone(&self.store);
        let kingdom = self.ledger.kingdom_id;
        let record = hydrate::snapshot(&self.ledger, Utc::now());
        let flush_timeout = self.flush_timeout;

        self.flush_in_flight = Some(tokio::spawn(async move {
            write_record(store.as_ref(), kingdom, &record, flush_timeout).await
        }));
    }

    /// Record the outcome of a completed flush task. Failures re-mark the
    /// ledger dirty so the state is carried forward by the next flush.
    fn note_flush_result(&mut self, result: Result<Result<(), SyncError>, tokio::task::JoinError>) {
        match result {
            Ok(Ok(())) => {
                debug!(kingdom_id = %self.ledger.kingdom_id, "flush completed");
            }
            Ok(Err(e)) => {
                warn!(kingdom_id = %self.ledger.kingdom_id, error = %e, "flush failed");
                self.dirty = true;
            }
            Err(e) => {
                warn!(kingdom_id = %self.ledger.kingdom_id, error = %e, "flush task panicked");
                self.dirty = true;
            }
        }
    }

    /// Shutdown path: the in-flight flush (if any) is left to complete
    /// with its result discarded, and unsaved changes get one final
    /// bounded write.
    async fn finish(mut self) {
        drop(self.flush_in_flight.take());

        if self.dirty {
            let record = hydrate::snapshot(&self.ledger, Utc::now());
            if let Err(e) = write_record(
                self.store.as_ref(),
                self.ledger.kingdom_id,
                &record,
                self.flush_timeout,
            )
            .await
            {
                warn!(
                    kingdom_id = %self.ledger.kingdom_id,
                    error = %e,
                    "final flush failed on unload"
                );
            }
        }

        info!(kingdom_id = %self.ledger.kingdom_id, "kingdom actor stopped");
    }
}

/// Await the in-flight flush, or park forever when there is none.
async fn flush_done(
    flush: &mut Option<JoinHandle<Result<(), SyncError>>>,
) -> Result<Result<(), SyncError>, tokio::task::JoinError> {
    match flush.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Write one record with the bounded flush timeout.
async fn write_record<S: KingdomStore>(
    store: &S,
    kingdom: KingdomId,
    record: &KingdomRecord,
    flush_timeout: Duration,
) -> Result<(), SyncError> {
    let timeout_ms = u64::try_from(flush_timeout.as_millis()).unwrap_or(u64::MAX);
    match timeout(flush_timeout, store.put(kingdom, record)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(SyncError::FlushTimeout { timeout_ms }),
    }
}
