//! NATS pub/sub integration for the remote-change feed.
//!
//! Peer processes publish a kingdom's full [`KingdomRecord`] on
//! `kingdom.{id}.state` after they flush it. Each loaded kingdom runs a
//! feed task that subscribes to its own subject and forwards parsed
//! records into the owning actor's inbox as
//! [`KingdomCommand::RemoteChange`]; the actor resolves them
//! last-write-wins. Our own flushes are republished on the same subject
//! so peers converge too.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use astral_types::{KingdomId, KingdomRecord};

use crate::actor::KingdomCommand;
use crate::error::SyncError;
use crate::store::KingdomStore;

/// Delay before re-establishing a dropped subscription.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Subject carrying state-change notifications for one kingdom.
fn state_subject(kingdom: KingdomId) -> String {
    format!("kingdom.{kingdom}.state")
}

/// NATS client wrapper for the remote-change feed.
///
/// Manages a single NATS connection shared by every kingdom's feed task.
#[derive(Clone)]
pub struct RemoteFeed {
    client: async_nats::Client,
}

impl RemoteFeed {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| SyncError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Wrap an existing NATS client.
    pub const fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Subscribe to one kingdom's state-change subject.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Nats`] if the subscription fails.
    pub async fn subscribe(&self, kingdom: KingdomId) -> Result<async_nats::Subscriber, SyncError> {
        let subject = state_subject(kingdom);
        debug!(subject = subject, "subscribing to state changes");
        self.client
            .subscribe(subject.clone())
            .await
            .map_err(|e| SyncError::Nats(format!("failed to subscribe to {subject}: {e}")))
    }

    /// Publish a kingdom's record on its state-change subject
    /// (fire-and-forget).
    ///
    /// Failures are logged but never propagate; change notification is
    /// best-effort and must not block the flush path.
    pub fn publish_change(&self, kingdom: KingdomId, record: &KingdomRecord) {
        let subject = state_subject(kingdom);
        match serde_json::to_vec(record) {
            Ok(payload) => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                        warn!(subject = subject, error = %e, "failed to publish state change");
                    }
                });
            }
            Err(e) => {
                warn!(subject = subject, error = %e, "failed to serialize state change");
            }
        }
    }

    /// Deserialize a NATS message payload into a [`KingdomRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Serialization`] if deserialization fails.
    pub fn deserialize_record(data: &[u8]) -> Result<KingdomRecord, SyncError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Run the remote-change feed for one kingdom until its actor goes
    /// away.
    ///
    /// Parsed records are forwarded into `inbox`; unparseable payloads are
    /// logged and dropped. A lapsed subscription is re-established after a
    /// short delay. The task ends when the actor's inbox closes.
    pub async fn run(self, kingdom: KingdomId, inbox: mpsc::Sender<KingdomCommand>) {
        loop {
            let mut subscriber = match self.subscribe(kingdom).await {
                Ok(subscriber) => subscriber,
                Err(e) => {
                    warn!(kingdom_id = %kingdom, error = %e, "state subscription failed");
                    tokio::time::sleep(RESUBSCRIBE_DELAY).await;
                    if inbox.is_closed() {
                        break;
                    }
                    continue;
                }
            };

            loop {
                let message = tokio::select! {
                    () = inbox.closed() => {
                        debug!(kingdom_id = %kingdom, "actor gone; stopping remote feed");
                        return;
                    }
                    message = subscriber.next() => message,
                };
                let Some(message) = message else {
                    break;
                };
                match Self::deserialize_record(&message.payload) {
                    Ok(record) => {
                        if inbox
                            .send(KingdomCommand::RemoteChange(record))
                            .await
                            .is_err()
                        {
                            debug!(kingdom_id = %kingdom, "actor gone; stopping remote feed");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(
                            kingdom_id = %kingdom,
                            error = %e,
                            "dropping unparseable state change"
                        );
                    }
                }
            }

            if inbox.is_closed() {
                break;
            }
            warn!(kingdom_id = %kingdom, "state subscription lapsed; resubscribing");
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
        debug!(kingdom_id = %kingdom, "remote feed stopped");
    }
}

impl std::fmt::Debug for RemoteFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFeed").field("connected", &true).finish()
    }
}

/// Store decorator that announces every successful write on the owning
/// kingdom's state-change subject.
///
/// Publication is best-effort and happens after the durable write; a lost
/// notification only delays peer convergence until their next read.
#[derive(Debug, Clone)]
pub struct AnnouncingStore<S> {
    inner: S,
    feed: RemoteFeed,
}

impl<S> AnnouncingStore<S> {
    /// Wrap a store so its writes are announced on `feed`.
    pub const fn new(inner: S, feed: RemoteFeed) -> Self {
        Self { inner, feed }
    }
}

impl<S: KingdomStore> KingdomStore for AnnouncingStore<S> {
    async fn get(&self, kingdom: KingdomId) -> Result<Option<KingdomRecord>, SyncError> {
        self.inner.get(kingdom).await
    }

    async fn put(&self, kingdom: KingdomId, record: &KingdomRecord) -> Result<(), SyncError> {
        self.inner.put(kingdom, record).await?;
        self.feed.publish_change(kingdom, record);
        Ok(())
    }
}
