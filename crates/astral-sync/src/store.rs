//! The opaque keyed record store.
//!
//! [`KingdomStore`] is the seam between the resource core and whatever
//! holds durable state. The production implementation is
//! [`DragonflyStore`], a `Dragonfly` (Redis-compatible) client storing
//! one JSON document per kingdom.
//!
//! # Key Pattern
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `kingdom:{id}:state` | JSON | Full [`KingdomRecord`] |

use fred::prelude::*;

use astral_types::{KingdomId, KingdomRecord};

use crate::error::SyncError;

/// Store key for a kingdom's record.
fn record_key(kingdom: KingdomId) -> String {
    format!("kingdom:{kingdom}:state")
}

/// The contract the resource core holds against durable storage.
///
/// `put` must be an idempotent full-record write: calling it repeatedly
/// with the same record produces the same stored state with no duplicate
/// side effects.
pub trait KingdomStore: Send + Sync + 'static {
    /// Read a kingdom's record, `None` if the kingdom has never been saved.
    fn get(
        &self,
        kingdom: KingdomId,
    ) -> impl Future<Output = Result<Option<KingdomRecord>, SyncError>> + Send;

    /// Write a kingdom's full record, replacing any previous value.
    fn put(
        &self,
        kingdom: KingdomId,
        record: &KingdomRecord,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the URL cannot be parsed.
    /// Returns [`SyncError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, SyncError> {
        let config = Config::from_url(url)
            .map_err(|e| SyncError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl KingdomStore for DragonflyStore {
    async fn get(&self, kingdom: KingdomId) -> Result<Option<KingdomRecord>, SyncError> {
        let key = record_key(kingdom);
        let value: Option<String> = self.client.get(&key).await?;
        match value {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, kingdom: KingdomId, record: &KingdomRecord) -> Result<(), SyncError> {
        let key = record_key(kingdom);
        let json = serde_json::to_string(record)?;
        // Plain SET: a full-record overwrite, idempotent by construction.
        let _: () = self.client.set(&key, json.as_str(), None, None, false).await?;
        Ok(())
    }
}
