//! Persistence layer for Astral Kingdoms: per-kingdom actors, the keyed
//! record store, and the cross-process remote-change feed.
//!
//! # Modules
//!
//! - [`actor`] -- the per-kingdom owner task (ticks, collection, flushes)
//! - [`store`] -- the [`store::KingdomStore`] seam and its Dragonfly impl
//! - [`hydrate`] -- ledger/record conversions and the last-write-wins merge
//! - [`remote`] -- NATS state-change feed between peer processes
//! - [`error`] -- the persistence error taxonomy

pub mod actor;
pub mod error;
pub mod hydrate;
pub mod remote;
pub mod store;

pub use actor::{ActorOptions, CollectOutcome, KingdomCommand, KingdomHandle, spawn};
pub use error::SyncError;
pub use hydrate::{apply_remote, hydrate, snapshot};
pub use remote::{AnnouncingStore, RemoteFeed};
pub use store::{DragonflyStore, KingdomStore};
