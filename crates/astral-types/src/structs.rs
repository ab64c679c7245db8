//! Core structs for the Astral Kingdoms resource core.
//!
//! Covers the in-memory ledger aggregate ([`KingdomLedger`] and its parts)
//! and the persisted record shape ([`KingdomRecord`]) written to the keyed
//! record store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BonusTarget, CollectPhase, ResourceType, ZodiacSign};
use crate::ids::KingdomId;

// ---------------------------------------------------------------------------
// ResourceState
// ---------------------------------------------------------------------------

/// Mutable state for one resource type within a kingdom.
///
/// Invariant: `0 <= current <= max` at every observable point. The accrual
/// functions in `astral-economy` clamp before publishing any update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceState {
    /// The stored amount. Never negative, never above `max`.
    #[ts(as = "String")]
    pub current: Decimal,
    /// Storage capacity. Always positive.
    #[ts(as = "String")]
    pub max: Decimal,
    /// Units produced per second before bonuses. Never negative.
    #[ts(as = "String")]
    pub base_generation_rate: Decimal,
}

impl ResourceState {
    /// Create a resource state with the given capacity and base rate,
    /// starting empty.
    pub const fn new(max: Decimal, base_generation_rate: Decimal) -> Self {
        Self {
            current: Decimal::ZERO,
            max,
            base_generation_rate,
        }
    }

    /// Whether the store is full (no headroom for further accrual).
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

// ---------------------------------------------------------------------------
// BonusModifier
// ---------------------------------------------------------------------------

/// A percentage adjustment to generation rate from one bonus source.
///
/// Modifiers targeting the same resource compose additively as percentages
/// (+30% and +15% combine to a x1.45 multiplier). Expiry is lazy: an
/// expired modifier stays in the list but is skipped during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BonusModifier {
    /// Stable identifier of the producing source (festival, alliance, event).
    pub source_id: String,
    /// Which resource type(s) the modifier applies to.
    pub target: BonusTarget,
    /// Percentage value. Negative for penalties.
    #[ts(as = "String")]
    pub percent: Decimal,
    /// When the modifier stops applying. `None` means no expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BonusModifier {
    /// Whether the modifier is live at `now` (absent or future expiry).
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

// ---------------------------------------------------------------------------
// CollectionState
// ---------------------------------------------------------------------------

/// State of the manual collection cycle for one kingdom.
///
/// The cooldown is not ticked by a timer; it is derived lazily from
/// `cooldown_until` whenever the phase is queried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CollectionState {
    /// When the last successful collection completed.
    pub last_collection_time: Option<DateTime<Utc>>,
    /// When the current cooldown ends. `None` means no cooldown is running.
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Guards against re-entrant collection attempts while a burst is
    /// being computed and flushed.
    pub in_progress: bool,
}

impl CollectionState {
    /// Seconds of cooldown remaining at `now`. Zero once elapsed.
    #[allow(clippy::arithmetic_side_effects)] // chrono interval arithmetic
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.cooldown_until
            .map_or(0, |until| (until - now).num_seconds().max(0))
    }

    /// Derive the current phase at `now`.
    pub fn phase(&self, now: DateTime<Utc>) -> CollectPhase {
        if self.in_progress {
            CollectPhase::Collecting
        } else if self.cooldown_remaining(now) > 0 {
            CollectPhase::Cooldown
        } else {
            CollectPhase::Idle
        }
    }
}

// ---------------------------------------------------------------------------
// KingdomLedger
// ---------------------------------------------------------------------------

/// Aggregate root for one kingdom's resource economy.
///
/// Owned exclusively by one persistence actor per kingdom; all mutations
/// are serialized through that owner. Created when the kingdom is loaded
/// from the store, discarded when it is unloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KingdomLedger {
    /// The owning kingdom.
    pub kingdom_id: KingdomId,
    /// The player account that owns this kingdom.
    pub user_id: String,
    /// The kingdom's zodiac sign (festival and alliance lookups key on it).
    pub zodiac_sign: ZodiacSign,
    /// Per-resource state, keyed by resource type.
    pub resources: BTreeMap<ResourceType, ResourceState>,
    /// Active and lazily-expired bonus modifiers, in insertion order.
    pub modifiers: Vec<BonusModifier>,
    /// Manual collection cycle state.
    pub collection: CollectionState,
    /// When passive accrual last ran. Also the key for the
    /// last-write-wins merge of remote changes.
    pub last_tick_time: DateTime<Utc>,
}

impl KingdomLedger {
    /// Look up the state for one resource type.
    pub fn resource(&self, resource: ResourceType) -> Option<&ResourceState> {
        self.resources.get(&resource)
    }

    /// Whether every resource store is at capacity.
    pub fn all_full(&self) -> bool {
        self.resources.values().all(ResourceState::is_full)
    }
}

// ---------------------------------------------------------------------------
// Persisted record shape
// ---------------------------------------------------------------------------

/// Per-resource stats as persisted in the keyed record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceStatRecord {
    /// The stored amount at flush time.
    #[ts(as = "String")]
    pub current: Decimal,
    /// Storage capacity.
    #[ts(as = "String")]
    pub max: Decimal,
    /// Units produced per second before bonuses.
    #[ts(as = "String")]
    pub generation_rate: Decimal,
    /// Effective multiplier at flush time. Display-facing snapshot only;
    /// the live multiplier is always recomputed from the bonus tables.
    #[ts(as = "String")]
    pub bonus_rate: Decimal,
}

/// Collection sub-state as persisted in the keyed record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CollectionRecord {
    /// When the last successful collection completed.
    pub last_collection_time: Option<DateTime<Utc>>,
    /// Seconds of cooldown remaining at flush time.
    pub cooldown_remaining: i64,
}

/// The full per-kingdom record read from and written to the opaque store.
///
/// `last_tick_time` is carried in the record because remote-change merges
/// are resolved last-write-wins on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KingdomRecord {
    /// The player account that owns this kingdom.
    pub user_id: String,
    /// Per-resource stats keyed by resource type.
    pub stats: BTreeMap<ResourceType, ResourceStatRecord>,
    /// Manual collection sub-state.
    pub collection: CollectionRecord,
    /// When passive accrual last ran on the writing side.
    pub last_tick_time: DateTime<Utc>,
}
