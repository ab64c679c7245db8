//! Conversions between the in-memory ledger and the persisted record,
//! and the last-write-wins merge for remote changes.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use astral_economy::bonus;
use astral_types::{
    CollectionRecord, CollectionState, KingdomId, KingdomLedger, KingdomRecord, ResourceState,
    ResourceStatRecord, ZodiacSign,
};

/// Build a live ledger from a stored record when a kingdom is loaded.
///
/// Accrual starts fresh: `last_tick_time` is set to `now`, so time the
/// kingdom spent unloaded does not generate resources. A running cooldown
/// is resumed from the stored remaining seconds.
pub fn hydrate(
    record: &KingdomRecord,
    kingdom_id: KingdomId,
    zodiac_sign: ZodiacSign,
    now: DateTime<Utc>,
) -> KingdomLedger {
    KingdomLedger {
        kingdom_id,
        user_id: record.user_id.clone(),
        zodiac_sign,
        resources: resources_from_stats(&record.stats),
        modifiers: Vec::new(),
        collection: collection_from_record(&record.collection, now),
        last_tick_time: now,
    }
}

/// Snapshot a ledger into the record shape written to the store.
///
/// `bonus_rate` is filled with the effective multiplier per resource at
/// `now` -- a display-facing snapshot, ignored on hydrate. Snapshotting is
/// pure: identical ledger state at the same instant yields an identical
/// record, which is what makes the flush idempotent.
pub fn snapshot(ledger: &KingdomLedger, now: DateTime<Utc>) -> KingdomRecord {
    let mut stats = BTreeMap::new();
    for (resource, state) in &ledger.resources {
        stats.insert(
            *resource,
            ResourceStatRecord {
                current: state.current,
                max: state.max,
                generation_rate: state.base_generation_rate,
                bonus_rate: bonus::effective_multiplier(*resource, &ledger.modifiers, now),
            },
        );
    }
    KingdomRecord {
        user_id: ledger.user_id.clone(),
        stats,
        collection: CollectionRecord {
            last_collection_time: ledger.collection.last_collection_time,
            cooldown_remaining: ledger.collection.cooldown_remaining(now),
        },
        last_tick_time: ledger.last_tick_time,
    }
}

/// Merge a remote change into the local ledger, last-write-wins on
/// `last_tick_time`.
///
/// If the remote record is newer it replaces the local resource and
/// collection state entirely (modifiers are left alone; they are
/// re-derived from the live bonus tables). An older or equal remote
/// record is ignored. Returns whether the remote state was applied.
pub fn apply_remote(
    ledger: &mut KingdomLedger,
    record: &KingdomRecord,
    now: DateTime<Utc>,
) -> bool {
    if record.last_tick_time <= ledger.last_tick_time {
        debug!(
            kingdom_id = %ledger.kingdom_id,
            local_tick = %ledger.last_tick_time,
            remote_tick = %record.last_tick_time,
            "ignoring stale remote change"
        );
        return false;
    }

    ledger.user_id = record.user_id.clone();
    ledger.resources = resources_from_stats(&record.stats);
    ledger.collection = collection_from_record(&record.collection, now);
    ledger.last_tick_time = record.last_tick_time;
    debug!(
        kingdom_id = %ledger.kingdom_id,
        remote_tick = %record.last_tick_time,
        "applied newer remote state"
    );
    true
}

fn resources_from_stats(
    stats: &BTreeMap<astral_types::ResourceType, ResourceStatRecord>,
) -> BTreeMap<astral_types::ResourceType, ResourceState> {
    stats
        .iter()
        .map(|(resource, stat)| {
            (
                *resource,
                ResourceState {
                    // Clamp on the way in; a foreign writer may have
                    // violated the invariant.
                    current: stat.current.min(stat.max).max(rust_decimal::Decimal::ZERO),
                    max: stat.max,
                    base_generation_rate: stat.generation_rate,
                },
            )
        })
        .collect()
}

#[allow(clippy::arithmetic_side_effects)] // chrono interval arithmetic
fn collection_from_record(record: &CollectionRecord, now: DateTime<Utc>) -> CollectionState {
    CollectionState {
        last_collection_time: record.last_collection_time,
        cooldown_until: (record.cooldown_remaining > 0)
            .then(|| now + TimeDelta::seconds(record.cooldown_remaining)),
        in_progress: false,
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use astral_types::ResourceType;
    use rust_decimal_macros::dec;

    use super::*;

    fn make_record(now: DateTime<Utc>) -> KingdomRecord {
        let mut stats = BTreeMap::new();
        stats.insert(
            ResourceType::Stardust,
            ResourceStatRecord {
                current: dec!(490),
                max: dec!(500),
                generation_rate: dec!(10),
                bonus_rate: dec!(1),
            },
        );
        stats.insert(
            ResourceType::CelestialOre,
            ResourceStatRecord {
                current: dec!(0),
                max: dec!(200),
                generation_rate: dec!(4),
                bonus_rate: dec!(1),
            },
        );
        KingdomRecord {
            user_id: String::from("user-1"),
            stats,
            collection: CollectionRecord {
                last_collection_time: None,
                cooldown_remaining: 0,
            },
            last_tick_time: now,
        }
    }

    #[test]
    fn hydrate_starts_accrual_fresh() {
        let stored_at = Utc::now() - TimeDelta::seconds(3600);
        let now = Utc::now();
        let record = make_record(stored_at);

        let ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);
        // No retroactive accrual for time spent unloaded.
        assert_eq!(ledger.last_tick_time, now);
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(dec!(490))
        );
    }

    #[test]
    fn hydrate_resumes_running_cooldown() {
        let now = Utc::now();
        let mut record = make_record(now);
        record.collection.cooldown_remaining = 120;

        let ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);
        assert_eq!(ledger.collection.cooldown_remaining(now), 120);
        assert!(!ledger.collection.in_progress);
    }

    #[test]
    fn hydrate_clamps_overfull_foreign_state() {
        let now = Utc::now();
        let mut record = make_record(now);
        if let Some(stat) = record.stats.get_mut(&ResourceType::Stardust) {
            stat.current = dec!(9_999);
        }

        let ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(dec!(500))
        );
    }

    #[test]
    fn snapshot_is_deterministic() {
        let now = Utc::now();
        let record = make_record(now);
        let ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);

        let first = snapshot(&ledger, now);
        let second = snapshot(&ledger, now);
        // Identical state, identical instant, identical record: the
        // repeated flush writes exactly the same document.
        assert_eq!(first, second);
    }

    #[test]
    fn snapshot_roundtrips_resources() {
        let now = Utc::now();
        let record = make_record(now);
        let ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);

        let out = snapshot(&ledger, now);
        assert_eq!(out.stats.len(), record.stats.len());
        assert_eq!(
            out.stats.get(&ResourceType::Stardust).map(|s| s.current),
            Some(dec!(490))
        );
        assert_eq!(out.last_tick_time, now);
    }

    #[test]
    fn stale_remote_change_is_ignored() {
        let now = Utc::now();
        let record = make_record(now);
        let mut ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);

        let mut stale = make_record(now - TimeDelta::seconds(60));
        if let Some(stat) = stale.stats.get_mut(&ResourceType::Stardust) {
            stat.current = dec!(1);
        }

        let applied = apply_remote(&mut ledger, &stale, now);
        assert!(!applied);
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(dec!(490))
        );
    }

    #[test]
    fn newer_remote_change_replaces_local_state() {
        let now = Utc::now();
        let record = make_record(now);
        let mut ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);

        let mut newer = make_record(now + TimeDelta::seconds(60));
        if let Some(stat) = newer.stats.get_mut(&ResourceType::Stardust) {
            stat.current = dec!(123);
        }
        newer.collection.cooldown_remaining = 45;

        let applied = apply_remote(&mut ledger, &newer, now);
        assert!(applied);
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(dec!(123))
        );
        assert_eq!(ledger.collection.cooldown_remaining(now), 45);
        assert_eq!(ledger.last_tick_time, now + TimeDelta::seconds(60));
    }

    #[test]
    fn equal_timestamp_remote_change_is_ignored() {
        let now = Utc::now();
        let record = make_record(now);
        let mut ledger = hydrate(&record, KingdomId::new(), ZodiacSign::Leo, now);
        // hydrate() reset last_tick_time to `now`, equal to the remote's.
        let applied = apply_remote(&mut ledger, &record, now);
        assert!(!applied);
    }
}
