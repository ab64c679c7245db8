//! The manual collection state machine.
//!
//! Phases cycle `Idle -> Collecting -> Cooldown -> Idle`. A collect attempt
//! while `Collecting` or while the cooldown runs is an idempotent no-op
//! ([`CollectAttempt::Rejected`]), so at most one collection succeeds per
//! cooldown window.
//!
//! The burst is *staged* rather than applied: [`try_begin`] computes the
//! post-burst resource map on a copy, and the owner commits it only after
//! the persistence flush succeeds. A failed flush aborts back to `Idle`
//! with no resource change.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use astral_types::{CollectPhase, KingdomLedger, ResourceState, ResourceType};

use crate::error::EconomyError;
use crate::{bonus, ledger};

/// Enforced minimum interval between successive manual collections.
pub const COOLDOWN_SECS: i64 = 300;

/// Outcome of a collect attempt.
#[derive(Debug)]
pub enum CollectAttempt {
    /// The attempt was rejected: a collection is already in progress or
    /// the cooldown has not elapsed. Not an error; nothing changed.
    Rejected,
    /// The burst was computed and staged; the ledger is now `Collecting`.
    /// The caller must [`commit`] after a successful flush or [`abort`]
    /// after a failed one.
    Staged(StagedBurst),
}

/// A computed burst awaiting persistence confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBurst {
    /// The post-burst resource map, to replace the ledger's on commit.
    pub resources: BTreeMap<ResourceType, ResourceState>,
    /// Amount actually collected per resource type (after capping).
    pub collected: BTreeMap<ResourceType, Decimal>,
}

/// Attempt to start a manual collection at `now`.
///
/// Rejected (no-op, no error) while a collection is in progress or the
/// cooldown is still running. On success the ledger transitions to
/// `Collecting` and the burst amounts are staged for the caller to flush.
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if burst arithmetic fails;
/// the ledger is left in `Idle` in that case.
pub fn try_begin(
    ledger: &mut KingdomLedger,
    now: DateTime<Utc>,
) -> Result<CollectAttempt, EconomyError> {
    if ledger.collection.phase(now) != CollectPhase::Idle {
        debug!(
            kingdom_id = %ledger.kingdom_id,
            cooldown_remaining = ledger.collection.cooldown_remaining(now),
            in_progress = ledger.collection.in_progress,
            "collect attempt rejected"
        );
        return Ok(CollectAttempt::Rejected);
    }

    let staged = stage_burst(&ledger.resources, &ledger.modifiers, now)?;
    ledger.collection.in_progress = true;
    Ok(CollectAttempt::Staged(staged))
}

/// Commit a staged burst after its flush succeeded.
///
/// Replaces the resource map with the staged one, records the collection
/// time, and starts the [`COOLDOWN_SECS`] cooldown.
#[allow(clippy::arithmetic_side_effects)] // chrono interval arithmetic
pub fn commit(ledger: &mut KingdomLedger, staged: StagedBurst, now: DateTime<Utc>) {
    ledger.resources = staged.resources;
    ledger.collection.in_progress = false;
    ledger.collection.last_collection_time = Some(now);
    ledger.collection.cooldown_until = Some(now + TimeDelta::seconds(COOLDOWN_SECS));
}

/// Abort a staged collection after its flush failed.
///
/// Returns the ledger to `Idle` with no resource or cooldown change, so
/// the player can retry immediately.
pub fn abort(ledger: &mut KingdomLedger) {
    ledger.collection.in_progress = false;
}

/// Compute the burst amounts for every resource type on a copy of the
/// resource map.
fn stage_burst(
    resources: &BTreeMap<ResourceType, ResourceState>,
    modifiers: &[astral_types::BonusModifier],
    now: DateTime<Utc>,
) -> Result<StagedBurst, EconomyError> {
    let mut staged = resources.clone();
    let mut collected = BTreeMap::new();

    for (resource, state) in &mut staged {
        let multiplier = bonus::effective_multiplier(*resource, modifiers, now);
        let added = ledger::collect_burst(state, multiplier)?;
        collected.insert(*resource, added);
    }

    Ok(StagedBurst {
        resources: staged,
        collected,
    })
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use astral_types::{
        BonusModifier, BonusTarget, CollectionState, KingdomId, ZodiacSign,
    };
    use rust_decimal_macros::dec;

    use super::*;

    fn make_ledger(now: DateTime<Utc>) -> KingdomLedger {
        let mut resources = BTreeMap::new();
        resources.insert(
            ResourceType::Stardust,
            ResourceState {
                current: dec!(0),
                max: dec!(10_000),
                base_generation_rate: dec!(10),
            },
        );
        resources.insert(
            ResourceType::CelestialOre,
            ResourceState {
                current: dec!(0),
                max: dec!(10_000),
                base_generation_rate: dec!(4),
            },
        );
        resources.insert(
            ResourceType::Ether,
            ResourceState {
                current: dec!(0),
                max: dec!(10_000),
                base_generation_rate: dec!(1),
            },
        );
        KingdomLedger {
            kingdom_id: KingdomId::new(),
            user_id: String::from("user-1"),
            zodiac_sign: ZodiacSign::Leo,
            resources,
            modifiers: Vec::new(),
            collection: CollectionState::default(),
            last_tick_time: now,
        }
    }

    #[test]
    fn collect_stages_burst_amounts() {
        let now = Utc::now();
        let mut ledger = make_ledger(now);
        ledger.modifiers.push(BonusModifier {
            source_id: String::from("festival:leo"),
            target: BonusTarget::All,
            percent: dec!(20),
            expires_at: None,
        });

        let attempt = try_begin(&mut ledger, now);
        let staged = match attempt {
            Ok(CollectAttempt::Staged(staged)) => Some(staged),
            _ => None,
        };
        assert!(staged.is_some());
        if let Some(staged) = staged {
            // floor(10 * 60 * 2 * 1.2) = 1440
            assert_eq!(
                staged.collected.get(&ResourceType::Stardust),
                Some(&dec!(1440))
            );
            // floor(4 * 60 * 2 * 1.2) = 576
            assert_eq!(
                staged.collected.get(&ResourceType::CelestialOre),
                Some(&dec!(576))
            );
        }
        // Staging does not touch the live resources.
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(Decimal::ZERO)
        );
        assert!(ledger.collection.in_progress);
    }

    #[test]
    fn commit_applies_resources_and_starts_cooldown() {
        let now = Utc::now();
        let mut ledger = make_ledger(now);

        let attempt = try_begin(&mut ledger, now);
        assert!(attempt.is_ok());
        if let Ok(CollectAttempt::Staged(staged)) = attempt {
            commit(&mut ledger, staged, now);
        }

        assert!(!ledger.collection.in_progress);
        assert_eq!(ledger.collection.last_collection_time, Some(now));
        assert_eq!(ledger.collection.cooldown_remaining(now), COOLDOWN_SECS);
        // floor(10 * 60 * 2 * 1.0) = 1200
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(dec!(1200))
        );
    }

    #[test]
    fn abort_leaves_state_unchanged() {
        let now = Utc::now();
        let mut ledger = make_ledger(now);

        let attempt = try_begin(&mut ledger, now);
        assert!(attempt.is_ok());
        abort(&mut ledger);

        assert!(!ledger.collection.in_progress);
        assert_eq!(ledger.collection.cooldown_remaining(now), 0);
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.current),
            Some(Decimal::ZERO)
        );
        // Immediately retryable.
        let retry = try_begin(&mut ledger, now);
        assert!(matches!(retry, Ok(CollectAttempt::Staged(_))));
    }

    #[test]
    fn second_collect_during_cooldown_is_rejected() {
        let now = Utc::now();
        let mut ledger = make_ledger(now);

        let first = try_begin(&mut ledger, now);
        assert!(first.is_ok());
        if let Ok(CollectAttempt::Staged(staged)) = first {
            commit(&mut ledger, staged, now);
        }
        let before = ledger.resources.clone();

        let second = try_begin(&mut ledger, now);
        assert!(matches!(second, Ok(CollectAttempt::Rejected)));
        // Resource state unchanged by the rejected attempt.
        assert_eq!(ledger.resources, before);
    }

    #[test]
    fn collect_during_in_progress_is_rejected() {
        let now = Utc::now();
        let mut ledger = make_ledger(now);

        let first = try_begin(&mut ledger, now);
        assert!(matches!(first, Ok(CollectAttempt::Staged(_))));
        // First attempt left the ledger Collecting; a concurrent attempt
        // arriving before commit/abort must be a no-op.
        let second = try_begin(&mut ledger, now);
        assert!(matches!(second, Ok(CollectAttempt::Rejected)));
    }

    #[test]
    fn cooldown_expiry_reopens_collection() {
        let now = Utc::now();
        let mut ledger = make_ledger(now);

        let first = try_begin(&mut ledger, now);
        if let Ok(CollectAttempt::Staged(staged)) = first {
            commit(&mut ledger, staged, now);
        }

        let later = now + TimeDelta::seconds(COOLDOWN_SECS + 1);
        let retry = try_begin(&mut ledger, later);
        assert!(matches!(retry, Ok(CollectAttempt::Staged(_))));
    }
}
