//! The generation clock: periodic passive-accrual ticks.
//!
//! [`tick`] is invoked on a fixed period (the period is a config tunable,
//! not a correctness requirement). Each tick accrues every resource type
//! over the whole seconds elapsed since `last_tick_time` under its
//! aggregated bonus multiplier, then advances `last_tick_time` by exactly
//! the seconds consumed. The sub-second remainder stays in the interval
//! and is credited once it completes a whole second on a later tick.
//!
//! A non-positive interval (clock skew, duplicate tick) skips the tick
//! entirely and leaves `last_tick_time` untouched: moving it backwards
//! would grant double accrual on the next healthy tick.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use astral_types::{KingdomLedger, ResourceType};

use crate::error::EconomyError;
use crate::{bonus, ledger};

/// Summary of one generation tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// Amount actually added per resource type (after capping).
    pub generated: BTreeMap<ResourceType, Decimal>,
    /// Whether any resource changed. Callers skip the persistence flush
    /// when nothing did (every store already at capacity).
    pub changed: bool,
    /// Whether the tick was skipped because the interval was non-positive.
    pub skipped: bool,
}

/// Run one passive-accrual tick against a ledger at `now`.
///
/// # Errors
///
/// Returns [`EconomyError`] if accrual arithmetic fails. The elapsed
/// interval itself is guarded here, so [`EconomyError::InvalidInterval`]
/// is never produced by this path.
#[allow(clippy::arithmetic_side_effects)] // chrono interval arithmetic
pub fn tick(ledger: &mut KingdomLedger, now: DateTime<Utc>) -> Result<TickOutcome, EconomyError> {
    let elapsed_seconds = (now - ledger.last_tick_time).num_seconds();
    if elapsed_seconds <= 0 {
        debug!(
            kingdom_id = %ledger.kingdom_id,
            elapsed_seconds,
            "skipping tick with non-positive interval"
        );
        return Ok(TickOutcome {
            skipped: true,
            ..TickOutcome::default()
        });
    }

    let mut generated = BTreeMap::new();
    let mut changed = false;

    for resource in ResourceType::ALL {
        let multiplier = bonus::effective_multiplier(resource, &ledger.modifiers, now);
        if let Some(state) = ledger.resources.get_mut(&resource) {
            let added = ledger::accrue(state, elapsed_seconds, multiplier)?;
            if added > Decimal::ZERO {
                changed = true;
            }
            generated.insert(resource, added);
        }
    }

    // Advance by the whole seconds consumed, not to `now`: the fractional
    // remainder belongs to the next interval, never discarded.
    ledger.last_tick_time = ledger
        .last_tick_time
        .checked_add_signed(TimeDelta::seconds(elapsed_seconds))
        .unwrap_or(now);

    debug!(
        kingdom_id = %ledger.kingdom_id,
        elapsed_seconds,
        changed,
        "generation tick applied"
    );

    Ok(TickOutcome {
        generated,
        changed,
        skipped: false,
    })
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use astral_types::{
        BonusModifier, BonusTarget, CollectionState, KingdomId, ResourceState, ZodiacSign,
    };
    use chrono::TimeDelta;
    use rust_decimal_macros::dec;

    use super::*;

    fn make_ledger(now: DateTime<Utc>) -> KingdomLedger {
        let mut resources = BTreeMap::new();
        resources.insert(
            ResourceType::Stardust,
            ResourceState {
                current: dec!(0),
                max: dec!(500),
                base_generation_rate: dec!(10),
            },
        );
        resources.insert(
            ResourceType::CelestialOre,
            ResourceState {
                current: dec!(0),
                max: dec!(200),
                base_generation_rate: dec!(2),
            },
        );
        resources.insert(
            ResourceType::Ether,
            ResourceState {
                current: dec!(0),
                max: dec!(100),
                base_generation_rate: dec!(0),
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
    fn tick_accrues_every_resource() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);
        let now = start + TimeDelta::seconds(5);

        let outcome = tick(&mut ledger, now);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_default();

        assert!(outcome.changed);
        assert!(!outcome.skipped);
        assert_eq!(outcome.generated.get(&ResourceType::Stardust), Some(&dec!(50)));
        assert_eq!(
            outcome.generated.get(&ResourceType::CelestialOre),
            Some(&dec!(10))
        );
        assert_eq!(outcome.generated.get(&ResourceType::Ether), Some(&dec!(0)));
        assert_eq!(ledger.last_tick_time, now);
    }

    #[test]
    fn tick_applies_targeted_modifier() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);
        ledger.modifiers.push(BonusModifier {
            source_id: String::from("festival:leo"),
            target: BonusTarget::Resource(ResourceType::Stardust),
            percent: dec!(20),
            expires_at: None,
        });
        let now = start + TimeDelta::seconds(5);

        let outcome = tick(&mut ledger, now);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_default();

        // floor(10 * 5 * 1.2) = 60 for stardust, ore unaffected.
        assert_eq!(outcome.generated.get(&ResourceType::Stardust), Some(&dec!(60)));
        assert_eq!(
            outcome.generated.get(&ResourceType::CelestialOre),
            Some(&dec!(10))
        );
    }

    #[test]
    fn skewed_clock_skips_tick() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);
        let earlier = start - TimeDelta::seconds(10);

        let outcome = tick(&mut ledger, earlier);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_default();

        assert!(outcome.skipped);
        assert!(!outcome.changed);
        // last_tick_time untouched; moving it backwards would double-accrue.
        assert_eq!(ledger.last_tick_time, start);
    }

    #[test]
    fn duplicate_tick_is_skipped() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);

        let outcome = tick(&mut ledger, start);
        assert!(outcome.is_ok());
        assert!(outcome.unwrap_or_default().skipped);
    }

    #[test]
    fn fractional_interval_carries_remainder() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);

        // 5.9 s elapsed: 5 whole seconds are consumed, the 0.9 s
        // remainder stays in the interval.
        let first = start + TimeDelta::milliseconds(5_900);
        let outcome = tick(&mut ledger, first);
        assert!(outcome.is_ok());
        assert_eq!(
            outcome.unwrap_or_default().generated.get(&ResourceType::Stardust),
            Some(&dec!(50))
        );
        assert_eq!(ledger.last_tick_time, start + TimeDelta::seconds(5));

        // One second later the carried remainder completes a whole
        // second and is credited instead of vanishing.
        let second = start + TimeDelta::milliseconds(6_900);
        let outcome = tick(&mut ledger, second);
        assert!(outcome.is_ok());
        assert_eq!(
            outcome.unwrap_or_default().generated.get(&ResourceType::Stardust),
            Some(&dec!(10))
        );
        assert_eq!(ledger.last_tick_time, start + TimeDelta::seconds(6));
    }

    #[test]
    fn subsecond_interval_is_deferred() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);

        let outcome = tick(&mut ledger, start + TimeDelta::milliseconds(900));
        assert!(outcome.is_ok());
        assert!(outcome.unwrap_or_default().skipped);
        // Nothing consumed, nothing lost.
        assert_eq!(ledger.last_tick_time, start);
    }

    #[test]
    fn tick_with_everything_full_reports_unchanged() {
        let start = Utc::now();
        let mut ledger = make_ledger(start);
        for state in ledger.resources.values_mut() {
            state.current = state.max;
        }
        let now = start + TimeDelta::seconds(5);

        let outcome = tick(&mut ledger, now);
        assert!(outcome.is_ok());
        let outcome = outcome.unwrap_or_default();

        assert!(!outcome.changed);
        assert!(!outcome.skipped);
        // The clock still advances so the interval is not re-counted.
        assert_eq!(ledger.last_tick_time, now);
    }
}
