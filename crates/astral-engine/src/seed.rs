//! Startup seeding: fresh ledgers for kingdoms with no stored record, and
//! the bonus tables read from the `bonuses` section of the config file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use astral_economy::bonus::{
    AlliancePairing, AllianceTable, BonusTables, FestivalBonus, FestivalCalendar, WorldEventState,
};
use astral_economy::config::{KingdomSeedConfig, StartingResourceConfig};
use astral_types::{
    BonusTarget, CollectionState, KingdomId, KingdomLedger, ResourceState, ResourceType,
    ZodiacSign,
};

/// Build a fresh ledger for a kingdom that has never been persisted.
///
/// Starting capacity and base rate come from `starting_stats`, keyed by the
/// resource's snake_case name. A resource missing from the config starts
/// inert (zero capacity, zero rate) with a warning.
pub fn seed_ledger(
    seed: &KingdomSeedConfig,
    starting_stats: &BTreeMap<String, StartingResourceConfig>,
    now: DateTime<Utc>,
) -> KingdomLedger {
    let mut resources = BTreeMap::new();
    for resource in ResourceType::ALL {
        let state = starting_stats.get(resource.as_key()).map_or_else(
            || {
                warn!(
                    kingdom_id = %seed.kingdom_id,
                    resource = resource.as_key(),
                    "resource missing from starting_stats; seeding inert"
                );
                ResourceState::new(Decimal::ZERO, Decimal::ZERO)
            },
            |stats| {
                ResourceState::new(
                    Decimal::from(stats.max),
                    Decimal::from(stats.generation_rate),
                )
            },
        );
        resources.insert(resource, state);
    }

    KingdomLedger {
        kingdom_id: KingdomId::from(seed.kingdom_id),
        user_id: seed.user_id.clone(),
        zodiac_sign: seed.zodiac_sign,
        resources,
        modifiers: Vec::new(),
        collection: CollectionState::default(),
        last_tick_time: now,
    }
}

/// The `bonuses` section of the config file, in a YAML-friendly shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BonusSeedConfig {
    /// The currently active festival, if any.
    #[serde(default)]
    pub festival: Option<FestivalSeed>,

    /// Alliance compatibility entries, each keyed by an ordered sign pair.
    #[serde(default)]
    pub alliances: Vec<AllianceSeed>,

    /// The current world event, if one is configured.
    #[serde(default)]
    pub world_event: Option<WorldEventSeed>,
}

/// One festival entry from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct FestivalSeed {
    /// The zodiac sign the festival celebrates.
    pub zodiac_sign: ZodiacSign,
    /// Which resource type(s) the bonus applies to.
    #[serde(default = "default_target")]
    pub target: BonusTarget,
    /// Bonus percentage.
    pub percent: Decimal,
    /// End of the festival month.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One alliance compatibility entry from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AllianceSeed {
    /// The kingdom's own sign.
    pub own: ZodiacSign,
    /// The allied kingdom's sign.
    pub ally: ZodiacSign,
    /// Percentage adjustment. Negative when `is_penalty` is set.
    pub percent: Decimal,
    /// Whether this pairing penalizes rather than boosts generation.
    #[serde(default)]
    pub is_penalty: bool,
}

/// The world-event entry from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldEventSeed {
    /// Human-readable event name (e.g. `eclipse_war`).
    pub name: String,
    /// Whether the event is currently running.
    #[serde(default)]
    pub active: bool,
    /// Flat bonus percentage applied identically to every participant.
    pub percent: Decimal,
    /// When the event ends, if scheduled.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Kingdoms that have joined the event.
    #[serde(default)]
    pub participants: Vec<Uuid>,
}

const fn default_target() -> BonusTarget {
    BonusTarget::All
}

impl BonusSeedConfig {
    /// Materialize the seed into the live [`BonusTables`].
    pub fn into_tables(self) -> BonusTables {
        let festival = FestivalCalendar::new(self.festival.map(|f| FestivalBonus {
            zodiac_sign: f.zodiac_sign,
            target: f.target,
            percent: f.percent,
            expires_at: f.expires_at,
        }));

        let mut pairings = BTreeMap::new();
        for entry in self.alliances {
            pairings.insert(
                (entry.own, entry.ally),
                AlliancePairing {
                    percent: entry.percent,
                    is_penalty: entry.is_penalty,
                },
            );
        }

        let world_event = self.world_event.map_or_else(WorldEventState::default, |w| {
            let mut event = WorldEventState::new(&w.name, w.percent);
            event.active = w.active;
            event.ends_at = w.ends_at;
            for participant in w.participants {
                let _ = event.join(KingdomId::from(participant));
            }
            event
        });

        BonusTables {
            festival,
            alliance: AllianceTable::new(pairings),
            world_event,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn make_seed() -> KingdomSeedConfig {
        KingdomSeedConfig {
            kingdom_id: Uuid::now_v7(),
            user_id: String::from("user-1"),
            zodiac_sign: ZodiacSign::Leo,
            ally_sign: None,
        }
    }

    #[test]
    fn seed_ledger_covers_every_resource() {
        let mut stats = BTreeMap::new();
        stats.insert(
            String::from("stardust"),
            StartingResourceConfig {
                max: 5_000,
                generation_rate: 10,
            },
        );
        stats.insert(
            String::from("celestial_ore"),
            StartingResourceConfig {
                max: 2_000,
                generation_rate: 4,
            },
        );
        stats.insert(
            String::from("ether"),
            StartingResourceConfig {
                max: 1_000,
                generation_rate: 1,
            },
        );

        let now = Utc::now();
        let ledger = seed_ledger(&make_seed(), &stats, now);

        assert_eq!(ledger.resources.len(), 3);
        assert_eq!(ledger.last_tick_time, now);
        assert_eq!(
            ledger.resource(ResourceType::Stardust).map(|s| s.max),
            Some(dec!(5000))
        );
        assert_eq!(
            ledger
                .resource(ResourceType::CelestialOre)
                .map(|s| s.base_generation_rate),
            Some(dec!(4))
        );
        assert!(ledger.resources.values().all(|s| s.current == Decimal::ZERO));
    }

    #[test]
    fn missing_resource_seeds_inert() {
        let stats = BTreeMap::new();
        let ledger = seed_ledger(&make_seed(), &stats, Utc::now());
        assert_eq!(ledger.resources.len(), 3);
        assert!(ledger.resources.values().all(|s| s.max == Decimal::ZERO));
    }

    #[test]
    fn bonus_seed_parses_from_yaml() {
        let yaml = r#"
festival:
  zodiac_sign: leo
  percent: 30

alliances:
  - own: leo
    ally: aries
    percent: 15
  - own: aries
    ally: cancer
    percent: -10
    is_penalty: true

world_event:
  name: eclipse_war
  active: true
  percent: 25
  participants:
    - "0198c5ce-3f77-7000-8000-000000000001"
"#;
        let seed: Result<BonusSeedConfig, _> = serde_yml::from_str(yaml);
        assert!(seed.is_ok());
        let Ok(seed) = seed else { return };
        let tables = seed.into_tables();

        let now = Utc::now();
        assert!(tables.festival.modifier_for(ZodiacSign::Leo, now).is_some());
        assert!(
            tables
                .alliance
                .modifier_for(ZodiacSign::Leo, ZodiacSign::Aries)
                .is_some()
        );
        assert!(tables.world_event.active);
        assert_eq!(tables.world_event.participant_count(), 1);
    }

    #[test]
    fn empty_bonus_seed_yields_inert_tables() {
        let tables = BonusSeedConfig::default().into_tables();
        let now = Utc::now();
        assert!(tables.festival.modifier_for(ZodiacSign::Leo, now).is_none());
        assert!(!tables.world_event.active);
    }
}
