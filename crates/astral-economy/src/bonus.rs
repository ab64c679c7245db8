//! Bonus aggregation: combining independent percentage modifiers into one
//! effective multiplier per resource type.
//!
//! Modifiers compose additively as percentages (+30% and +15% yield x1.45,
//! never x1.495). Aggregation is a pure fold over the modifier list, so
//! insertion order never affects the result. Expired modifiers stay in the
//! list and are skipped here (lazy expiry, no reaper).
//!
//! The three bonus *sources* (festival calendar, alliance compatibility
//! table, world event) are external inputs. They are injected as read-only
//! [`BonusTables`] rather than consulted through module-level globals.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use astral_types::{BonusModifier, BonusTarget, KingdomId, ResourceType, ZodiacSign};

/// Compute the effective generation multiplier for one resource type.
///
/// Sums the percent value of every modifier that targets this resource
/// (directly or via `All`) and is live at `now`, then converts the sum to
/// a multiplier: `1 + sum / 100`. A net-negative sum floors the multiplier
/// at zero; generation can stall but never run backwards.
pub fn effective_multiplier(
    resource: ResourceType,
    modifiers: &[BonusModifier],
    now: DateTime<Utc>,
) -> Decimal {
    let sum = modifiers
        .iter()
        .filter(|m| m.is_active(now) && m.target.covers(resource))
        .fold(Decimal::ZERO, |acc, m| acc.saturating_add(m.percent));

    let fraction = sum.checked_div(Decimal::ONE_HUNDRED).unwrap_or(Decimal::ZERO);
    Decimal::ONE.saturating_add(fraction).max(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Festival calendar
// ---------------------------------------------------------------------------

/// One month's festival bonus, granted to kingdoms of a matching sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FestivalBonus {
    /// The zodiac sign celebrated this month.
    pub zodiac_sign: ZodiacSign,
    /// Which resource type(s) the bonus applies to.
    pub target: BonusTarget,
    /// Bonus percentage.
    pub percent: Decimal,
    /// End of the festival month.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The monthly festival rotation. At most one bonus is active at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FestivalCalendar {
    /// The currently active festival bonus, if any.
    active: Option<FestivalBonus>,
}

impl FestivalCalendar {
    /// Create a calendar with the given active bonus.
    pub const fn new(active: Option<FestivalBonus>) -> Self {
        Self { active }
    }

    /// The modifier a kingdom of `sign` receives from the active festival,
    /// if the festival celebrates that sign and has not lapsed.
    pub fn modifier_for(&self, sign: ZodiacSign, now: DateTime<Utc>) -> Option<BonusModifier> {
        let bonus = self.active.as_ref()?;
        if bonus.zodiac_sign != sign {
            return None;
        }
        if bonus.expires_at.is_some_and(|expiry| expiry <= now) {
            return None;
        }
        Some(BonusModifier {
            source_id: format!("festival:{sign:?}").to_lowercase(),
            target: bonus.target,
            percent: bonus.percent,
            expires_at: bonus.expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Alliance compatibility table
// ---------------------------------------------------------------------------

/// Compatibility entry for an ordered pair of zodiac signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlliancePairing {
    /// Percentage adjustment. Negative when `is_penalty` is set.
    pub percent: Decimal,
    /// Whether this pairing penalizes rather than boosts generation.
    pub is_penalty: bool,
}

/// The full alliance compatibility table, keyed by ordered sign pair
/// (own sign first, allied sign second).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceTable {
    pairings: BTreeMap<(ZodiacSign, ZodiacSign), AlliancePairing>,
}

impl AllianceTable {
    /// Build a table from explicit pairings.
    pub const fn new(pairings: BTreeMap<(ZodiacSign, ZodiacSign), AlliancePairing>) -> Self {
        Self { pairings }
    }

    /// Look up the pairing for `(own, ally)`.
    pub fn pairing(&self, own: ZodiacSign, ally: ZodiacSign) -> Option<&AlliancePairing> {
        self.pairings.get(&(own, ally))
    }

    /// The modifier a kingdom of `own` sign receives for being allied with
    /// a kingdom of `ally` sign. Alliance modifiers apply to all resources
    /// and never expire on their own; they vanish when the alliance does.
    pub fn modifier_for(&self, own: ZodiacSign, ally: ZodiacSign) -> Option<BonusModifier> {
        let pairing = self.pairing(own, ally)?;
        Some(BonusModifier {
            source_id: format!("alliance:{own:?}+{ally:?}").to_lowercase(),
            target: BonusTarget::All,
            percent: pairing.percent,
            expires_at: None,
        })
    }
}

// ---------------------------------------------------------------------------
// World event
// ---------------------------------------------------------------------------

/// A time-limited world event (e.g. an Eclipse War) granting a flat bonus
/// to every participant.
///
/// The participant list is append-only: kingdoms join, they are never
/// removed. Deactivating the event merely stops the bonus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEventState {
    /// Human-readable event name (e.g. `eclipse_war`).
    pub name: String,
    /// Whether the event is currently running.
    pub active: bool,
    /// Flat bonus percentage applied identically to every participant.
    pub percent: Decimal,
    /// When the event ends, if scheduled.
    pub ends_at: Option<DateTime<Utc>>,
    participants: BTreeSet<KingdomId>,
}

impl WorldEventState {
    /// Create an inactive event with the given name and bonus.
    pub fn new(name: &str, percent: Decimal) -> Self {
        Self {
            name: name.to_owned(),
            active: false,
            percent,
            ends_at: None,
            participants: BTreeSet::new(),
        }
    }

    /// Add a kingdom to the participant list.
    ///
    /// Joining is exclusively additive; there is deliberately no removal
    /// operation. Returns `false` if the kingdom had already joined.
    pub fn join(&mut self, kingdom: KingdomId) -> bool {
        self.participants.insert(kingdom)
    }

    /// Whether the kingdom has joined the event.
    pub fn is_participant(&self, kingdom: KingdomId) -> bool {
        self.participants.contains(&kingdom)
    }

    /// Number of kingdoms that have joined.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// The modifier a participating kingdom receives while the event runs.
    pub fn modifier_for(&self, kingdom: KingdomId, now: DateTime<Utc>) -> Option<BonusModifier> {
        if !self.active || !self.is_participant(kingdom) {
            return None;
        }
        if self.ends_at.is_some_and(|end| end <= now) {
            return None;
        }
        Some(BonusModifier {
            source_id: format!("event:{}", self.name),
            target: BonusTarget::All,
            percent: self.percent,
            expires_at: self.ends_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Combined tables
// ---------------------------------------------------------------------------

/// The injected read-only bonus configuration consumed by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTables {
    /// Monthly festival rotation.
    pub festival: FestivalCalendar,
    /// Alliance compatibility matrix.
    pub alliance: AllianceTable,
    /// Current world event, if any.
    pub world_event: WorldEventState,
}

impl BonusTables {
    /// Derive the modifier set for one kingdom from all three sources.
    ///
    /// `ally_sign` is the zodiac sign of the kingdom's alliance partner,
    /// if it has one (membership itself is managed elsewhere).
    pub fn active_modifiers(
        &self,
        kingdom: KingdomId,
        sign: ZodiacSign,
        ally_sign: Option<ZodiacSign>,
        now: DateTime<Utc>,
    ) -> Vec<BonusModifier> {
        let mut modifiers = Vec::new();
        if let Some(m) = self.festival.modifier_for(sign, now) {
            modifiers.push(m);
        }
        if let Some(ally) = ally_sign
            && let Some(m) = self.alliance.modifier_for(sign, ally)
        {
            modifiers.push(m);
        }
        if let Some(m) = self.world_event.modifier_for(kingdom, now) {
            modifiers.push(m);
        }
        modifiers
    }
}
