//! Enumeration types for the Astral Kingdoms resource core.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resource types
// ---------------------------------------------------------------------------

/// A resource type a kingdom accumulates over time.
///
/// This is a closed enumeration: adding a resource means adding a variant
/// here and handling it everywhere the compiler points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Fine stellar dust, the common currency of growth.
    Stardust,
    /// Dense ore mined from fallen star fragments.
    CelestialOre,
    /// Volatile essence distilled from the night sky.
    Ether,
}

impl ResourceType {
    /// All resource types, in canonical order.
    pub const ALL: [Self; 3] = [Self::Stardust, Self::CelestialOre, Self::Ether];

    /// The snake_case key used in the persisted record.
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::Stardust => "stardust",
            Self::CelestialOre => "celestial_ore",
            Self::Ether => "ether",
        }
    }
}

// ---------------------------------------------------------------------------
// Zodiac signs
// ---------------------------------------------------------------------------

/// A zodiac sign assigned to every kingdom at creation.
///
/// The festival calendar and the alliance compatibility table both key
/// their bonuses on zodiac signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ZodiacSign {
    /// The Ram.
    Aries,
    /// The Bull.
    Taurus,
    /// The Twins.
    Gemini,
    /// The Crab.
    Cancer,
    /// The Lion.
    Leo,
    /// The Maiden.
    Virgo,
    /// The Scales.
    Libra,
    /// The Scorpion.
    Scorpio,
    /// The Archer.
    Sagittarius,
    /// The Sea-Goat.
    Capricorn,
    /// The Water-Bearer.
    Aquarius,
    /// The Fish.
    Pisces,
}

// ---------------------------------------------------------------------------
// Bonus targeting
// ---------------------------------------------------------------------------

/// What a bonus modifier applies to: one resource type or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum BonusTarget {
    /// The modifier applies to every resource type.
    All,
    /// The modifier applies to a single resource type.
    Resource(ResourceType),
}

impl BonusTarget {
    /// Return whether this target covers the given resource type.
    pub fn covers(self, resource: ResourceType) -> bool {
        match self {
            Self::All => true,
            Self::Resource(r) => r == resource,
        }
    }
}

// ---------------------------------------------------------------------------
// Collection phases
// ---------------------------------------------------------------------------

/// The phase of the manual collection cycle.
///
/// Phases cycle `Idle -> Collecting -> Cooldown -> Idle`. The phase is
/// derived from [`CollectionState`] fields rather than stored.
///
/// [`CollectionState`]: crate::structs::CollectionState
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CollectPhase {
    /// No collection in progress and no cooldown running.
    Idle,
    /// A collection burst is being computed and flushed.
    Collecting,
    /// The post-collection cooldown is counting down.
    Cooldown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_serializes_snake_case() {
        let json = serde_json::to_string(&ResourceType::CelestialOre);
        assert!(json.is_ok());
        assert_eq!(json.unwrap_or_default(), "\"celestial_ore\"");
    }

    #[test]
    fn resource_keys_match_serde_names() {
        for resource in ResourceType::ALL {
            let json = serde_json::to_string(&resource).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", resource.as_key()));
        }
    }

    #[test]
    fn target_all_covers_everything() {
        for resource in ResourceType::ALL {
            assert!(BonusTarget::All.covers(resource));
        }
    }

    #[test]
    fn target_resource_covers_only_itself() {
        let target = BonusTarget::Resource(ResourceType::Ether);
        assert!(target.covers(ResourceType::Ether));
        assert!(!target.covers(ResourceType::Stardust));
        assert!(!target.covers(ResourceType::CelestialOre));
    }
}
