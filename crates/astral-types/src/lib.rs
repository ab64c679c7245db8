//! Shared type definitions for the Astral Kingdoms resource core.
//!
//! This crate is the single source of truth for all types used across the
//! workspace. Types defined here flow downstream to `TypeScript` via
//! `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Enumeration types (resources, zodiac signs, phases)
//! - [`structs`] -- Ledger aggregate and the persisted record shape

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BonusTarget, CollectPhase, ResourceType, ZodiacSign};
pub use ids::KingdomId;
pub use structs::{
    BonusModifier, CollectionRecord, CollectionState, KingdomLedger, KingdomRecord, ResourceState,
    ResourceStatRecord,
};
