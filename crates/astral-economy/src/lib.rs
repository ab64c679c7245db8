//! Economy core for Astral Kingdoms: passive accrual, bonus aggregation,
//! and the manual collection cycle.
//!
//! # Modules
//!
//! - [`bonus`] -- additive percentage modifiers and the injected bonus tables
//! - [`ledger`] -- accrual and burst arithmetic over per-resource state
//! - [`collection`] -- the Idle/Collecting/Cooldown state machine
//! - [`clock`] -- the periodic generation tick
//! - [`config`] -- typed YAML configuration
//! - [`error`] -- the economy error taxonomy

pub mod bonus;
pub mod clock;
pub mod collection;
pub mod config;
pub mod error;
pub mod ledger;

pub use bonus::{
    AlliancePairing, AllianceTable, BonusTables, FestivalBonus, FestivalCalendar, WorldEventState,
    effective_multiplier,
};
pub use clock::{TickOutcome, tick};
pub use collection::{COOLDOWN_SECS, CollectAttempt, StagedBurst};
pub use config::{AstralConfig, ConfigError};
pub use error::EconomyError;
pub use ledger::{BURST_MULTIPLIER, BURST_WINDOW_SECS, accrue, collect_burst};
