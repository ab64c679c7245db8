//! Passive accrual and manual-burst arithmetic for a kingdom's resources.
//!
//! All quantities are [`Decimal`] -- no floating point. Generated amounts
//! are floored to whole units, and `current` is capped at `max` so the
//! `0 <= current <= max` invariant holds at every observable point.

use rust_decimal::Decimal;

use astral_types::ResourceState;

use crate::error::EconomyError;

/// Seconds of base-rate production granted by one manual collection.
pub const BURST_WINDOW_SECS: i64 = 60;

/// Flat multiplier applied on top of bonuses during a manual collection.
pub const BURST_MULTIPLIER: Decimal = Decimal::TWO;

/// Apply passive accrual over an elapsed interval.
///
/// Computes `floor(base_generation_rate * elapsed_seconds * multiplier)`
/// and adds it to `current`, capped at `max`. Returns the amount actually
/// added, which is less than the raw generated amount when the cap bites.
///
/// A zero interval is a no-op returning zero.
///
/// # Errors
///
/// Returns [`EconomyError::InvalidInterval`] if `elapsed_seconds` is
/// negative, or [`EconomyError::ArithmeticOverflow`] if checked decimal
/// arithmetic fails.
pub fn accrue(
    state: &mut ResourceState,
    elapsed_seconds: i64,
    multiplier: Decimal,
) -> Result<Decimal, EconomyError> {
    if elapsed_seconds < 0 {
        return Err(EconomyError::InvalidInterval { elapsed_seconds });
    }
    if elapsed_seconds == 0 {
        return Ok(Decimal::ZERO);
    }

    let generated = state
        .base_generation_rate
        .checked_mul(Decimal::from(elapsed_seconds))
        .and_then(|v| v.checked_mul(multiplier))
        .ok_or(EconomyError::ArithmeticOverflow)?
        .floor();

    apply_generated(state, generated)
}

/// Apply a manual collection burst.
///
/// Uses the same formula as passive accrual with a fixed window of
/// [`BURST_WINDOW_SECS`] seconds of base rate and the flat
/// [`BURST_MULTIPLIER`], on top of the live bonus multiplier:
/// `floor(rate * 60 * 2 * multiplier)`. Capping works exactly as in
/// [`accrue`]; returns the amount actually collected.
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if checked decimal
/// arithmetic fails.
pub fn collect_burst(
    state: &mut ResourceState,
    multiplier: Decimal,
) -> Result<Decimal, EconomyError> {
    let generated = state
        .base_generation_rate
        .checked_mul(Decimal::from(BURST_WINDOW_SECS))
        .and_then(|v| v.checked_mul(BURST_MULTIPLIER))
        .and_then(|v| v.checked_mul(multiplier))
        .ok_or(EconomyError::ArithmeticOverflow)?
        .floor();

    apply_generated(state, generated)
}

/// Add a generated amount to `current`, capped at `max`.
///
/// Returns the amount actually added. A non-positive generated amount
/// adds nothing (the multiplier is floored at zero upstream, so this
/// only occurs at a zero rate or zero multiplier).
fn apply_generated(
    state: &mut ResourceState,
    generated: Decimal,
) -> Result<Decimal, EconomyError> {
    if generated <= Decimal::ZERO || state.is_full() {
        return Ok(Decimal::ZERO);
    }

    let headroom = state
        .max
        .checked_sub(state.current)
        .ok_or(EconomyError::ArithmeticOverflow)?;

    let added = generated.min(headroom);
    state.current = state
        .current
        .checked_add(added)
        .ok_or(EconomyError::ArithmeticOverflow)?;

    Ok(added)
}
