//! Error types for the economy core.

/// Errors that can occur during accrual and collection computations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// Negative elapsed time passed to accrual. A programming or clock
    /// error on the caller's side; never silently accepted.
    #[error("invalid accrual interval: {elapsed_seconds}s is negative")]
    InvalidInterval {
        /// The offending elapsed interval in seconds.
        elapsed_seconds: i64,
    },

    /// Checked decimal arithmetic failed.
    #[error("arithmetic overflow in resource calculation")]
    ArithmeticOverflow,
}
