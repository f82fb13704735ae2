//! Error types for the promotion engine
//!
//! Two distinct families: authoring-time validation failures (returned by
//! the rule builder, never seen during evaluation) and invocation errors
//! (the only thing `evaluate` raises). A rule that merely fails a gate or
//! matches nothing is not an error anywhere in this workspace.

use thiserror::Error;

/// Rejection reasons for a rule draft.
///
/// Produced by `DiscountRuleBuilder::build` and by the
/// `DiscountRule::validate` re-check inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleValidationError {
    #[error("rule name must not be empty")]
    EmptyName,

    #[error("discount code must not be empty")]
    EmptyCode,

    #[error("percentage value {value} is outside 0-100")]
    PercentageOutOfRange { value: f64 },

    #[error("monetary amount {value} must be finite and non-negative")]
    InvalidAmount { value: f64 },

    #[error("quantity field must be at least 1")]
    ZeroQuantity,

    #[error("volume tiers must be non-empty with strictly ascending thresholds")]
    InvalidVolumeTiers,

    #[error("spend/pay amounts require pay < spend")]
    PayNotBelowSpend,

    #[error("hour range must satisfy 0 <= start <= end <= 23")]
    InvalidHourRange,

    #[error("day-of-week values must be within 0-6")]
    InvalidDayOfWeek,

    #[error("combined discount limit must be at least 1")]
    ZeroCombinationLimit,
}

/// Invocation errors: caller misuse, not data conditions.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The order snapshot itself is unusable (non-finite or negative
    /// prices, zero quantities). Indicates a bug upstream, not a rule
    /// or customer condition.
    #[error("invalid order snapshot: {reason}")]
    InvalidSnapshot { reason: String },
}

impl EngineError {
    /// Create an InvalidSnapshot error
    pub fn invalid_snapshot(reason: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            reason: reason.into(),
        }
    }
}

/// Result type for engine invocations
pub type EngineResult<T> = Result<T, EngineError>;
