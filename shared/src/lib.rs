//! Shared types for the promotion engine
//!
//! Data model consumed on both sides of the engine boundary: the discount
//! rule catalogue authored in the dashboard, the order snapshot handed in
//! by checkout, and the price breakdown handed back.

pub mod error;
pub mod models;
pub mod order;

// Re-exports
pub use error::{EngineError, EngineResult, RuleValidationError};
pub use models::{
    DiscountRule, DiscountRuleBuilder, DiscountScope, DiscountSource, Effect, GetDiscount,
    RuleOrigin, SimpleDiscount, VolumeTier,
};
pub use order::{OrderSnapshot, PriceBreakdown};
