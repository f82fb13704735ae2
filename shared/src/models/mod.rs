//! Data models for the promotion engine

mod builder;
mod discount_rule;

pub use builder::DiscountRuleBuilder;
pub use discount_rule::{
    AutomaticCombination, CodeCombination, CustomerGate, CustomerSegment, DiscountRule,
    DiscountScope, DiscountSource, Effect, GetDiscount, OrderGate, RuleOrigin, SimpleDiscount,
    TimeGate, VolumeTier,
};
