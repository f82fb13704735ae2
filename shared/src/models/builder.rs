//! Discount Rule Builder
//!
//! The sanctioned constructor for authored rules. The dashboard forms
//! (or any other authoring surface) funnel their state through this
//! builder so that only well-formed `DiscountRule` values ever reach the
//! engine. Codes are normalized to uppercase here; the engine compares
//! entered codes uppercased as well.

use super::discount_rule::{
    AutomaticCombination, CodeCombination, CustomerGate, DiscountRule, DiscountScope, Effect,
    OrderGate, RuleOrigin, TimeGate,
};
use crate::error::RuleValidationError;

/// Builder producing validated `DiscountRule` values
#[derive(Debug, Clone)]
pub struct DiscountRuleBuilder {
    rule: DiscountRule,
}

impl DiscountRuleBuilder {
    /// Start an automatic rule with default gates and combination flags
    pub fn automatic(id: i64, name: impl Into<String>, effect: Effect) -> Self {
        Self {
            rule: DiscountRule {
                id,
                name: name.into(),
                is_active: true,
                priority: 0,
                origin: RuleOrigin::Automatic {
                    combination: AutomaticCombination::default(),
                },
                scope: DiscountScope::AllProducts,
                effect,
                customer_gate: CustomerGate::default(),
                time_gate: TimeGate::default(),
                order_gate: OrderGate::default(),
                gift_product_id: None,
            },
        }
    }

    /// Start a code rule. The code is uppercased; the rule's display name
    /// defaults to the normalized code.
    pub fn code(id: i64, code: impl Into<String>, effect: Effect) -> Self {
        let normalized = code.into().trim().to_uppercase();
        Self {
            rule: DiscountRule {
                id,
                name: normalized.clone(),
                is_active: true,
                priority: 0,
                origin: RuleOrigin::Code {
                    code: normalized,
                    usage_limit: None,
                    usage_count: 0,
                    combination: CodeCombination::default(),
                },
                scope: DiscountScope::AllProducts,
                effect,
                customer_gate: CustomerGate::default(),
                time_gate: TimeGate::default(),
                order_gate: OrderGate::default(),
                gift_product_id: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.rule.name = name.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.rule.priority = priority;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.rule.is_active = false;
        self
    }

    pub fn scope(mut self, scope: DiscountScope) -> Self {
        self.rule.scope = scope;
        self
    }

    pub fn customer_gate(mut self, gate: CustomerGate) -> Self {
        self.rule.customer_gate = gate;
        self
    }

    pub fn time_gate(mut self, gate: TimeGate) -> Self {
        self.rule.time_gate = gate;
        self
    }

    pub fn order_gate(mut self, gate: OrderGate) -> Self {
        self.rule.order_gate = gate;
        self
    }

    pub fn gift_product(mut self, product_id: i64) -> Self {
        self.rule.gift_product_id = Some(product_id);
        self
    }

    /// Replace the combination flags of an automatic rule. Ignored for
    /// code rules; use `code_combination` there.
    pub fn automatic_combination(mut self, combination: AutomaticCombination) -> Self {
        if let RuleOrigin::Automatic { combination: slot } = &mut self.rule.origin {
            *slot = combination;
        }
        self
    }

    /// Replace the combination flags of a code rule
    pub fn code_combination(mut self, combination: CodeCombination) -> Self {
        if let RuleOrigin::Code { combination: slot, .. } = &mut self.rule.origin {
            *slot = combination;
        }
        self
    }

    /// Set the usage limit and current usage count of a code rule
    pub fn usage(mut self, limit: Option<u32>, count: u32) -> Self {
        if let RuleOrigin::Code {
            usage_limit,
            usage_count,
            ..
        } = &mut self.rule.origin
        {
            *usage_limit = limit;
            *usage_count = count;
        }
        self
    }

    /// Validate and produce the rule
    pub fn build(self) -> Result<DiscountRule, RuleValidationError> {
        self.rule.validate()?;
        Ok(self.rule)
    }
}
