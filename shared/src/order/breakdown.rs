//! Price breakdown - the engine's output
//!
//! Pure data: which rules applied (in application order), what each one
//! did, per-line attribution, and the resulting totals. The checkout
//! pipeline owns acting on it (cart mutation, usage-count increments,
//! display).

use crate::models::{DiscountRule, DiscountSource};
use serde::{Deserialize, Serialize};

/// Record of one applied rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedDiscount {
    pub rule_id: i64,
    pub name: String,
    /// The entered code, for code-origin rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub source: DiscountSource,
    pub priority: i32,
    /// Monetary adjustment, always <= 0 (zero for shipping- or gift-only
    /// rules)
    pub amount: f64,
    /// Whether this rule zeroed the shipping cost
    #[serde(default)]
    pub free_shipping: bool,
    /// Gift granted by this rule, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_product_id: Option<i64>,
}

impl AppliedDiscount {
    /// Create from a rule with the computed adjustment
    pub fn from_rule(rule: &DiscountRule, amount: f64, free_shipping: bool) -> Self {
        Self {
            rule_id: rule.id,
            name: rule.name.clone(),
            code: rule.code().map(str::to_string),
            source: rule.source(),
            priority: rule.priority,
            amount,
            free_shipping,
            gift_product_id: rule.gift_product_id,
        }
    }
}

/// Gift line added by an applied rule (quantity 1, price 0)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GiftLine {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price: f64,
    /// The rule that granted the gift
    pub granted_by_rule: i64,
}

impl GiftLine {
    pub fn new(product_id: i64, granted_by_rule: i64) -> Self {
        Self {
            product_id,
            quantity: 1,
            unit_price: 0.0,
            granted_by_rule,
        }
    }
}

/// Per-line result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineBreakdown {
    pub product_id: i64,
    pub line_total: f64,
    /// Accumulated discount on this line, >= 0
    pub discount: f64,
    pub line_total_after_discount: f64,
}

/// Complete result of one evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdown {
    /// Applied rules, in application order (highest priority first)
    pub applied: Vec<AppliedDiscount>,
    /// Per-line attribution, same order as the snapshot lines
    pub lines: Vec<LineBreakdown>,
    pub subtotal: f64,
    /// Total of all line adjustments, >= 0
    pub items_discount: f64,
    pub subtotal_after_discount: f64,
    pub shipping: f64,
    pub shipping_discount: f64,
    pub shipping_after_discount: f64,
    /// Gift lines granted by applied rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gift_lines: Vec<GiftLine>,
    pub total: f64,
}

impl PriceBreakdown {
    /// Breakdown of an order no rule touched
    pub fn untouched(subtotal: f64, shipping: f64) -> Self {
        Self {
            applied: vec![],
            lines: vec![],
            subtotal,
            items_discount: 0.0,
            subtotal_after_discount: subtotal,
            shipping,
            shipping_discount: 0.0,
            shipping_after_discount: shipping,
            gift_lines: vec![],
            total: subtotal + shipping,
        }
    }

    /// Ids of applied rules, in application order
    pub fn applied_rule_ids(&self) -> Vec<i64> {
        self.applied.iter().map(|a| a.rule_id).collect()
    }
}
