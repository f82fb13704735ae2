//! Discount Rule Model
//!
//! A promotional rule is a condition/effect pair: gates decide whether the
//! rule is a candidate for an order, the scope decides which line items it
//! touches, and the effect decides what it does to their prices. The
//! discount kind is a closed sum type so that every variant carries only
//! its own fields.

use crate::error::RuleValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a rule comes from: stacked automatically by the store, or
/// triggered by a code the customer enters at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountSource {
    Automatic,
    Code,
}

/// Combination flags for an automatic rule.
///
/// Compatibility is mutual: stacking two rules requires BOTH sides to
/// opt in via the matching flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutomaticCombination {
    /// May sit alongside an entered discount code
    pub with_codes: bool,
    /// May sit alongside other automatic rules
    pub with_other_automatic: bool,
    /// Upper bound on the total number of stacked discounts (>= 1).
    /// Defaults to 2: the rule itself plus the one cross-origin partner
    /// the default flags admit.
    pub max_combined: u32,
}

impl Default for AutomaticCombination {
    fn default() -> Self {
        Self {
            with_codes: true,
            with_other_automatic: false,
            max_combined: 2,
        }
    }
}

/// Combination flags for a code rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodeCombination {
    /// May sit alongside automatic rules
    pub with_automatic: bool,
    /// May sit alongside other entered codes
    pub with_other_codes: bool,
    /// Upper bound on the total number of stacked discounts (>= 1).
    /// Defaults to 2: the rule itself plus the one cross-origin partner
    /// the default flags admit.
    pub max_combined: u32,
}

impl Default for CodeCombination {
    fn default() -> Self {
        Self {
            with_automatic: true,
            with_other_codes: false,
            max_combined: 2,
        }
    }
}

/// Rule origin with origin-specific fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "origin", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleOrigin {
    Automatic {
        #[serde(default)]
        combination: AutomaticCombination,
    },
    Code {
        /// Unique code string, stored uppercase; entry is matched
        /// case-insensitively
        code: String,
        /// Maximum number of redemptions (open-ended when absent)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage_limit: Option<u32>,
        /// Redemptions so far. Incremented by the order pipeline after a
        /// successful checkout, never by the engine.
        #[serde(default)]
        usage_count: u32,
        #[serde(default)]
        combination: CodeCombination,
    },
}

/// Which line items a rule may touch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "applies_to", content = "targets", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountScope {
    AllProducts,
    /// Specific product ids. An empty list matches nothing.
    Products(Vec<i64>),
    /// Lines whose collection ids intersect the given set
    Collections(Vec<i64>),
    /// Lines whose tags intersect the given set
    Tags(Vec<String>),
}

/// Percentage-or-fixed discount used by bundle and volume effects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimpleDiscount {
    Percentage { value: f64 },
    FixedAmount { value: f64 },
}

/// What the "get" units of a BOGO receive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GetDiscount {
    Free,
    Percentage { value: f64 },
    FixedAmount { value: f64 },
}

/// One volume tier: reaching `threshold_qty` eligible units unlocks the
/// tier's discount on the eligible subtotal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeTier {
    pub threshold_qty: u32,
    pub discount: SimpleDiscount,
}

/// The discount kind, one variant per type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    /// Percentage off the eligible subtotal (value in 0-100)
    Percentage { value: f64 },
    /// Fixed amount off the eligible subtotal, capped at the subtotal
    FixedAmount { value: f64 },
    /// Shipping cost becomes zero; no line adjustment
    FreeShipping,
    /// Buy `buy_qty`, get `get_qty` at `get_discount`
    Bogo {
        buy_qty: u32,
        get_qty: u32,
        get_discount: GetDiscount,
        /// When set, buy and get units must come from the same product
        same_product_only: bool,
    },
    /// Discount on the whole eligible subtotal once enough distinct
    /// products are present; no partial bundles
    Bundle {
        min_distinct_products: u32,
        discount: SimpleDiscount,
    },
    /// Quantity tiers, ascending by threshold; the highest reached tier
    /// applies
    Volume { tiers: Vec<VolumeTier> },
    /// Every complete group of `bundle_qty` eligible units is charged
    /// `bundle_price` instead of the units' own prices
    FixedPrice { bundle_qty: u32, bundle_price: f64 },
    /// Once the eligible subtotal reaches `spend_amount`, the customer
    /// pays `pay_amount` for that block (one block per order)
    SpendXPayY { spend_amount: f64, pay_amount: f64 },
}

/// Customer conditions that must all hold
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerGate {
    /// Required segment; `None` admits every customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<CustomerSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_orders_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_lifetime_value: Option<f64>,
}

/// Customer segment as maintained by the customer profile system
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerSegment {
    Vip,
    New,
    Returning,
}

/// Time window conditions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeGate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Active days of week (0=Sunday..6=Saturday), store-local
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// Active hour range, store-local, inclusive on both ends.
    /// `hour_start > hour_end` never matches; wrap-around ranges are not
    /// supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour_start: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour_end: Option<u8>,
}

/// Order size conditions, evaluated against the order subtotal and the
/// total unit count
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderGate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_order_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,
}

/// Discount rule entity
///
/// Immutable input to the engine. Lifecycle (draft, active, expired,
/// deleted) belongs to the authoring system; the engine only reads
/// `is_active` and the gates at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountRule {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    /// Higher value = evaluated and preferred first. Ties break by rule
    /// id ascending.
    pub priority: i32,
    pub origin: RuleOrigin,
    pub scope: DiscountScope,
    pub effect: Effect,
    #[serde(default)]
    pub customer_gate: CustomerGate,
    #[serde(default)]
    pub time_gate: TimeGate,
    #[serde(default)]
    pub order_gate: OrderGate,
    /// When set, an applied rule adds one gift line (quantity 1, price 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_product_id: Option<i64>,
}

impl DiscountRule {
    /// Source of this rule (automatic vs. code)
    pub fn source(&self) -> DiscountSource {
        match self.origin {
            RuleOrigin::Automatic { .. } => DiscountSource::Automatic,
            RuleOrigin::Code { .. } => DiscountSource::Code,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self.origin, RuleOrigin::Code { .. })
    }

    /// The code string, for code-origin rules
    pub fn code(&self) -> Option<&str> {
        match &self.origin {
            RuleOrigin::Code { code, .. } => Some(code),
            RuleOrigin::Automatic { .. } => None,
        }
    }

    /// This rule's own combined-discount cap
    pub fn max_combined(&self) -> u32 {
        match &self.origin {
            RuleOrigin::Automatic { combination } => combination.max_combined,
            RuleOrigin::Code { combination, .. } => combination.max_combined,
        }
    }

    /// Re-run the authoring invariants.
    ///
    /// The builder enforces these at authoring time; the engine re-checks
    /// so a stale or externally-written rule degrades to a non-match
    /// instead of corrupting an evaluation.
    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::EmptyName);
        }

        match &self.origin {
            RuleOrigin::Code { code, combination, .. } => {
                if code.trim().is_empty() {
                    return Err(RuleValidationError::EmptyCode);
                }
                if combination.max_combined == 0 {
                    return Err(RuleValidationError::ZeroCombinationLimit);
                }
            }
            RuleOrigin::Automatic { combination } => {
                if combination.max_combined == 0 {
                    return Err(RuleValidationError::ZeroCombinationLimit);
                }
            }
        }

        validate_effect(&self.effect)?;
        validate_time_gate(&self.time_gate)?;

        if let Some(min) = self.customer_gate.min_lifetime_value {
            validate_amount(min)?;
        }
        for amount in [
            self.order_gate.min_order_amount,
            self.order_gate.max_order_amount,
        ]
        .into_iter()
        .flatten()
        {
            validate_amount(amount)?;
        }

        Ok(())
    }
}

fn validate_amount(value: f64) -> Result<(), RuleValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RuleValidationError::InvalidAmount { value });
    }
    Ok(())
}

fn validate_percentage(value: f64) -> Result<(), RuleValidationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(RuleValidationError::PercentageOutOfRange { value });
    }
    Ok(())
}

fn validate_simple_discount(discount: &SimpleDiscount) -> Result<(), RuleValidationError> {
    match discount {
        SimpleDiscount::Percentage { value } => validate_percentage(*value),
        SimpleDiscount::FixedAmount { value } => validate_amount(*value),
    }
}

fn validate_effect(effect: &Effect) -> Result<(), RuleValidationError> {
    match effect {
        Effect::Percentage { value } => validate_percentage(*value),
        Effect::FixedAmount { value } => validate_amount(*value),
        Effect::FreeShipping => Ok(()),
        Effect::Bogo {
            buy_qty,
            get_qty,
            get_discount,
            ..
        } => {
            if *buy_qty == 0 || *get_qty == 0 {
                return Err(RuleValidationError::ZeroQuantity);
            }
            match get_discount {
                GetDiscount::Free => Ok(()),
                GetDiscount::Percentage { value } => validate_percentage(*value),
                GetDiscount::FixedAmount { value } => validate_amount(*value),
            }
        }
        Effect::Bundle {
            min_distinct_products,
            discount,
        } => {
            if *min_distinct_products == 0 {
                return Err(RuleValidationError::ZeroQuantity);
            }
            validate_simple_discount(discount)
        }
        Effect::Volume { tiers } => {
            if tiers.is_empty() {
                return Err(RuleValidationError::InvalidVolumeTiers);
            }
            let mut previous: Option<u32> = None;
            for tier in tiers {
                if tier.threshold_qty == 0 {
                    return Err(RuleValidationError::InvalidVolumeTiers);
                }
                if let Some(prev) = previous
                    && tier.threshold_qty <= prev
                {
                    return Err(RuleValidationError::InvalidVolumeTiers);
                }
                previous = Some(tier.threshold_qty);
                validate_simple_discount(&tier.discount)?;
            }
            Ok(())
        }
        Effect::FixedPrice {
            bundle_qty,
            bundle_price,
        } => {
            if *bundle_qty == 0 {
                return Err(RuleValidationError::ZeroQuantity);
            }
            validate_amount(*bundle_price)
        }
        Effect::SpendXPayY {
            spend_amount,
            pay_amount,
        } => {
            validate_amount(*spend_amount)?;
            validate_amount(*pay_amount)?;
            if pay_amount >= spend_amount {
                return Err(RuleValidationError::PayNotBelowSpend);
            }
            Ok(())
        }
    }
}

fn validate_time_gate(gate: &TimeGate) -> Result<(), RuleValidationError> {
    if let Some(days) = &gate.days_of_week
        && days.iter().any(|d| *d > 6)
    {
        return Err(RuleValidationError::InvalidDayOfWeek);
    }
    match (gate.hour_start, gate.hour_end) {
        (Some(start), Some(end)) => {
            if start > 23 || end > 23 || start > end {
                return Err(RuleValidationError::InvalidHourRange);
            }
            Ok(())
        }
        (Some(hour), None) | (None, Some(hour)) => {
            if hour > 23 {
                return Err(RuleValidationError::InvalidHourRange);
            }
            Ok(())
        }
        (None, None) => Ok(()),
    }
}
