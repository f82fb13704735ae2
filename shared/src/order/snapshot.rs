//! Order snapshot - read-only view of one order at evaluation time
//!
//! The snapshot is assembled by the checkout pipeline from its own cart
//! state plus catalogue and customer lookups; the engine never fetches
//! anything itself. One snapshot, one evaluation.

use crate::error::{EngineError, EngineResult};
use crate::models::CustomerSegment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cart line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub product_id: i64,
    /// Collections the product belongs to (for collection-scoped rules)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collection_ids: Vec<i64>,
    /// Product tag names (for tag-scoped rules)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub unit_price: f64,
    pub quantity: u32,
}

impl LineItem {
    /// Undiscounted line total
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Customer descriptor, resolved upstream from the profile system
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerInfo {
    /// `None` for guests or unsegmented customers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<CustomerSegment>,
    #[serde(default)]
    pub orders_count: u32,
    #[serde(default)]
    pub lifetime_value: f64,
}

/// Shipping rate chosen for the order, if any
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingRate {
    pub price: f64,
    /// Orders whose pre-discount subtotal reaches this ship free
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_shipping_threshold: Option<f64>,
}

/// Immutable input for one evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Cart lines, in cart order. Order matters: it is the deterministic
    /// tie-break for unit-level discounts.
    pub lines: Vec<LineItem>,
    #[serde(default)]
    pub customer: CustomerInfo,
    pub evaluated_at: DateTime<Utc>,
    /// The single entered discount code, if any (one code slot per cart)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingRate>,
}

impl OrderSnapshot {
    /// Pre-discount order subtotal, derived from the lines
    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(LineItem::line_total).sum()
    }

    /// Total unit count across all lines
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Reject snapshots that indicate caller bugs rather than data
    /// conditions: non-finite or negative prices, zero quantities.
    pub fn validate(&self) -> EngineResult<()> {
        for (index, line) in self.lines.iter().enumerate() {
            if !line.unit_price.is_finite() || line.unit_price < 0.0 {
                return Err(EngineError::invalid_snapshot(format!(
                    "line {index} has invalid unit price {}",
                    line.unit_price
                )));
            }
            if line.quantity == 0 {
                return Err(EngineError::invalid_snapshot(format!(
                    "line {index} has zero quantity"
                )));
            }
        }
        if let Some(rate) = &self.shipping {
            if !rate.price.is_finite() || rate.price < 0.0 {
                return Err(EngineError::invalid_snapshot(format!(
                    "shipping rate has invalid price {}",
                    rate.price
                )));
            }
        }
        if !self.customer.lifetime_value.is_finite() || self.customer.lifetime_value < 0.0 {
            return Err(EngineError::invalid_snapshot(format!(
                "customer lifetime value {} is invalid",
                self.customer.lifetime_value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_line(product_id: i64, unit_price: f64, quantity: u32) -> LineItem {
        LineItem {
            product_id,
            collection_ids: vec![],
            tags: vec![],
            unit_price,
            quantity,
        }
    }

    fn make_snapshot(lines: Vec<LineItem>) -> OrderSnapshot {
        OrderSnapshot {
            lines,
            customer: CustomerInfo::default(),
            evaluated_at: Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap(),
            entered_code: None,
            shipping: None,
        }
    }

    #[test]
    fn test_derived_totals() {
        let snapshot = make_snapshot(vec![make_line(1, 50.0, 4), make_line(2, 10.0, 2)]);
        assert_eq!(snapshot.subtotal(), 220.0);
        assert_eq!(snapshot.total_quantity(), 6);
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let snapshot = make_snapshot(vec![make_line(1, 50.0, 0)]);
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let snapshot = make_snapshot(vec![make_line(1, -1.0, 1)]);
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_empty_order() {
        let snapshot = make_snapshot(vec![]);
        assert!(snapshot.validate().is_ok());
        assert_eq!(snapshot.subtotal(), 0.0);
    }
}
