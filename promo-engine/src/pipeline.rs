//! Pricing Pipeline
//!
//! Orchestrates one evaluation: gate every rule, select the combination,
//! apply the selected effects sequentially (each against the state left by
//! the previous one), and assemble the price breakdown. Application order
//! materially changes the numbers; the selector's total order keeps it
//! deterministic.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::error::EngineResult;
use shared::models::DiscountRule;
use shared::order::{AppliedDiscount, GiftLine, LineBreakdown, OrderSnapshot, PriceBreakdown};
use tracing::{debug, warn};

use crate::calculator::{calculate_effect, to_decimal, to_f64};
use crate::matcher::resolve_eligibility;
use crate::selector::{Candidate, select_combination};

/// Promotion pricing engine.
///
/// Stateless apart from the store timezone, which day-of-week and
/// hour-of-day gates are evaluated in. Cheap to clone, safe to share.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    tz: Tz,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl PricingEngine {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Evaluate the rule catalogue against one order snapshot.
    ///
    /// Returns the price breakdown, or an invocation error when the
    /// snapshot itself is unusable. Rules that fail gates, match nothing,
    /// or are malformed never cause an error; they are skipped (and
    /// logged).
    pub fn evaluate(
        &self,
        snapshot: &OrderSnapshot,
        rules: &[DiscountRule],
    ) -> EngineResult<PriceBreakdown> {
        snapshot.validate()?;

        let local_now = snapshot.evaluated_at.with_timezone(&self.tz);
        let original: Vec<Decimal> = snapshot
            .lines
            .iter()
            .map(|line| to_decimal(line.line_total()))
            .collect();
        let shipping_in_play = snapshot
            .shipping
            .as_ref()
            .is_some_and(|rate| rate.price > 0.0);

        // Gather candidates. A rule whose dry-run against the original
        // totals changes nothing is dropped here so it never consumes a
        // combination slot.
        let mut candidates = Vec::new();
        for rule in rules {
            if let Err(error) = rule.validate() {
                warn!(rule_id = rule.id, %error, "skipping malformed rule");
                continue;
            }
            let eligible = match resolve_eligibility(rule, snapshot, &local_now) {
                Ok(eligible) => eligible,
                Err(reason) => {
                    debug!(rule_id = rule.id, ?reason, "rule not applicable");
                    continue;
                }
            };
            let probe = calculate_effect(&rule.effect, &snapshot.lines, &original, &eligible);
            let effective = probe.total() > Decimal::ZERO
                || (probe.free_shipping && shipping_in_play)
                || rule.gift_product_id.is_some();
            if !effective {
                debug!(rule_id = rule.id, "rule matches but changes nothing");
                continue;
            }
            candidates.push(Candidate { rule, eligible });
        }

        let selected = select_combination(candidates);

        // Apply in order against the running line totals
        let mut current = original.clone();
        let mut applied = Vec::with_capacity(selected.len());
        let mut gift_lines: Vec<GiftLine> = Vec::new();
        let mut rule_free_shipping = false;

        for candidate in &selected {
            let outcome = calculate_effect(
                &candidate.rule.effect,
                &snapshot.lines,
                &current,
                &candidate.eligible,
            );
            for (total, amount) in current.iter_mut().zip(&outcome.per_line) {
                *total -= (*amount).min(*total);
            }
            if outcome.free_shipping {
                rule_free_shipping = true;
            }
            if let Some(product_id) = candidate.rule.gift_product_id {
                gift_lines.push(GiftLine::new(product_id, candidate.rule.id));
            }
            applied.push(AppliedDiscount::from_rule(
                candidate.rule,
                to_f64(-outcome.total()),
                outcome.free_shipping,
            ));
        }

        // Shipping: a selected rule may zero it, and the rate's own
        // threshold is checked against the pre-discount subtotal
        let subtotal: Decimal = original.iter().copied().sum();
        let (shipping, shipping_discount) = match &snapshot.shipping {
            Some(rate) => {
                let threshold_met = rate
                    .free_shipping_threshold
                    .is_some_and(|threshold| to_f64(subtotal) >= threshold);
                if rule_free_shipping || threshold_met {
                    (rate.price, rate.price)
                } else {
                    (rate.price, 0.0)
                }
            }
            None => (0.0, 0.0),
        };
        let shipping_after_discount = shipping - shipping_discount;

        let subtotal_after_discount: Decimal = current.iter().copied().sum();
        let lines = snapshot
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| LineBreakdown {
                product_id: line.product_id,
                line_total: to_f64(original[index]),
                discount: to_f64(original[index] - current[index]),
                line_total_after_discount: to_f64(current[index]),
            })
            .collect();

        Ok(PriceBreakdown {
            applied,
            lines,
            subtotal: to_f64(subtotal),
            items_discount: to_f64(subtotal - subtotal_after_discount),
            subtotal_after_discount: to_f64(subtotal_after_discount),
            shipping,
            shipping_discount,
            shipping_after_discount,
            gift_lines,
            total: to_f64(subtotal_after_discount) + shipping_after_discount,
        })
    }
}
