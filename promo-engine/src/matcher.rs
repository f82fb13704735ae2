//! Eligibility Resolver
//!
//! Decides (a) whether a rule is a candidate for an order at all (gating
//! conditions) and (b) which line items fall within its scope. A rule that
//! fails here is simply excluded from the candidate set; that is never an
//! error.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use shared::models::{CustomerGate, DiscountRule, DiscountScope, OrderGate, RuleOrigin, TimeGate};
use shared::order::{CustomerInfo, LineItem, OrderSnapshot};

/// Why a rule dropped out of the candidate set.
///
/// Used for debug logging and tests only; callers of the engine never see
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApplicable {
    Inactive,
    /// Code rule without a matching entered code
    CodeMismatch,
    UsageLimitReached,
    NotStarted,
    Expired,
    OutsideActiveDays,
    OutsideActiveHours,
    CustomerSegment,
    OrdersCountBelowMinimum,
    LifetimeValueBelowMinimum,
    OrderAmountOutOfRange,
    OrderQuantityOutOfRange,
    /// All gates passed but no line item falls within the scope
    NoEligibleLines,
}

/// Resolve a rule against an order snapshot.
///
/// Returns the indexes of the eligible line items when every gate passes
/// and the scope matches at least one line.
///
/// # Arguments
/// * `rule` - the rule under consideration
/// * `snapshot` - the order being priced
/// * `local_now` - the evaluation timestamp in the store's timezone
///   (day-of-week and hour gates are store-local)
pub fn resolve_eligibility(
    rule: &DiscountRule,
    snapshot: &OrderSnapshot,
    local_now: &DateTime<Tz>,
) -> Result<Vec<usize>, NotApplicable> {
    if !rule.is_active {
        return Err(NotApplicable::Inactive);
    }

    check_code(rule, snapshot.entered_code.as_deref())?;
    check_time_gate(&rule.time_gate, snapshot.evaluated_at, local_now)?;
    check_customer_gate(&rule.customer_gate, &snapshot.customer)?;
    check_order_gate(
        &rule.order_gate,
        snapshot.subtotal(),
        snapshot.total_quantity(),
    )?;

    let eligible: Vec<usize> = snapshot
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| matches_scope(&rule.scope, line))
        .map(|(index, _)| index)
        .collect();

    if eligible.is_empty() {
        return Err(NotApplicable::NoEligibleLines);
    }
    Ok(eligible)
}

/// Check whether a single line falls within a rule's scope.
///
/// Empty target lists match nothing: a `Products([])` rule is a rule
/// about no products, not about all of them.
pub fn matches_scope(scope: &DiscountScope, line: &LineItem) -> bool {
    match scope {
        DiscountScope::AllProducts => true,
        DiscountScope::Products(ids) => ids.contains(&line.product_id),
        DiscountScope::Collections(ids) => {
            line.collection_ids.iter().any(|id| ids.contains(id))
        }
        DiscountScope::Tags(names) => line.tags.iter().any(|tag| names.contains(tag)),
    }
}

/// Code and usage-limit gate. Automatic rules pass unconditionally.
fn check_code(rule: &DiscountRule, entered: Option<&str>) -> Result<(), NotApplicable> {
    let RuleOrigin::Code {
        code,
        usage_limit,
        usage_count,
        ..
    } = &rule.origin
    else {
        return Ok(());
    };

    // Case-insensitive match, compared uppercased
    let matched = entered
        .map(|e| e.trim().to_uppercase() == code.to_uppercase())
        .unwrap_or(false);
    if !matched {
        return Err(NotApplicable::CodeMismatch);
    }

    if let Some(limit) = usage_limit
        && usage_count >= limit
    {
        return Err(NotApplicable::UsageLimitReached);
    }
    Ok(())
}

fn check_time_gate(
    gate: &TimeGate,
    at: DateTime<Utc>,
    local: &DateTime<Tz>,
) -> Result<(), NotApplicable> {
    if let Some(starts_at) = gate.starts_at
        && at < starts_at
    {
        return Err(NotApplicable::NotStarted);
    }
    if let Some(ends_at) = gate.ends_at
        && at > ends_at
    {
        return Err(NotApplicable::Expired);
    }

    if let Some(days) = &gate.days_of_week {
        let current_day = match local.weekday() {
            Weekday::Sun => 0,
            Weekday::Mon => 1,
            Weekday::Tue => 2,
            Weekday::Wed => 3,
            Weekday::Thu => 4,
            Weekday::Fri => 5,
            Weekday::Sat => 6,
        };
        if !days.contains(&current_day) {
            return Err(NotApplicable::OutsideActiveDays);
        }
    }

    if let (Some(start), Some(end)) = (gate.hour_start, gate.hour_end) {
        // Inverted ranges never match; wrap-around is not supported
        let hour = local.hour() as u8;
        if start > end || hour < start || hour > end {
            return Err(NotApplicable::OutsideActiveHours);
        }
    }

    Ok(())
}

fn check_customer_gate(
    gate: &CustomerGate,
    customer: &CustomerInfo,
) -> Result<(), NotApplicable> {
    if let Some(required) = gate.segment
        && customer.segment != Some(required)
    {
        return Err(NotApplicable::CustomerSegment);
    }
    if let Some(min_orders) = gate.min_orders_count
        && customer.orders_count < min_orders
    {
        return Err(NotApplicable::OrdersCountBelowMinimum);
    }
    if let Some(min_value) = gate.min_lifetime_value
        && customer.lifetime_value < min_value
    {
        return Err(NotApplicable::LifetimeValueBelowMinimum);
    }
    Ok(())
}

fn check_order_gate(
    gate: &OrderGate,
    subtotal: f64,
    total_quantity: u32,
) -> Result<(), NotApplicable> {
    if let Some(min) = gate.min_order_amount
        && subtotal < min
    {
        return Err(NotApplicable::OrderAmountOutOfRange);
    }
    if let Some(max) = gate.max_order_amount
        && subtotal > max
    {
        return Err(NotApplicable::OrderAmountOutOfRange);
    }
    if let Some(min) = gate.min_quantity
        && total_quantity < min
    {
        return Err(NotApplicable::OrderQuantityOutOfRange);
    }
    if let Some(max) = gate.max_quantity
        && total_quantity > max
    {
        return Err(NotApplicable::OrderQuantityOutOfRange);
    }
    Ok(())
}
