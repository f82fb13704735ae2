//! Effect Calculators
//!
//! One pure function per discount kind. Calculators operate on the CURRENT
//! per-line totals (rules apply sequentially, each against the state left
//! by the previous one) and emit per-line discount amounts already rounded
//! to the minor unit with round-half-to-even. All intermediate math stays
//! in `rust_decimal::Decimal`; nothing is rounded mid-computation.

use rust_decimal::prelude::*;
use shared::models::{Effect, GetDiscount, SimpleDiscount, VolumeTier};
use shared::order::LineItem;

/// Monetary values carry 2 decimal places at rest
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for output, rounded half-to-even
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
        .to_f64()
        .unwrap_or_default()
}

/// Round to the minor unit, half-to-even
#[inline]
fn round_minor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Result of running one effect against the current line totals
#[derive(Debug, Clone, PartialEq)]
pub struct EffectOutcome {
    /// Discount per line (same length and order as the snapshot lines),
    /// every entry >= 0 and <= the line's current total
    pub per_line: Vec<Decimal>,
    /// Whether the effect zeroes the shipping cost
    pub free_shipping: bool,
}

impl EffectOutcome {
    fn nil(line_count: usize) -> Self {
        Self {
            per_line: vec![Decimal::ZERO; line_count],
            free_shipping: false,
        }
    }

    /// Total discount across all lines
    pub fn total(&self) -> Decimal {
        self.per_line.iter().copied().sum()
    }

    /// True when the effect changes nothing (no adjustment, no shipping)
    pub fn is_nil(&self) -> bool {
        !self.free_shipping && self.total().is_zero()
    }
}

/// One sellable unit inside the eligible pool, priced at the line's
/// current unit price
#[derive(Debug, Clone, Copy)]
struct Unit {
    line: usize,
    price: Decimal,
}

/// Compute one effect against the current line totals.
///
/// # Arguments
/// * `effect` - the discount kind and its parameters
/// * `lines` - the snapshot lines (for quantities and product ids)
/// * `current_totals` - per-line totals after previously applied rules
/// * `eligible` - indexes of the lines within the rule's scope
pub fn calculate_effect(
    effect: &Effect,
    lines: &[LineItem],
    current_totals: &[Decimal],
    eligible: &[usize],
) -> EffectOutcome {
    let n = lines.len();
    if eligible.is_empty() {
        return EffectOutcome::nil(n);
    }

    match effect {
        Effect::Percentage { value } => {
            let subtotal = eligible_subtotal(current_totals, eligible);
            let raw = subtotal * to_decimal(*value) / Decimal::ONE_HUNDRED;
            subtotal_discount(raw, lines, current_totals, eligible)
        }
        Effect::FixedAmount { value } => {
            subtotal_discount(to_decimal(*value), lines, current_totals, eligible)
        }
        Effect::FreeShipping => EffectOutcome {
            per_line: vec![Decimal::ZERO; n],
            free_shipping: true,
        },
        Effect::Bogo {
            buy_qty,
            get_qty,
            get_discount,
            same_product_only,
        } => bogo_discount(
            *buy_qty,
            *get_qty,
            get_discount,
            *same_product_only,
            lines,
            current_totals,
            eligible,
        ),
        Effect::Bundle {
            min_distinct_products,
            discount,
        } => {
            let distinct: std::collections::HashSet<i64> = eligible
                .iter()
                .map(|&index| lines[index].product_id)
                .collect();
            if (distinct.len() as u32) < *min_distinct_products {
                return EffectOutcome::nil(n);
            }
            let subtotal = eligible_subtotal(current_totals, eligible);
            subtotal_discount(
                simple_discount_amount(discount, subtotal),
                lines,
                current_totals,
                eligible,
            )
        }
        Effect::Volume { tiers } => {
            volume_discount(tiers, lines, current_totals, eligible)
        }
        Effect::FixedPrice {
            bundle_qty,
            bundle_price,
        } => fixed_price_discount(*bundle_qty, *bundle_price, lines, current_totals, eligible),
        Effect::SpendXPayY {
            spend_amount,
            pay_amount,
        } => {
            let subtotal = eligible_subtotal(current_totals, eligible);
            let spend = to_decimal(*spend_amount);
            if subtotal < spend {
                return EffectOutcome::nil(n);
            }
            // One spend block per order: the discount is the difference
            // between spend and pay, regardless of how far the subtotal
            // exceeds the threshold
            let raw = spend - to_decimal(*pay_amount);
            subtotal_discount(raw, lines, current_totals, eligible)
        }
    }
}

fn eligible_subtotal(current_totals: &[Decimal], eligible: &[usize]) -> Decimal {
    eligible.iter().map(|&index| current_totals[index]).sum()
}

fn total_eligible_quantity(lines: &[LineItem], eligible: &[usize]) -> u64 {
    eligible
        .iter()
        .map(|&index| u64::from(lines[index].quantity))
        .sum()
}

fn simple_discount_amount(discount: &SimpleDiscount, subtotal: Decimal) -> Decimal {
    match discount {
        SimpleDiscount::Percentage { value } => {
            subtotal * to_decimal(*value) / Decimal::ONE_HUNDRED
        }
        SimpleDiscount::FixedAmount { value } => to_decimal(*value),
    }
}

/// Build the eligible unit pool at current unit prices, in line order
fn build_units(lines: &[LineItem], current_totals: &[Decimal], eligible: &[usize]) -> Vec<Unit> {
    let mut units = Vec::new();
    for &index in eligible {
        let quantity = lines[index].quantity;
        if quantity == 0 {
            continue;
        }
        let unit_price = current_totals[index] / Decimal::from(quantity);
        for _ in 0..quantity {
            units.push(Unit {
                line: index,
                price: unit_price,
            });
        }
    }
    units
}

/// A subtotal-wide discount: cap at the eligible subtotal, round once,
/// then apportion whole cents across the eligible lines in proportion to
/// their current totals (largest fractional remainder first, ties by line
/// order).
fn subtotal_discount(
    raw: Decimal,
    lines: &[LineItem],
    current_totals: &[Decimal],
    eligible: &[usize],
) -> EffectOutcome {
    let n = lines.len();
    let subtotal = eligible_subtotal(current_totals, eligible);
    if subtotal <= Decimal::ZERO || raw <= Decimal::ZERO {
        return EffectOutcome::nil(n);
    }

    let amount = round_minor(raw.min(subtotal));
    let amount_cents = (amount * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .unwrap_or(0);
    if amount_cents <= 0 {
        return EffectOutcome::nil(n);
    }

    // Floor each proportional share to whole cents, remember remainders
    let mut shares: Vec<(usize, i64, Decimal)> = Vec::with_capacity(eligible.len());
    let mut assigned = 0i64;
    for &index in eligible {
        let raw_cents = amount * Decimal::ONE_HUNDRED * current_totals[index] / subtotal;
        let floor_cents = raw_cents.floor().to_i64().unwrap_or(0);
        shares.push((index, floor_cents, raw_cents - raw_cents.floor()));
        assigned += floor_cents;
    }

    // Hand out the leftover cents to the largest remainders
    let mut leftover = amount_cents - assigned;
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].2.cmp(&shares[a].2).then(a.cmp(&b)));
    for position in order {
        if leftover <= 0 {
            break;
        }
        shares[position].1 += 1;
        leftover -= 1;
    }

    let mut per_line = vec![Decimal::ZERO; n];
    for (index, cents, _) in shares {
        per_line[index] = Decimal::new(cents, DECIMAL_PLACES).min(current_totals[index]);
    }
    EffectOutcome {
        per_line,
        free_shipping: false,
    }
}

/// Discount received by one "get" unit
fn get_unit_discount(get_discount: &GetDiscount, unit_price: Decimal) -> Decimal {
    match get_discount {
        GetDiscount::Free => unit_price,
        GetDiscount::Percentage { value } => {
            unit_price * to_decimal(*value) / Decimal::ONE_HUNDRED
        }
        GetDiscount::FixedAmount { value } => to_decimal(*value).min(unit_price),
    }
}

fn bogo_discount(
    buy_qty: u32,
    get_qty: u32,
    get_discount: &GetDiscount,
    same_product_only: bool,
    lines: &[LineItem],
    current_totals: &[Decimal],
    eligible: &[usize],
) -> EffectOutcome {
    let n = lines.len();
    let group = u64::from(buy_qty) + u64::from(get_qty);
    if group == 0 {
        return EffectOutcome::nil(n);
    }

    let mut per_line = vec![Decimal::ZERO; n];

    if same_product_only {
        // Units pool per distinct product: a product must supply both its
        // own buy and get units
        let mut products: Vec<(i64, Vec<Unit>)> = Vec::new();
        for &index in eligible {
            let units = build_units(lines, current_totals, &[index]);
            match products
                .iter_mut()
                .find(|(product_id, _)| *product_id == lines[index].product_id)
            {
                Some((_, pool)) => pool.extend(units),
                None => products.push((lines[index].product_id, units)),
            }
        }
        for (_, mut pool) in products {
            pool.sort_by(|a, b| a.price.cmp(&b.price));
            let pairs = pool.len() as u64 / group;
            let discounted = (pairs * u64::from(get_qty)) as usize;
            for unit in pool.iter().take(discounted) {
                per_line[unit.line] += get_unit_discount(get_discount, unit.price);
            }
        }
    } else {
        // One pool across all eligible units; the cheapest units receive
        // the discount, ties broken by line order
        let mut pool = build_units(lines, current_totals, eligible);
        pool.sort_by(|a, b| a.price.cmp(&b.price));
        let pairs = pool.len() as u64 / group;
        let discounted = (pairs * u64::from(get_qty)) as usize;
        for unit in pool.iter().take(discounted) {
            per_line[unit.line] += get_unit_discount(get_discount, unit.price);
        }
    }

    finalize(per_line, current_totals)
}

fn volume_discount(
    tiers: &[VolumeTier],
    lines: &[LineItem],
    current_totals: &[Decimal],
    eligible: &[usize],
) -> EffectOutcome {
    let n = lines.len();
    let quantity = total_eligible_quantity(lines, eligible);
    let Some(tier) = tiers
        .iter()
        .filter(|tier| u64::from(tier.threshold_qty) <= quantity)
        .max_by_key(|tier| tier.threshold_qty)
    else {
        return EffectOutcome::nil(n);
    };

    let subtotal = eligible_subtotal(current_totals, eligible);
    subtotal_discount(
        simple_discount_amount(&tier.discount, subtotal),
        lines,
        current_totals,
        eligible,
    )
}

/// Every complete group of `bundle_qty` eligible units is charged
/// `bundle_price`; the groups are filled with the highest-priced units
/// (ties by line order), and the saving is attributed equally per bundled
/// unit.
fn fixed_price_discount(
    bundle_qty: u32,
    bundle_price: f64,
    lines: &[LineItem],
    current_totals: &[Decimal],
    eligible: &[usize],
) -> EffectOutcome {
    let n = lines.len();
    if bundle_qty == 0 {
        return EffectOutcome::nil(n);
    }

    let mut pool = build_units(lines, current_totals, eligible);
    pool.sort_by(|a, b| b.price.cmp(&a.price));

    let groups = pool.len() as u64 / u64::from(bundle_qty);
    if groups == 0 {
        return EffectOutcome::nil(n);
    }
    let bundled = (groups * u64::from(bundle_qty)) as usize;

    let bundled_sum: Decimal = pool.iter().take(bundled).map(|unit| unit.price).sum();
    let charged = Decimal::from(groups) * to_decimal(bundle_price);
    let saving = bundled_sum - charged;
    if saving <= Decimal::ZERO {
        return EffectOutcome::nil(n);
    }

    let per_unit = saving / Decimal::from(bundled as u64);
    let mut per_line = vec![Decimal::ZERO; n];
    for unit in pool.iter().take(bundled) {
        per_line[unit.line] += per_unit;
    }
    finalize(per_line, current_totals)
}

/// Round each line's accumulated amount to the minor unit and clamp it to
/// the line's current total
fn finalize(mut per_line: Vec<Decimal>, current_totals: &[Decimal]) -> EffectOutcome {
    for (amount, total) in per_line.iter_mut().zip(current_totals) {
        *amount = round_minor(*amount).min(*total).max(Decimal::ZERO);
    }
    EffectOutcome {
        per_line,
        free_shipping: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{GetDiscount, SimpleDiscount};

    fn make_line(product_id: i64, unit_price: f64, quantity: u32) -> LineItem {
        LineItem {
            product_id,
            collection_ids: vec![],
            tags: vec![],
            unit_price,
            quantity,
        }
    }

    fn totals(lines: &[LineItem]) -> Vec<Decimal> {
        lines.iter().map(|line| to_decimal(line.line_total())).collect()
    }

    fn all_lines(lines: &[LineItem]) -> Vec<usize> {
        (0..lines.len()).collect()
    }

    #[test]
    fn test_percentage_on_subtotal() {
        // 10% of 200.00 = 20.00
        let lines = vec![make_line(1, 50.0, 4)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::Percentage { value: 10.0 },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.total(), Decimal::new(2000, 2));
        assert!(!outcome.free_shipping);
    }

    #[test]
    fn test_percentage_apportionment_sums_exactly() {
        // 10% of 100.01 = 10.001 -> rounds to 10.00, split across three
        // lines without losing a cent
        let lines = vec![
            make_line(1, 33.34, 1),
            make_line(2, 33.34, 1),
            make_line(3, 33.33, 1),
        ];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::Percentage { value: 10.0 },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.total(), Decimal::new(1000, 2));
        let per_line_sum: Decimal = outcome.per_line.iter().copied().sum();
        assert_eq!(per_line_sum, outcome.total());
    }

    #[test]
    fn test_fixed_amount_capped_at_subtotal() {
        // 50.00 off a 30.00 subtotal caps at 30.00
        let lines = vec![make_line(1, 30.0, 1)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::FixedAmount { value: 50.0 },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.total(), Decimal::new(3000, 2));
    }

    #[test]
    fn test_free_shipping_has_no_line_effect() {
        let lines = vec![make_line(1, 30.0, 1)];
        let current = totals(&lines);
        let outcome =
            calculate_effect(&Effect::FreeShipping, &lines, &current, &all_lines(&lines));
        assert!(outcome.free_shipping);
        assert_eq!(outcome.total(), Decimal::ZERO);
        assert!(!outcome.is_nil());
    }

    #[test]
    fn test_bogo_same_product_pairs() {
        // Buy 1 get 1 free, 4 units of one product at 50: 2 pairs -> 2
        // free units -> 100.00
        let lines = vec![make_line(1, 50.0, 4)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::Bogo {
                buy_qty: 1,
                get_qty: 1,
                get_discount: GetDiscount::Free,
                same_product_only: true,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.total(), Decimal::new(10000, 2));
    }

    #[test]
    fn test_bogo_same_product_ignores_cross_product_pairs() {
        // One unit each of two products cannot form a same-product pair
        let lines = vec![make_line(1, 50.0, 1), make_line(2, 50.0, 1)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::Bogo {
                buy_qty: 1,
                get_qty: 1,
                get_discount: GetDiscount::Free,
                same_product_only: true,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert!(outcome.is_nil());
    }

    #[test]
    fn test_bogo_pooled_discounts_cheapest_units() {
        // Pool of 30 + 10: one pair, the 10.00 unit goes free
        let lines = vec![make_line(1, 30.0, 1), make_line(2, 10.0, 1)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::Bogo {
                buy_qty: 1,
                get_qty: 1,
                get_discount: GetDiscount::Free,
                same_product_only: false,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.per_line[0], Decimal::ZERO);
        assert_eq!(outcome.per_line[1], Decimal::new(1000, 2));
    }

    #[test]
    fn test_bogo_get_discount_percentage_and_fixed() {
        let lines = vec![make_line(1, 50.0, 2)];
        let current = totals(&lines);

        // 50% off one unit of 50.00 = 25.00
        let outcome = calculate_effect(
            &Effect::Bogo {
                buy_qty: 1,
                get_qty: 1,
                get_discount: GetDiscount::Percentage { value: 50.0 },
                same_product_only: true,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.total(), Decimal::new(2500, 2));

        // Fixed 80.00 off one 50.00 unit caps at the unit price
        let outcome = calculate_effect(
            &Effect::Bogo {
                buy_qty: 1,
                get_qty: 1,
                get_discount: GetDiscount::FixedAmount { value: 80.0 },
                same_product_only: true,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.total(), Decimal::new(5000, 2));
    }

    #[test]
    fn test_bundle_requires_distinct_products() {
        let effect = Effect::Bundle {
            min_distinct_products: 3,
            discount: SimpleDiscount::Percentage { value: 20.0 },
        };

        // Two distinct products, quantity 3: not enough
        let lines = vec![make_line(1, 10.0, 2), make_line(2, 10.0, 1)];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert!(outcome.is_nil());

        // Three distinct products: 20% of 30.00 = 6.00
        let lines = vec![
            make_line(1, 10.0, 1),
            make_line(2, 10.0, 1),
            make_line(3, 10.0, 1),
        ];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert_eq!(outcome.total(), Decimal::new(600, 2));
    }

    #[test]
    fn test_volume_selects_highest_reached_tier() {
        let effect = Effect::Volume {
            tiers: vec![
                VolumeTier {
                    threshold_qty: 3,
                    discount: SimpleDiscount::Percentage { value: 10.0 },
                },
                VolumeTier {
                    threshold_qty: 5,
                    discount: SimpleDiscount::Percentage { value: 20.0 },
                },
            ],
        };

        // Quantity 4 reaches the 3-unit tier only: 10% of 200.00
        let lines = vec![make_line(1, 50.0, 4)];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert_eq!(outcome.total(), Decimal::new(2000, 2));

        // Quantity 5 unlocks the 20% tier
        let lines = vec![make_line(1, 50.0, 5)];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert_eq!(outcome.total(), Decimal::new(5000, 2));

        // Quantity 2 reaches no tier
        let lines = vec![make_line(1, 50.0, 2)];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert!(outcome.is_nil());
    }

    #[test]
    fn test_fixed_price_bundles_highest_priced_units() {
        // 2-for-55: units 40/30/20, the 40 and 30 form the group,
        // saving = 70 - 55 = 15, attributed 7.50 per bundled unit
        let lines = vec![
            make_line(1, 40.0, 1),
            make_line(2, 30.0, 1),
            make_line(3, 20.0, 1),
        ];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::FixedPrice {
                bundle_qty: 2,
                bundle_price: 55.0,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert_eq!(outcome.per_line[0], Decimal::new(750, 2));
        assert_eq!(outcome.per_line[1], Decimal::new(750, 2));
        assert_eq!(outcome.per_line[2], Decimal::ZERO);
    }

    #[test]
    fn test_fixed_price_ignores_incomplete_groups() {
        let lines = vec![make_line(1, 40.0, 1)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::FixedPrice {
                bundle_qty: 2,
                bundle_price: 55.0,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert!(outcome.is_nil());
    }

    #[test]
    fn test_fixed_price_above_unit_prices_is_nil() {
        // A "bundle" dearer than the units would be a surcharge; it must
        // not produce one
        let lines = vec![make_line(1, 10.0, 2)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::FixedPrice {
                bundle_qty: 2,
                bundle_price: 25.0,
            },
            &lines,
            &current,
            &all_lines(&lines),
        );
        assert!(outcome.is_nil());
    }

    #[test]
    fn test_spend_x_pay_y_single_block() {
        let effect = Effect::SpendXPayY {
            spend_amount: 300.0,
            pay_amount: 200.0,
        };

        // Subtotal 350 meets the threshold: discount is exactly 100.00,
        // not proportional to the full 350
        let lines = vec![make_line(1, 70.0, 5)];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert_eq!(outcome.total(), Decimal::new(10000, 2));

        // Subtotal 250 does not reach the threshold
        let lines = vec![make_line(1, 50.0, 5)];
        let current = totals(&lines);
        let outcome = calculate_effect(&effect, &lines, &current, &all_lines(&lines));
        assert!(outcome.is_nil());
    }

    #[test]
    fn test_effect_only_touches_eligible_lines() {
        // Second line is out of scope and must stay untouched
        let lines = vec![make_line(1, 100.0, 1), make_line(2, 100.0, 1)];
        let current = totals(&lines);
        let outcome = calculate_effect(
            &Effect::Percentage { value: 10.0 },
            &lines,
            &current,
            &[0],
        );
        assert_eq!(outcome.per_line[0], Decimal::new(1000, 2));
        assert_eq!(outcome.per_line[1], Decimal::ZERO);
    }

    #[test]
    fn test_no_line_discount_exceeds_current_total() {
        // Sequential state: line already discounted to 5.00; a fixed
        // 50.00 discount must clamp to what is left
        let lines = vec![make_line(1, 30.0, 1)];
        let current = vec![Decimal::new(500, 2)];
        let outcome = calculate_effect(
            &Effect::FixedAmount { value: 50.0 },
            &lines,
            &current,
            &[0],
        );
        assert_eq!(outcome.total(), Decimal::new(500, 2));
    }

    #[test]
    fn test_rounding_is_half_to_even() {
        assert_eq!(to_f64(Decimal::new(10125, 3)), 10.12); // 10.125 -> 10.12
        assert_eq!(to_f64(Decimal::new(10135, 3)), 10.14); // 10.135 -> 10.14
    }
}
