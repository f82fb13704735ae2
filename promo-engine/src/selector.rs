//! Combination Selector
//!
//! Decides which of the matched candidates may legally apply together and
//! in what order. Greedy walk in priority order; a skipped candidate is
//! not an error, it simply does not combine this round.

use shared::models::{DiscountRule, RuleOrigin};

/// A rule that passed every gate, with its eligible line indexes
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub rule: &'a DiscountRule,
    pub eligible: Vec<usize>,
}

/// Select the subset of candidates to apply, in application order.
///
/// 1. Sort by priority descending, rule id ascending (stable total order).
/// 2. Walk the sorted list, accepting a candidate only when it is mutually
///    combinable with every already-accepted rule, respects the single
///    code slot, and stays under the tightest combined-discount cap in
///    the prospective stack.
pub fn select_combination<'a>(mut candidates: Vec<Candidate<'a>>) -> Vec<Candidate<'a>> {
    candidates.sort_by(|a, b| {
        b.rule
            .priority
            .cmp(&a.rule.priority)
            .then(a.rule.id.cmp(&b.rule.id))
    });

    let mut accepted: Vec<Candidate<'a>> = Vec::new();
    for candidate in candidates {
        if !accepted
            .iter()
            .all(|applied| mutually_combinable(candidate.rule, applied.rule))
        {
            continue;
        }
        // One code slot per cart: a second code rule never joins, whatever
        // its flags say
        if candidate.rule.is_code() && accepted.iter().any(|applied| applied.rule.is_code()) {
            continue;
        }
        if !under_cap(candidate.rule, &accepted) {
            continue;
        }
        accepted.push(candidate);
    }
    accepted
}

/// Both sides must opt in for a pair of rules to stack
fn mutually_combinable(a: &DiscountRule, b: &DiscountRule) -> bool {
    match (&a.origin, &b.origin) {
        (
            RuleOrigin::Code { combination: code, .. },
            RuleOrigin::Automatic { combination: auto },
        )
        | (
            RuleOrigin::Automatic { combination: auto },
            RuleOrigin::Code { combination: code, .. },
        ) => code.with_automatic && auto.with_codes,
        (
            RuleOrigin::Automatic { combination: first },
            RuleOrigin::Automatic { combination: second },
        ) => first.with_other_automatic && second.with_other_automatic,
        (
            RuleOrigin::Code { combination: first, .. },
            RuleOrigin::Code { combination: second, .. },
        ) => first.with_other_codes && second.with_other_codes,
    }
}

/// The cap is the tightest `max_combined` across the prospective stack,
/// the candidate's own included
fn under_cap(candidate: &DiscountRule, accepted: &[Candidate<'_>]) -> bool {
    let cap = accepted
        .iter()
        .map(|applied| applied.rule.max_combined())
        .chain([candidate.max_combined()])
        .min()
        .unwrap_or(1);
    accepted.len() as u32 + 1 <= cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{
        AutomaticCombination, CodeCombination, DiscountRuleBuilder, Effect,
    };

    fn automatic(id: i64, priority: i32, combination: AutomaticCombination) -> DiscountRule {
        DiscountRuleBuilder::automatic(id, format!("auto-{id}"), Effect::Percentage {
            value: 10.0,
        })
        .priority(priority)
        .automatic_combination(combination)
        .build()
        .unwrap()
    }

    fn code(id: i64, priority: i32, combination: CodeCombination) -> DiscountRule {
        DiscountRuleBuilder::code(id, format!("CODE{id}"), Effect::Percentage { value: 10.0 })
            .priority(priority)
            .code_combination(combination)
            .build()
            .unwrap()
    }

    fn stackable_auto() -> AutomaticCombination {
        AutomaticCombination {
            with_codes: true,
            with_other_automatic: true,
            max_combined: 10,
        }
    }

    fn candidates<'a>(rules: &'a [DiscountRule]) -> Vec<Candidate<'a>> {
        rules
            .iter()
            .map(|rule| Candidate {
                rule,
                eligible: vec![0],
            })
            .collect()
    }

    fn selected_ids(selected: &[Candidate<'_>]) -> Vec<i64> {
        selected.iter().map(|c| c.rule.id).collect()
    }

    #[test]
    fn test_priority_order_with_id_tie_break() {
        let rules = vec![
            automatic(3, 5, stackable_auto()),
            automatic(1, 5, stackable_auto()),
            automatic(2, 9, stackable_auto()),
        ];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![2, 1, 3]);
    }

    #[test]
    fn test_exclusive_automatics_keep_highest_priority_only() {
        // Both refuse other automatics: only the higher-priority one wins
        let exclusive = AutomaticCombination {
            with_codes: true,
            with_other_automatic: false,
            max_combined: 5,
        };
        let rules = vec![automatic(1, 1, exclusive.clone()), automatic(2, 7, exclusive)];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![2]);
    }

    #[test]
    fn test_automatic_stacking_requires_both_flags() {
        // First accepts others, second refuses: they cannot stack
        let open = stackable_auto();
        let closed = AutomaticCombination {
            with_codes: true,
            with_other_automatic: false,
            max_combined: 10,
        };
        let rules = vec![automatic(1, 9, open), automatic(2, 5, closed)];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![1]);
    }

    #[test]
    fn test_code_automatic_mix_is_mutual() {
        let code_open = CodeCombination {
            with_automatic: true,
            with_other_codes: false,
            max_combined: 5,
        };
        let auto_closed = AutomaticCombination {
            with_codes: false,
            with_other_automatic: false,
            max_combined: 5,
        };

        // Automatic side refuses codes: only the automatic (higher
        // priority) survives
        let rules = vec![automatic(1, 9, auto_closed), code(2, 5, code_open.clone())];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![1]);

        // Both sides opt in
        let auto_open = AutomaticCombination {
            with_codes: true,
            with_other_automatic: false,
            max_combined: 5,
        };
        let rules = vec![automatic(1, 9, auto_open), code(2, 5, code_open)];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![1, 2]);
    }

    #[test]
    fn test_single_code_slot() {
        // Even two codes that allow other codes cannot both occupy the one
        // code slot; the first by priority is kept
        let open = CodeCombination {
            with_automatic: true,
            with_other_codes: true,
            max_combined: 5,
        };
        let rules = vec![code(1, 3, open.clone()), code(2, 8, open)];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![2]);
    }

    #[test]
    fn test_cap_is_minimum_across_stack() {
        // The second rule's cap of 2 binds the whole stack: the third rule
        // is rejected even though its own cap is high
        let loose = stackable_auto();
        let tight = AutomaticCombination {
            with_codes: true,
            with_other_automatic: true,
            max_combined: 2,
        };
        let rules = vec![
            automatic(1, 9, loose.clone()),
            automatic(2, 8, tight),
            automatic(3, 7, loose),
        ];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![1, 2]);
    }

    #[test]
    fn test_candidate_own_cap_counts() {
        // A candidate with cap 1 cannot join an existing stack
        let loose = stackable_auto();
        let solo = AutomaticCombination {
            with_codes: true,
            with_other_automatic: true,
            max_combined: 1,
        };
        let rules = vec![automatic(1, 9, loose), automatic(2, 5, solo)];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![1]);
    }

    #[test]
    fn test_skipped_candidate_does_not_block_later_ones() {
        // Rule 2 is incompatible with rule 1, but rule 3 still combines
        let open = stackable_auto();
        let closed = AutomaticCombination {
            with_codes: true,
            with_other_automatic: false,
            max_combined: 10,
        };
        let rules = vec![
            automatic(1, 9, open.clone()),
            automatic(2, 8, closed),
            automatic(3, 7, open),
        ];
        let selected = select_combination(candidates(&rules));
        assert_eq!(selected_ids(&selected), vec![1, 3]);
    }

    #[test]
    fn test_empty_candidates() {
        let selected = select_combination(Vec::<Candidate<'_>>::new());
        assert!(selected.is_empty());
    }
}
