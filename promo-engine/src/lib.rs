//! Promotion Engine
//!
//! Pure evaluation engine for the store's promotional rules. One call
//! takes an immutable order snapshot plus the active rule catalogue and
//! returns a deterministic price breakdown: which rules applied, in what
//! order, and what each one did.
//!
//! The engine performs no I/O and holds no mutable state; everything it
//! needs (rules, customer stats, catalogue membership) must be resolved
//! by the caller beforehand. Evaluations of unrelated orders can run
//! concurrently without locking.

mod calculator;
mod matcher;
mod pipeline;
mod selector;

pub use calculator::{EffectOutcome, calculate_effect};
pub use matcher::{NotApplicable, matches_scope, resolve_eligibility};
pub use pipeline::PricingEngine;
pub use selector::{Candidate, select_combination};
