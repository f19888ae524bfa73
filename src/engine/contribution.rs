// src/engine/contribution.rs

use crate::engine::round_money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Flat-percentage contribution: `base * percentage / 100`, rounded half-up
/// to the minor unit. Used for social-security and educational-insurance
/// parameters. The caller decides whether the result reduces net pay —
/// employer-side amounts never do.
pub fn flat_contribution(base: Decimal, percentage: Decimal) -> Decimal {
    round_money(base * percentage / dec!(100))
}
