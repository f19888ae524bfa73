// src/engine/mod.rs
//
// The calculation core: pure, deterministic, no I/O. Handlers and the
// payroll service feed it resolved inputs and persist what comes out.

pub mod contribution;
pub mod params;
pub mod stub;
pub mod tax;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to the currency's minor unit (2 decimals), half-up. Applied once per
/// computed field, never accumulated across intermediate steps.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
