//! Monetary arithmetic helpers.
//!
//! All money is `rust_decimal::Decimal`; these helpers pin the rounding
//! policy (2 decimal places, midpoint away from zero) at the computation
//! boundaries so totals never drift from what documents display.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::LineInput;

/// Monetary scale: 2 decimal places.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary value to 2 decimal places, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total: quantity × unit price, rounded per line so the document
/// total equals the sum of the printed line totals.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round_money(quantity * unit_price)
}

/// Authoritative document total: the sum of its line totals.
pub fn document_total(lines: &[LineInput]) -> Decimal {
    lines
        .iter()
        .map(|line| line_total(line.quantity, line.unit_price))
        .sum()
}
