//! Decimal money helpers
//!
//! All monetary values in CollabPay are `rust_decimal::Decimal`, never
//! binary floats. Derived-amount invariants are checked against a fixed
//! tolerance of 0.01 currency units.

use rust_decimal::Decimal;

/// Tolerance for derived-amount comparisons (0.01 currency units)
pub fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Whether two amounts agree within the platform tolerance
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= tolerance()
}

/// Round an amount to cent precision, bankers' rounding
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}
