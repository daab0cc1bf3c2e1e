//! CollabPay Fee Engine
//!
//! The commission rate is the platform's share of a collaboration's agreed
//! amount; the complement is the influencer's net payout.
//!
//! The rate is resolved exactly once per collaboration, at creation, and
//! then threaded through every downstream computation (escrow creation,
//! milestone release). Nothing downstream ever consults a default again, so
//! the fee computed at creation and the fee recomputed later cannot diverge.

use collabpay_types::money::round_cents;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Platform default commission rate (10%)
pub const DEFAULT_COMMISSION_RATE: Decimal = dec!(0.10);

/// Commission policy for the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fraction of the gross amount retained by the platform
    pub commission_rate: Decimal,
}

impl FeeSchedule {
    /// Schedule with an explicit rate
    pub fn new(commission_rate: Decimal) -> Self {
        Self { commission_rate }
    }

    /// Resolve the rate for a new collaboration: the caller's override if
    /// given, otherwise the platform default
    pub fn resolve(rate_override: Option<Decimal>) -> Self {
        Self {
            commission_rate: rate_override.unwrap_or(DEFAULT_COMMISSION_RATE),
        }
    }

    /// Split a gross amount into platform fee and net payout
    pub fn breakdown(&self, amount: Decimal) -> FeeBreakdown {
        let platform_fee = round_cents(amount * self.commission_rate);
        FeeBreakdown {
            amount,
            platform_fee,
            net_amount: amount - platform_fee,
            commission_rate: self.commission_rate,
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

/// The fee split for one gross amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Gross amount the split was computed from
    pub amount: Decimal,
    /// Platform share
    pub platform_fee: Decimal,
    /// Remainder owed to the influencer
    pub net_amount: Decimal,
    /// Rate the split was computed with
    pub commission_rate: Decimal,
}

impl FeeBreakdown {
    /// The split always reconciles: fee + net == amount
    pub fn reconciles(&self) -> bool {
        self.platform_fee + self.net_amount == self.amount
    }
}

/// Split `amount` with the given rate, defaulting to the platform rate
pub fn calculate_fees(amount: Decimal, commission_rate: Option<Decimal>) -> FeeBreakdown {
    FeeSchedule::resolve(commission_rate).breakdown(amount)
}
