//! Wallet, transaction and payout-method types
//!
//! A wallet is one per (user, type) pair and is only ever mutated through
//! operations that append a `WalletTransaction`. The transaction log is the
//! source of truth from which `balance` is re-derivable.

use crate::{Currency, PayoutMethodId, UserId, WalletId, WalletTransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the platform a wallet serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletType {
    BrandWallet,
    InfluencerWallet,
}

/// A user's funds on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub wallet_type: WalletType,
    /// Available funds; never negative
    pub balance: Decimal,
    /// Funds earmarked but not yet available
    pub pending_balance: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Movement category for a wallet transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletTransactionType {
    Deposit,
    Withdrawal,
    EscrowHold,
    EscrowRelease,
    PlatformFee,
    Payout,
    Refund,
}

/// Append-only ledger row for one wallet movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: WalletTransactionId,
    pub wallet_id: WalletId,
    pub tx_type: WalletTransactionType,
    /// Signed movement: positive credits, negative debits
    pub amount: Decimal,
    /// Balance snapshot after this movement applied
    pub balance_after: Decimal,
    pub description: String,
    /// Correlates the movement with an escrow, milestone or payout
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Read-model for a user's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub available: Decimal,
    pub pending: Decimal,
    pub currency: Currency,
}

impl WalletBalance {
    /// Zero balance in the platform default currency
    pub fn empty() -> Self {
        Self {
            available: Decimal::ZERO,
            pending: Decimal::ZERO,
            currency: Currency::default(),
        }
    }
}

/// Destination details for a payout method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutDestination {
    Bank {
        bank_name: String,
        account_holder: String,
        /// Last four digits only; full numbers never enter the engine
        account_last4: String,
    },
    Paypal {
        email: String,
    },
}

/// A withdrawal destination owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutMethod {
    pub id: PayoutMethodId,
    pub user_id: UserId,
    pub destination: PayoutDestination,
    /// At most one default per user
    pub is_default: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}
