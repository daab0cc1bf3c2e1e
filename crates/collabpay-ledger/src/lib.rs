//! CollabPay Ledger - Wallets and the append-only movement log
//!
//! The ledger is:
//! - Account-keyed by (user, wallet type)
//! - Append-only (every movement produces a `WalletTransaction` with a
//!   post-operation balance snapshot)
//! - The source of truth: `balance` is re-derivable from the log
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Every movement has a transaction row
//! 3. At most one default payout method per user
//! 4. Mutations are atomic: all locks are taken before any check, so a
//!    conflicting concurrent operation observes the winner's effect and
//!    fails cleanly

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::info;

use collabpay_types::{
    CollabPayError, Currency, PayoutDestination, PayoutMethod, PayoutMethodId, Result, UserId,
    Wallet, WalletBalance, WalletId, WalletTransaction, WalletTransactionId,
    WalletTransactionType, WalletType,
};

/// Wallet and payout-method store
///
/// Thread-safe and designed for concurrent access; every mutating operation
/// takes the write locks for its whole read-check-write span.
#[derive(Clone, Default)]
pub struct WalletService {
    wallets: Arc<RwLock<HashMap<(UserId, WalletType), Wallet>>>,
    /// All transactions, append-only
    transactions: Arc<RwLock<Vec<WalletTransaction>>>,
    payout_methods: Arc<RwLock<HashMap<PayoutMethodId, PayoutMethod>>>,
}

impl WalletService {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Wallets
    // ========================================================================

    /// Idempotent lazy creation: returns the existing wallet or a fresh one
    /// with zero balances
    pub async fn get_or_create(&self, user_id: UserId, wallet_type: WalletType) -> Wallet {
        let mut wallets = self.wallets.write().await;
        wallets
            .entry((user_id, wallet_type))
            .or_insert_with(|| {
                info!(%user_id, ?wallet_type, "creating wallet");
                let now = Utc::now();
                Wallet {
                    id: WalletId::new(),
                    user_id,
                    wallet_type,
                    balance: Decimal::ZERO,
                    pending_balance: Decimal::ZERO,
                    currency: Currency::default(),
                    created_at: now,
                    updated_at: now,
                }
            })
            .clone()
    }

    /// Read a wallet without creating it
    pub async fn get(&self, user_id: UserId, wallet_type: WalletType) -> Option<Wallet> {
        self.wallets
            .read()
            .await
            .get(&(user_id, wallet_type))
            .cloned()
    }

    /// Balance read-model for a user; zero/USD when no wallet exists yet.
    /// Users holding both wallet types see the sum across them.
    pub async fn balance(&self, user_id: UserId) -> WalletBalance {
        let wallets = self.wallets.read().await;
        let owned: Vec<&Wallet> = wallets.values().filter(|w| w.user_id == user_id).collect();
        match owned.as_slice() {
            [] => WalletBalance::empty(),
            [w] => WalletBalance {
                available: w.balance,
                pending: w.pending_balance,
                currency: w.currency,
            },
            many => WalletBalance {
                available: many.iter().map(|w| w.balance).sum(),
                pending: many.iter().map(|w| w.pending_balance).sum(),
                currency: many[0].currency,
            },
        }
    }

    // ========================================================================
    // Movements
    // ========================================================================

    /// Credit a wallet and append the transaction row
    ///
    /// The wallet must already exist; money only enters a wallet that was
    /// explicitly created for the user.
    pub async fn credit(
        &self,
        user_id: UserId,
        wallet_type: WalletType,
        tx_type: WalletTransactionType,
        amount: Decimal,
        description: impl Into<String>,
        reference: Option<String>,
    ) -> Result<WalletTransaction> {
        if amount <= Decimal::ZERO {
            return Err(CollabPayError::invalid_state(
                "Credit amount must be positive",
            ));
        }

        let mut wallets = self.wallets.write().await;
        let mut transactions = self.transactions.write().await;

        let wallet = wallets.get_mut(&(user_id, wallet_type)).ok_or_else(|| {
            CollabPayError::WalletNotFound {
                user_id: user_id.to_string(),
            }
        })?;

        wallet.balance += amount;
        wallet.updated_at = Utc::now();

        let tx = WalletTransaction {
            id: WalletTransactionId::new(),
            wallet_id: wallet.id,
            tx_type,
            amount,
            balance_after: wallet.balance,
            description: description.into(),
            reference,
            occurred_at: Utc::now(),
        };
        transactions.push(tx.clone());

        info!(wallet = %wallet.id, ?tx_type, %amount, balance = %wallet.balance, "wallet credited");
        Ok(tx)
    }

    /// Debit a wallet and append the transaction row
    ///
    /// Fails with `InsufficientBalance` if the debit would take the balance
    /// negative; the wallet is left untouched in that case.
    pub async fn debit(
        &self,
        user_id: UserId,
        wallet_type: WalletType,
        tx_type: WalletTransactionType,
        amount: Decimal,
        description: impl Into<String>,
        reference: Option<String>,
    ) -> Result<WalletTransaction> {
        if amount <= Decimal::ZERO {
            return Err(CollabPayError::invalid_state(
                "Debit amount must be positive",
            ));
        }

        let mut wallets = self.wallets.write().await;
        let mut transactions = self.transactions.write().await;

        let wallet = wallets.get_mut(&(user_id, wallet_type)).ok_or_else(|| {
            CollabPayError::WalletNotFound {
                user_id: user_id.to_string(),
            }
        })?;

        if amount > wallet.balance {
            return Err(CollabPayError::InsufficientBalance {
                requested: amount,
                available: wallet.balance,
            });
        }

        wallet.balance -= amount;
        wallet.updated_at = Utc::now();

        let tx = WalletTransaction {
            id: WalletTransactionId::new(),
            wallet_id: wallet.id,
            tx_type,
            amount: -amount,
            balance_after: wallet.balance,
            description: description.into(),
            reference,
            occurred_at: Utc::now(),
        };
        transactions.push(tx.clone());

        info!(wallet = %wallet.id, ?tx_type, %amount, balance = %wallet.balance, "wallet debited");
        Ok(tx)
    }

    /// Append an informational row that moves no funds
    ///
    /// Used for events that must appear on a wallet's statement without
    /// changing its balance, e.g. the brand-side record of an escrow
    /// release. The zero amount keeps the log replayable.
    pub async fn record_event(
        &self,
        user_id: UserId,
        wallet_type: WalletType,
        tx_type: WalletTransactionType,
        description: impl Into<String>,
        reference: Option<String>,
    ) -> Result<WalletTransaction> {
        let wallets = self.wallets.read().await;
        let mut transactions = self.transactions.write().await;

        let wallet = wallets.get(&(user_id, wallet_type)).ok_or_else(|| {
            CollabPayError::WalletNotFound {
                user_id: user_id.to_string(),
            }
        })?;

        let tx = WalletTransaction {
            id: WalletTransactionId::new(),
            wallet_id: wallet.id,
            tx_type,
            amount: Decimal::ZERO,
            balance_after: wallet.balance,
            description: description.into(),
            reference,
            occurred_at: Utc::now(),
        };
        transactions.push(tx.clone());
        Ok(tx)
    }

    /// Funds entering the platform from outside (the abstract gateway
    /// boundary); creates the wallet if needed
    pub async fn deposit(
        &self,
        user_id: UserId,
        wallet_type: WalletType,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<WalletTransaction> {
        self.get_or_create(user_id, wallet_type).await;
        self.credit(
            user_id,
            wallet_type,
            WalletTransactionType::Deposit,
            amount,
            description,
            None,
        )
        .await
    }

    /// Withdraw available funds to a verified payout method owned by the user
    pub async fn withdraw(
        &self,
        user_id: UserId,
        amount: Decimal,
        payout_method_id: PayoutMethodId,
    ) -> Result<WalletTransaction> {
        let mut wallets = self.wallets.write().await;
        let mut transactions = self.transactions.write().await;
        let payout_methods = self.payout_methods.read().await;

        let wallet = wallets
            .values_mut()
            .find(|w| w.user_id == user_id)
            .ok_or_else(|| CollabPayError::WalletNotFound {
                user_id: user_id.to_string(),
            })?;

        if amount > wallet.balance {
            return Err(CollabPayError::InsufficientBalance {
                requested: amount,
                available: wallet.balance,
            });
        }

        let method = payout_methods
            .get(&payout_method_id)
            .filter(|m| m.user_id == user_id)
            .ok_or(CollabPayError::InvalidPayoutMethod)?;

        if !method.is_verified {
            return Err(CollabPayError::PayoutMethodNotVerified);
        }

        wallet.balance -= amount;
        wallet.updated_at = Utc::now();

        let tx = WalletTransaction {
            id: WalletTransactionId::new(),
            wallet_id: wallet.id,
            tx_type: WalletTransactionType::Withdrawal,
            amount: -amount,
            balance_after: wallet.balance,
            description: format!("Withdrawal to payout method {}", payout_method_id),
            reference: Some(payout_method_id.to_string()),
            occurred_at: Utc::now(),
        };
        transactions.push(tx.clone());

        info!(wallet = %wallet.id, %amount, balance = %wallet.balance, "withdrawal executed");
        Ok(tx)
    }

    /// All transactions for a wallet, newest first
    pub async fn transactions(&self, wallet_id: WalletId) -> Vec<WalletTransaction> {
        let transactions = self.transactions.read().await;
        let mut rows: Vec<WalletTransaction> = transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect();
        rows.reverse();
        rows
    }

    // ========================================================================
    // Payout methods
    // ========================================================================

    /// Register a withdrawal destination; the user's first method becomes
    /// the default automatically. Methods start unverified.
    pub async fn add_payout_method(
        &self,
        user_id: UserId,
        destination: PayoutDestination,
    ) -> PayoutMethod {
        let mut methods = self.payout_methods.write().await;
        let has_existing = methods.values().any(|m| m.user_id == user_id);

        let method = PayoutMethod {
            id: PayoutMethodId::new(),
            user_id,
            destination,
            is_default: !has_existing,
            is_verified: false,
            created_at: Utc::now(),
        };
        methods.insert(method.id, method.clone());

        info!(%user_id, method = %method.id, default = method.is_default, "payout method added");
        method
    }

    /// Mark a method as verified (driven by an external verification flow)
    pub async fn verify_payout_method(
        &self,
        user_id: UserId,
        method_id: PayoutMethodId,
    ) -> Result<PayoutMethod> {
        let mut methods = self.payout_methods.write().await;
        let method = methods
            .get_mut(&method_id)
            .filter(|m| m.user_id == user_id)
            .ok_or_else(|| CollabPayError::PayoutMethodNotFound {
                id: method_id.to_string(),
            })?;
        method.is_verified = true;
        Ok(method.clone())
    }

    /// Unset any existing default for the user, then set the given method
    /// as default; both steps happen under one lock
    pub async fn set_default_payout_method(
        &self,
        user_id: UserId,
        method_id: PayoutMethodId,
    ) -> Result<PayoutMethod> {
        let mut methods = self.payout_methods.write().await;

        if !methods
            .get(&method_id)
            .map(|m| m.user_id == user_id)
            .unwrap_or(false)
        {
            return Err(CollabPayError::PayoutMethodNotFound {
                id: method_id.to_string(),
            });
        }

        for method in methods.values_mut().filter(|m| m.user_id == user_id) {
            method.is_default = method.id == method_id;
        }

        Ok(methods[&method_id].clone())
    }

    /// Delete a method; if it was the default, promote a remaining method
    /// (if any) in the same operation
    pub async fn delete_payout_method(
        &self,
        user_id: UserId,
        method_id: PayoutMethodId,
    ) -> Result<()> {
        let mut methods = self.payout_methods.write().await;

        let removed = methods
            .get(&method_id)
            .filter(|m| m.user_id == user_id)
            .cloned()
            .ok_or_else(|| CollabPayError::PayoutMethodNotFound {
                id: method_id.to_string(),
            })?;
        methods.remove(&method_id);

        if removed.is_default {
            if let Some(next) = methods.values_mut().find(|m| m.user_id == user_id) {
                next.is_default = true;
                info!(%user_id, promoted = %next.id, "default payout method reassigned");
            }
        }

        Ok(())
    }

    /// All payout methods for a user
    pub async fn list_payout_methods(&self, user_id: UserId) -> Vec<PayoutMethod> {
        let methods = self.payout_methods.read().await;
        let mut owned: Vec<PayoutMethod> = methods
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|m| m.created_at);
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bank_destination() -> PayoutDestination {
        PayoutDestination::Bank {
            bank_name: "First National".to_string(),
            account_holder: "Test User".to_string(),
            account_last4: "4321".to_string(),
        }
    }

    async fn verified_method(service: &WalletService, user: UserId) -> PayoutMethod {
        let method = service.add_payout_method(user, bank_destination()).await;
        service.verify_payout_method(user, method.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let service = WalletService::new();
        let user = UserId::new();

        let first = service
            .get_or_create(user, WalletType::InfluencerWallet)
            .await;
        assert_eq!(first.balance, Decimal::ZERO);
        assert_eq!(first.pending_balance, Decimal::ZERO);

        let second = service
            .get_or_create(user, WalletType::InfluencerWallet)
            .await;
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_balance_defaults_to_zero_usd_without_creating() {
        let service = WalletService::new();
        let user = UserId::new();

        let balance = service.balance(user).await;
        assert_eq!(balance.available, Decimal::ZERO);
        assert_eq!(balance.pending, Decimal::ZERO);
        assert_eq!(balance.currency, Currency::Usd);

        // The read must not have created a wallet
        assert!(service.get(user, WalletType::BrandWallet).await.is_none());
        assert!(service
            .get(user, WalletType::InfluencerWallet)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_deposit_and_balance_snapshot() {
        let service = WalletService::new();
        let user = UserId::new();

        let tx = service
            .deposit(user, WalletType::BrandWallet, dec!(1000), "Card deposit")
            .await
            .unwrap();
        assert_eq!(tx.amount, dec!(1000));
        assert_eq!(tx.balance_after, dec!(1000));
        assert_eq!(tx.tx_type, WalletTransactionType::Deposit);

        let balance = service.balance(user).await;
        assert_eq!(balance.available, dec!(1000));
    }

    #[tokio::test]
    async fn test_withdraw_happy_path() {
        let service = WalletService::new();
        let user = UserId::new();
        service
            .deposit(user, WalletType::InfluencerWallet, dec!(500), "Payout")
            .await
            .unwrap();
        let method = verified_method(&service, user).await;

        let tx = service.withdraw(user, dec!(200), method.id).await.unwrap();
        assert_eq!(tx.amount, dec!(-200));
        assert_eq!(tx.balance_after, dec!(300));

        let balance = service.balance(user).await;
        assert_eq!(balance.available, dec!(300));
    }

    #[tokio::test]
    async fn test_withdraw_requires_wallet() {
        let service = WalletService::new();
        let user = UserId::new();
        let method = verified_method(&service, user).await;

        let err = service.withdraw(user, dec!(10), method.id).await.unwrap_err();
        assert!(matches!(err, CollabPayError::WalletNotFound { .. }));
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_balance() {
        let service = WalletService::new();
        let user = UserId::new();
        service
            .deposit(user, WalletType::InfluencerWallet, dec!(100), "Payout")
            .await
            .unwrap();
        let method = verified_method(&service, user).await;

        let err = service.withdraw(user, dec!(101), method.id).await.unwrap_err();
        assert!(matches!(err, CollabPayError::InsufficientBalance { .. }));

        // Balance untouched by the failed attempt
        assert_eq!(service.balance(user).await.available, dec!(100));
    }

    #[tokio::test]
    async fn test_withdraw_rejects_foreign_and_unverified_methods() {
        let service = WalletService::new();
        let user = UserId::new();
        let other = UserId::new();
        service
            .deposit(user, WalletType::InfluencerWallet, dec!(100), "Payout")
            .await
            .unwrap();

        let foreign = verified_method(&service, other).await;
        let err = service.withdraw(user, dec!(50), foreign.id).await.unwrap_err();
        assert!(matches!(err, CollabPayError::InvalidPayoutMethod));

        let unverified = service.add_payout_method(user, bank_destination()).await;
        let err = service
            .withdraw(user, dec!(50), unverified.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::PayoutMethodNotVerified));
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_cannot_overdraw() {
        let service = WalletService::new();
        let user = UserId::new();
        service
            .deposit(user, WalletType::InfluencerWallet, dec!(100), "Payout")
            .await
            .unwrap();
        let method = verified_method(&service, user).await;

        let a = {
            let service = service.clone();
            let id = method.id;
            tokio::spawn(async move { service.withdraw(user, dec!(80), id).await })
        };
        let b = {
            let service = service.clone();
            let id = method.id;
            tokio::spawn(async move { service.withdraw(user, dec!(80), id).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one withdrawal may win");

        assert_eq!(service.balance(user).await.available, dec!(20));
    }

    #[tokio::test]
    async fn test_balance_is_rederivable_from_log() {
        let service = WalletService::new();
        let user = UserId::new();
        let wallet = service
            .get_or_create(user, WalletType::InfluencerWallet)
            .await;

        service
            .deposit(user, WalletType::InfluencerWallet, dec!(300), "d1")
            .await
            .unwrap();
        service
            .deposit(user, WalletType::InfluencerWallet, dec!(200), "d2")
            .await
            .unwrap();
        let method = verified_method(&service, user).await;
        service.withdraw(user, dec!(150), method.id).await.unwrap();

        let rows = service.transactions(wallet.id).await;
        let replayed: Decimal = rows.iter().map(|t| t.amount).sum();
        assert_eq!(replayed, service.balance(user).await.available);

        // Newest first
        assert_eq!(rows[0].tx_type, WalletTransactionType::Withdrawal);
    }

    #[tokio::test]
    async fn test_first_payout_method_is_default() {
        let service = WalletService::new();
        let user = UserId::new();

        let first = service.add_payout_method(user, bank_destination()).await;
        assert!(first.is_default);

        let second = service
            .add_payout_method(
                user,
                PayoutDestination::Paypal {
                    email: "user@example.com".to_string(),
                },
            )
            .await;
        assert!(!second.is_default);
    }

    #[tokio::test]
    async fn test_set_default_moves_the_flag() {
        let service = WalletService::new();
        let user = UserId::new();
        let first = service.add_payout_method(user, bank_destination()).await;
        let second = service.add_payout_method(user, bank_destination()).await;

        service
            .set_default_payout_method(user, second.id)
            .await
            .unwrap();

        let methods = service.list_payout_methods(user).await;
        let defaults: Vec<_> = methods.iter().filter(|m| m.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.id);
        assert!(!methods.iter().any(|m| m.id == first.id && m.is_default));
    }

    #[tokio::test]
    async fn test_delete_default_promotes_survivor() {
        let service = WalletService::new();
        let user = UserId::new();
        let first = service.add_payout_method(user, bank_destination()).await;
        let second = service.add_payout_method(user, bank_destination()).await;

        service.delete_payout_method(user, first.id).await.unwrap();

        let methods = service.list_payout_methods(user).await;
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, second.id);
        assert!(methods[0].is_default);
    }

    #[tokio::test]
    async fn test_delete_non_default_keeps_default() {
        let service = WalletService::new();
        let user = UserId::new();
        let first = service.add_payout_method(user, bank_destination()).await;
        let second = service.add_payout_method(user, bank_destination()).await;

        service.delete_payout_method(user, second.id).await.unwrap();

        let methods = service.list_payout_methods(user).await;
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, first.id);
        assert!(methods[0].is_default);
    }

    #[tokio::test]
    async fn test_delete_foreign_method_fails() {
        let service = WalletService::new();
        let user = UserId::new();
        let other = UserId::new();
        let method = service.add_payout_method(other, bank_destination()).await;

        let err = service
            .delete_payout_method(user, method.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::PayoutMethodNotFound { .. }));
    }
}
