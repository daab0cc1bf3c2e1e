//! CollabPay Escrow - Brand funds held in trust per collaboration
//!
//! An escrow account is funded by debiting the brand wallet for the gross
//! agreed amount and releases funds to the influencer net of the platform
//! fee share. Every release appends an immutable `EscrowRelease` row.
//!
//! # Invariants
//!
//! 1. `held_amount + released_amount <= total_amount` at all times
//! 2. `held_amount` decreases only through release or refund
//! 3. The fallible step runs first: funding debits the wallet before the
//!    escrow mutates, releasing validates before the wallet credits, so no
//!    partial state is ever observable

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::info;

use collabpay_fees::FeeSchedule;
use collabpay_ledger::WalletService;
use collabpay_types::{
    BrandId, CollabPayError, CollaborationId, Currency, EscrowAccount, EscrowId, EscrowRelease,
    EscrowReleaseId, EscrowStatus, InfluencerId, MilestoneId, Result, UserId,
    WalletTransactionType, WalletType,
};

/// Parameters for creating an escrow account
#[derive(Debug, Clone)]
pub struct CreateEscrowParams {
    pub collaboration_id: CollaborationId,
    pub brand_id: BrandId,
    pub influencer_id: InfluencerId,
    pub brand_user_id: UserId,
    pub influencer_user_id: UserId,
    /// Gross amount to hold
    pub amount: Decimal,
    /// Commission rate resolved by the collaboration
    pub commission_rate: Decimal,
    pub currency: Currency,
}

/// Escrow account store coupled to the wallet ledger
#[derive(Clone)]
pub struct EscrowService {
    wallets: WalletService,
    escrows: Arc<RwLock<HashMap<EscrowId, EscrowAccount>>>,
    /// All release records, append-only
    releases: Arc<RwLock<Vec<EscrowRelease>>>,
}

impl EscrowService {
    pub fn new(wallets: WalletService) -> Self {
        Self {
            wallets,
            escrows: Arc::new(RwLock::new(HashMap::new())),
            releases: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create an unfunded escrow account for a collaboration
    ///
    /// The platform fee is computed from the collaboration's own commission
    /// rate so it can never diverge from the fee stored on the collaboration.
    pub async fn create(&self, params: CreateEscrowParams) -> Result<EscrowAccount> {
        if params.amount <= Decimal::ZERO {
            return Err(CollabPayError::invalid_state(
                "Escrow amount must be positive",
            ));
        }

        let fees = FeeSchedule::new(params.commission_rate).breakdown(params.amount);
        let now = Utc::now();
        let account = EscrowAccount {
            id: EscrowId::new(),
            collaboration_id: params.collaboration_id,
            brand_id: params.brand_id,
            influencer_id: params.influencer_id,
            brand_user_id: params.brand_user_id,
            influencer_user_id: params.influencer_user_id,
            total_amount: params.amount,
            held_amount: Decimal::ZERO,
            released_amount: Decimal::ZERO,
            platform_fee: fees.platform_fee,
            commission_rate: params.commission_rate,
            currency: params.currency,
            status: EscrowStatus::Pending,
            funded_at: None,
            released_at: None,
            created_at: now,
            updated_at: now,
        };

        self.escrows.write().await.insert(account.id, account.clone());
        info!(escrow = %account.id, collaboration = %account.collaboration_id, amount = %account.total_amount, "escrow account created");
        Ok(account)
    }

    /// Fund the escrow by debiting the brand wallet for the gross amount
    pub async fn fund(&self, escrow_id: EscrowId, acting_user: UserId) -> Result<EscrowAccount> {
        let mut escrows = self.escrows.write().await;

        let escrow = escrows
            .get_mut(&escrow_id)
            .ok_or_else(|| CollabPayError::EscrowNotFound {
                id: escrow_id.to_string(),
            })?;

        if escrow.status != EscrowStatus::Pending {
            return Err(CollabPayError::invalid_state(format!(
                "Escrow must be PENDING to fund, currently {:?}",
                escrow.status
            )));
        }

        if self
            .wallets
            .get(escrow.brand_user_id, WalletType::BrandWallet)
            .await
            .is_none()
        {
            return Err(CollabPayError::WalletNotFound {
                user_id: escrow.brand_user_id.to_string(),
            });
        }

        // Debit first: it fails cleanly on insufficient balance and the
        // escrow stays PENDING.
        self.wallets
            .debit(
                escrow.brand_user_id,
                WalletType::BrandWallet,
                WalletTransactionType::EscrowHold,
                escrow.total_amount,
                format!("Escrow hold for collaboration {}", escrow.collaboration_id),
                Some(escrow.id.to_string()),
            )
            .await?;

        escrow.held_amount = escrow.total_amount;
        escrow.status = EscrowStatus::Funded;
        escrow.funded_at = Some(Utc::now());
        escrow.updated_at = Utc::now();
        debug_assert!(escrow.conservation_holds());

        info!(escrow = %escrow.id, amount = %escrow.total_amount, actor = %acting_user, "escrow funded");
        Ok(escrow.clone())
    }

    /// Release a gross amount from held funds to the influencer
    ///
    /// The influencer receives the amount net of the fee share at the
    /// escrow's commission rate; the fee share and the gross movement are
    /// both recorded on the brand-side statement.
    pub async fn release(
        &self,
        escrow_id: EscrowId,
        released_by: UserId,
        gross_amount: Decimal,
        milestone_id: Option<MilestoneId>,
        reason: impl Into<String>,
    ) -> Result<(EscrowAccount, EscrowRelease)> {
        let reason = reason.into();
        let mut escrows = self.escrows.write().await;
        let mut releases = self.releases.write().await;

        let escrow = escrows
            .get_mut(&escrow_id)
            .ok_or_else(|| CollabPayError::EscrowNotFound {
                id: escrow_id.to_string(),
            })?;

        if !escrow.status.is_releasable() {
            return Err(CollabPayError::EscrowNotReleasable {
                status: escrow.status,
            });
        }

        if gross_amount <= Decimal::ZERO {
            return Err(CollabPayError::invalid_state(
                "Release amount must be positive",
            ));
        }

        if gross_amount > escrow.held_amount {
            return Err(CollabPayError::ExceedsHeld {
                requested: gross_amount,
                held: escrow.held_amount,
            });
        }

        let fees = FeeSchedule::new(escrow.commission_rate).breakdown(gross_amount);

        // All checks passed; the remaining wallet effects cannot fail for
        // business reasons, so the escrow mutation is safe to apply.
        escrow.held_amount -= gross_amount;
        escrow.released_amount += gross_amount;
        escrow.status = if escrow.held_amount.is_zero() {
            EscrowStatus::FullyReleased
        } else {
            EscrowStatus::PartiallyReleased
        };
        escrow.released_at = Some(Utc::now());
        escrow.updated_at = Utc::now();
        debug_assert!(escrow.conservation_holds());

        self.wallets
            .get_or_create(escrow.influencer_user_id, WalletType::InfluencerWallet)
            .await;
        if fees.net_amount > Decimal::ZERO {
            self.wallets
                .credit(
                    escrow.influencer_user_id,
                    WalletType::InfluencerWallet,
                    WalletTransactionType::Payout,
                    fees.net_amount,
                    reason.clone(),
                    Some(escrow.id.to_string()),
                )
                .await?;
        }

        self.wallets
            .record_event(
                escrow.brand_user_id,
                WalletType::BrandWallet,
                WalletTransactionType::EscrowRelease,
                format!("Escrow release of {} {}", gross_amount, escrow.currency),
                Some(escrow.id.to_string()),
            )
            .await?;
        self.wallets
            .record_event(
                escrow.brand_user_id,
                WalletType::BrandWallet,
                WalletTransactionType::PlatformFee,
                format!(
                    "Platform fee of {} {} retained on release",
                    fees.platform_fee, escrow.currency
                ),
                Some(escrow.id.to_string()),
            )
            .await?;

        let release = EscrowRelease {
            id: EscrowReleaseId::new(),
            escrow_id,
            milestone_id,
            amount: gross_amount,
            net_amount: fees.net_amount,
            reason,
            released_by,
            released_at: Utc::now(),
        };
        releases.push(release.clone());

        info!(
            escrow = %escrow.id,
            gross = %gross_amount,
            net = %fees.net_amount,
            held = %escrow.held_amount,
            "escrow released"
        );
        Ok((escrow.clone(), release))
    }

    /// Return all remaining held funds to the brand wallet
    pub async fn refund(&self, escrow_id: EscrowId, reason: impl Into<String>) -> Result<EscrowAccount> {
        let reason = reason.into();
        let mut escrows = self.escrows.write().await;

        let escrow = escrows
            .get_mut(&escrow_id)
            .ok_or_else(|| CollabPayError::EscrowNotFound {
                id: escrow_id.to_string(),
            })?;

        if escrow.held_amount.is_zero() {
            return Err(CollabPayError::NothingToRefund);
        }

        let refund_amount = escrow.held_amount;
        escrow.held_amount = Decimal::ZERO;
        escrow.status = EscrowStatus::Refunded;
        escrow.updated_at = Utc::now();
        debug_assert!(escrow.conservation_holds());

        self.wallets
            .credit(
                escrow.brand_user_id,
                WalletType::BrandWallet,
                WalletTransactionType::Refund,
                refund_amount,
                reason,
                Some(escrow.id.to_string()),
            )
            .await?;

        info!(escrow = %escrow.id, amount = %refund_amount, "escrow refunded");
        Ok(escrow.clone())
    }

    /// Read an escrow account
    pub async fn get(&self, escrow_id: EscrowId) -> Result<EscrowAccount> {
        self.escrows
            .read()
            .await
            .get(&escrow_id)
            .cloned()
            .ok_or_else(|| CollabPayError::EscrowNotFound {
                id: escrow_id.to_string(),
            })
    }

    /// Read the escrow account for a collaboration, if one exists
    pub async fn get_by_collaboration(
        &self,
        collaboration_id: CollaborationId,
    ) -> Option<EscrowAccount> {
        self.escrows
            .read()
            .await
            .values()
            .find(|e| e.collaboration_id == collaboration_id)
            .cloned()
    }

    /// All release records for an escrow, in release order
    pub async fn releases(&self, escrow_id: EscrowId) -> Vec<EscrowRelease> {
        self.releases
            .read()
            .await
            .iter()
            .filter(|r| r.escrow_id == escrow_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct Fixture {
        wallets: WalletService,
        escrow: EscrowService,
        brand_user: UserId,
        influencer_user: UserId,
    }

    async fn fixture(brand_balance: Decimal) -> (Fixture, EscrowAccount) {
        let wallets = WalletService::new();
        let escrow = EscrowService::new(wallets.clone());
        let brand_user = UserId::new();
        let influencer_user = UserId::new();

        if brand_balance > Decimal::ZERO {
            wallets
                .deposit(
                    brand_user,
                    WalletType::BrandWallet,
                    brand_balance,
                    "Funding deposit",
                )
                .await
                .unwrap();
        }

        let account = escrow
            .create(CreateEscrowParams {
                collaboration_id: CollaborationId::new(),
                brand_id: BrandId::new(),
                influencer_id: InfluencerId::new(),
                brand_user_id: brand_user,
                influencer_user_id: influencer_user,
                amount: dec!(5000),
                commission_rate: dec!(0.10),
                currency: Currency::Usd,
            })
            .await
            .unwrap();

        (
            Fixture {
                wallets,
                escrow,
                brand_user,
                influencer_user,
            },
            account,
        )
    }

    #[tokio::test]
    async fn test_create_computes_fee_and_starts_pending() {
        let (_fx, account) = fixture(dec!(10000)).await;
        assert_eq!(account.status, EscrowStatus::Pending);
        assert_eq!(account.held_amount, dec!(0));
        assert_eq!(account.platform_fee, dec!(500.00));
    }

    #[tokio::test]
    async fn test_fund_debits_brand_and_holds() {
        let (fx, account) = fixture(dec!(10000)).await;

        let funded = fx.escrow.fund(account.id, fx.brand_user).await.unwrap();
        assert_eq!(funded.status, EscrowStatus::Funded);
        assert_eq!(funded.held_amount, dec!(5000));
        assert!(funded.funded_at.is_some());

        assert_eq!(fx.wallets.balance(fx.brand_user).await.available, dec!(5000));
    }

    #[tokio::test]
    async fn test_fund_insufficient_balance_leaves_escrow_pending() {
        let (fx, account) = fixture(dec!(1000)).await;

        let err = fx.escrow.fund(account.id, fx.brand_user).await.unwrap_err();
        assert!(matches!(err, CollabPayError::InsufficientBalance { .. }));

        let account = fx.escrow.get(account.id).await.unwrap();
        assert_eq!(account.status, EscrowStatus::Pending);
        assert_eq!(account.held_amount, dec!(0));
        assert_eq!(fx.wallets.balance(fx.brand_user).await.available, dec!(1000));
    }

    #[tokio::test]
    async fn test_fund_requires_brand_wallet() {
        let (fx, account) = fixture(dec!(0)).await;

        let err = fx.escrow.fund(account.id, fx.brand_user).await.unwrap_err();
        assert!(matches!(err, CollabPayError::WalletNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fund_twice_is_invalid_state() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();

        let err = fx.escrow.fund(account.id, fx.brand_user).await.unwrap_err();
        assert!(matches!(err, CollabPayError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_partial_release_credits_net() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();

        let (account, release) = fx
            .escrow
            .release(account.id, fx.brand_user, dec!(2000), None, "First tranche")
            .await
            .unwrap();

        assert_eq!(account.status, EscrowStatus::PartiallyReleased);
        assert_eq!(account.held_amount, dec!(3000));
        assert_eq!(account.released_amount, dec!(2000));
        assert_eq!(release.amount, dec!(2000));
        assert_eq!(release.net_amount, dec!(1800.00));

        let influencer = fx.wallets.balance(fx.influencer_user).await;
        assert_eq!(influencer.available, dec!(1800.00));
    }

    #[tokio::test]
    async fn test_full_release_transitions_to_fully_released() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();

        let (account, _) = fx
            .escrow
            .release(account.id, fx.brand_user, dec!(5000), None, "Full release")
            .await
            .unwrap();

        assert_eq!(account.status, EscrowStatus::FullyReleased);
        assert_eq!(account.held_amount, dec!(0));
        assert_eq!(account.released_amount, dec!(5000));
        assert!(account.conservation_holds());
    }

    #[tokio::test]
    async fn test_release_exceeding_held_fails() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();

        let err = fx
            .escrow
            .release(account.id, fx.brand_user, dec!(6000), None, "Too much")
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::ExceedsHeld { .. }));

        // Nothing moved
        let account = fx.escrow.get(account.id).await.unwrap();
        assert_eq!(account.held_amount, dec!(5000));
        assert_eq!(fx.wallets.balance(fx.influencer_user).await.available, dec!(0));
    }

    #[tokio::test]
    async fn test_release_from_pending_fails() {
        let (fx, account) = fixture(dec!(10000)).await;

        let err = fx
            .escrow
            .release(account.id, fx.brand_user, dec!(1000), None, "Early")
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::EscrowNotReleasable { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_releases_cannot_double_spend() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();

        let a = {
            let escrow = fx.escrow.clone();
            let user = fx.brand_user;
            let id = account.id;
            tokio::spawn(async move { escrow.release(id, user, dec!(4000), None, "A").await })
        };
        let b = {
            let escrow = fx.escrow.clone();
            let user = fx.brand_user;
            let id = account.id;
            tokio::spawn(async move { escrow.release(id, user, dec!(4000), None, "B").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "second release must observe the first");

        let account = fx.escrow.get(account.id).await.unwrap();
        assert!(account.conservation_holds());
        assert_eq!(account.held_amount, dec!(1000));
    }

    #[tokio::test]
    async fn test_refund_returns_remaining_held() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();
        fx.escrow
            .release(account.id, fx.brand_user, dec!(2000), None, "Tranche")
            .await
            .unwrap();

        let account = fx
            .escrow
            .refund(account.id, "Collaboration cancelled")
            .await
            .unwrap();
        assert_eq!(account.status, EscrowStatus::Refunded);
        assert_eq!(account.held_amount, dec!(0));

        // 10000 - 5000 escrowed + 3000 refunded
        assert_eq!(fx.wallets.balance(fx.brand_user).await.available, dec!(8000));
    }

    #[tokio::test]
    async fn test_refund_with_nothing_held_fails() {
        let (fx, account) = fixture(dec!(10000)).await;

        let err = fx.escrow.refund(account.id, "Nothing yet").await.unwrap_err();
        assert!(matches!(err, CollabPayError::NothingToRefund));
    }

    #[tokio::test]
    async fn test_release_records_are_append_only_and_tagged() {
        let (fx, account) = fixture(dec!(10000)).await;
        fx.escrow.fund(account.id, fx.brand_user).await.unwrap();

        let milestone = MilestoneId::new();
        fx.escrow
            .release(account.id, fx.brand_user, dec!(2500), Some(milestone), "M1")
            .await
            .unwrap();
        fx.escrow
            .release(account.id, fx.brand_user, dec!(2500), None, "Remainder")
            .await
            .unwrap();

        let releases = fx.escrow.releases(account.id).await;
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].milestone_id, Some(milestone));
        assert_eq!(releases[1].milestone_id, None);
    }
}
