//! Escrow types
//!
//! An escrow account holds brand funds in trust against one collaboration.
//! Held funds only ever leave through a release to the influencer or a
//! refund to the brand, and `held_amount + released_amount` never exceeds
//! `total_amount`.

use crate::{
    BrandId, CollaborationId, Currency, EscrowId, EscrowReleaseId, InfluencerId, MilestoneId,
    UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Funding state of an escrow account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Created but not yet funded
    Pending,
    /// Fully funded, nothing released yet
    Funded,
    /// Some funds released, some still held
    PartiallyReleased,
    /// Everything released
    FullyReleased,
    /// Remaining held funds returned to the brand
    Refunded,
}

impl EscrowStatus {
    /// Whether funds can currently be released
    pub fn is_releasable(&self) -> bool {
        matches!(self, Self::Funded | Self::PartiallyReleased)
    }
}

/// Brand funds held in trust for one collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowAccount {
    pub id: EscrowId,
    pub collaboration_id: CollaborationId,
    pub brand_id: BrandId,
    pub influencer_id: InfluencerId,
    /// User owning the brand wallet that funds this escrow
    pub brand_user_id: UserId,
    /// User owning the influencer wallet that receives releases
    pub influencer_user_id: UserId,
    /// Gross amount the account was created for
    pub total_amount: Decimal,
    /// Gross funds currently held
    pub held_amount: Decimal,
    /// Gross funds already released
    pub released_amount: Decimal,
    /// Platform share of the total, computed once at creation
    pub platform_fee: Decimal,
    /// Commission rate carried over from the collaboration
    pub commission_rate: Decimal,
    pub currency: Currency,
    pub status: EscrowStatus,
    pub funded_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscrowAccount {
    /// Conservation check: held plus released never exceeds total
    pub fn conservation_holds(&self) -> bool {
        self.held_amount >= Decimal::ZERO
            && self.released_amount >= Decimal::ZERO
            && self.held_amount + self.released_amount <= self.total_amount
    }
}

/// Append-only record of one partial or full release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowRelease {
    pub id: EscrowReleaseId,
    pub escrow_id: EscrowId,
    pub milestone_id: Option<MilestoneId>,
    /// Gross amount moved out of held funds
    pub amount: Decimal,
    /// Net amount credited to the influencer
    pub net_amount: Decimal,
    pub reason: String,
    pub released_by: UserId,
    pub released_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(held: Decimal, released: Decimal, total: Decimal) -> EscrowAccount {
        EscrowAccount {
            id: EscrowId::new(),
            collaboration_id: CollaborationId::new(),
            brand_id: BrandId::new(),
            influencer_id: InfluencerId::new(),
            brand_user_id: UserId::new(),
            influencer_user_id: UserId::new(),
            total_amount: total,
            held_amount: held,
            released_amount: released,
            platform_fee: dec!(0),
            commission_rate: dec!(0.10),
            currency: Currency::Usd,
            status: EscrowStatus::Funded,
            funded_at: None,
            released_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_releasable_states() {
        assert!(EscrowStatus::Funded.is_releasable());
        assert!(EscrowStatus::PartiallyReleased.is_releasable());
        assert!(!EscrowStatus::Pending.is_releasable());
        assert!(!EscrowStatus::FullyReleased.is_releasable());
        assert!(!EscrowStatus::Refunded.is_releasable());
    }

    #[test]
    fn test_conservation() {
        assert!(account(dec!(500), dec!(500), dec!(1000)).conservation_holds());
        assert!(account(dec!(0), dec!(1000), dec!(1000)).conservation_holds());
        assert!(!account(dec!(600), dec!(500), dec!(1000)).conservation_holds());
        assert!(!account(dec!(-1), dec!(0), dec!(1000)).conservation_holds());
    }
}
