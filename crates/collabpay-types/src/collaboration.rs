//! Collaboration aggregate and lifecycle vocabulary
//!
//! A Collaboration is the aggregate root of the engine. Its status only
//! changes through the state machine in `collabpay-lifecycle`, and every
//! transition appends a write-once history entry.

use crate::{
    ActorRole, BrandId, CampaignId, CollaborationId, Currency, HistoryEntryId, InfluencerId,
    UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a collaboration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollaborationStatus {
    ProposalSent,
    ProposalAccepted,
    Negotiating,
    ContractPending,
    ContractSigned,
    InProduction,
    ContentSubmitted,
    RevisionRequested,
    ContentApproved,
    Published,
    PaymentPending,
    Completed,
    Cancelled,
    Disputed,
}

impl CollaborationStatus {
    /// Terminal states have no outbound transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Wire-format name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalSent => "PROPOSAL_SENT",
            Self::ProposalAccepted => "PROPOSAL_ACCEPTED",
            Self::Negotiating => "NEGOTIATING",
            Self::ContractPending => "CONTRACT_PENDING",
            Self::ContractSigned => "CONTRACT_SIGNED",
            Self::InProduction => "IN_PRODUCTION",
            Self::ContentSubmitted => "CONTENT_SUBMITTED",
            Self::RevisionRequested => "REVISION_REQUESTED",
            Self::ContentApproved => "CONTENT_APPROVED",
            Self::Published => "PUBLISHED",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Disputed => "DISPUTED",
        }
    }
}

impl fmt::Display for CollaborationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Actions a caller can invoke against a collaboration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollabAction {
    Accept,
    Negotiate,
    Reject,
    Cancel,
    GenerateContract,
    Sign,
    StartProduction,
    SubmitContent,
    ApproveContent,
    RequestRevision,
    Publish,
    RequestPayment,
    Complete,
    Dispute,
    ResolveComplete,
    ResolveCancel,
}

impl CollabAction {
    /// Wire-format name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Negotiate => "NEGOTIATE",
            Self::Reject => "REJECT",
            Self::Cancel => "CANCEL",
            Self::GenerateContract => "GENERATE_CONTRACT",
            Self::Sign => "SIGN",
            Self::StartProduction => "START_PRODUCTION",
            Self::SubmitContent => "SUBMIT_CONTENT",
            Self::ApproveContent => "APPROVE_CONTENT",
            Self::RequestRevision => "REQUEST_REVISION",
            Self::Publish => "PUBLISH",
            Self::RequestPayment => "REQUEST_PAYMENT",
            Self::Complete => "COMPLETE",
            Self::Dispute => "DISPUTE",
            Self::ResolveComplete => "RESOLVE_COMPLETE",
            Self::ResolveCancel => "RESOLVE_CANCEL",
        }
    }
}

impl fmt::Display for CollabAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The collaboration aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: CollaborationId,
    pub campaign_id: CampaignId,
    pub brand_id: BrandId,
    pub influencer_id: InfluencerId,
    pub status: CollaborationStatus,
    /// Gross amount the brand agreed to pay
    pub agreed_amount: Decimal,
    /// Commission rate resolved once at creation, threaded through every
    /// downstream fee computation
    pub commission_rate: Decimal,
    /// Platform share of the agreed amount
    pub platform_fee: Decimal,
    /// Net amount owed to the influencer
    pub influencer_payout: Decimal,
    pub currency: Currency,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub content_due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Collaboration {
    /// Whether the fee split still reconciles with the agreed amount
    pub fn fee_invariant_holds(&self) -> bool {
        crate::money::approx_eq(self.platform_fee + self.influencer_payout, self.agreed_amount)
    }
}

/// Append-only record of a single status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: HistoryEntryId,
    pub collaboration_id: CollaborationId,
    pub from_status: CollaborationStatus,
    pub to_status: CollaborationStatus,
    pub action: CollabAction,
    pub actor_id: UserId,
    pub actor_role: ActorRole,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
