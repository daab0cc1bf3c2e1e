//! Error types for CollabPay
//!
//! Every caller-facing failure carries a stable named kind and a
//! human-readable message. Business-rule violations are never retriable;
//! only `Internal` represents an infrastructure fault.

use crate::{ActorRole, CollabAction, CollaborationStatus, EscrowStatus, PartyRole};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for CollabPay operations
pub type Result<T> = std::result::Result<T, CollabPayError>;

/// CollabPay error taxonomy
#[derive(Debug, Clone, Error)]
pub enum CollabPayError {
    // ========================================================================
    // Missing aggregates
    // ========================================================================

    /// Collaboration does not exist
    #[error("Collaboration {id} not found")]
    CollaborationNotFound { id: String },

    /// No contract has been generated for the collaboration
    #[error("Contract not found for collaboration {collaboration_id}")]
    ContractNotFound { collaboration_id: String },

    /// Contract template does not exist
    #[error("Contract template {id} not found")]
    TemplateNotFound { id: String },

    /// Milestone does not exist
    #[error("Milestone {id} not found")]
    MilestoneNotFound { id: String },

    /// Deliverable does not exist
    #[error("Deliverable {id} not found")]
    DeliverableNotFound { id: String },

    /// Wallet does not exist
    #[error("Wallet not found")]
    WalletNotFound { user_id: String },

    /// Escrow account does not exist
    #[error("Escrow account {id} not found")]
    EscrowNotFound { id: String },

    /// Invoice does not exist
    #[error("Invoice {id} not found")]
    InvoiceNotFound { id: String },

    /// Payout method does not exist or belongs to another user
    #[error("Payout method {id} not found")]
    PayoutMethodNotFound { id: String },

    // ========================================================================
    // Lifecycle violations
    // ========================================================================

    /// Action is not in the transition table for the current status
    #[error("Action {action} is not valid from status {status}")]
    InvalidTransition {
        status: CollaborationStatus,
        action: CollabAction,
    },

    /// Action exists for the status but the caller's role may not invoke it
    #[error("Role {role} is not permitted to perform {action}")]
    RoleNotAllowed {
        role: ActorRole,
        action: CollabAction,
    },

    /// Operation attempted while the aggregate structurally forbids it
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Escrow is not in a releasable state
    #[error("Escrow is not in a releasable state (status: {status:?})")]
    EscrowNotReleasable { status: EscrowStatus },

    // ========================================================================
    // Money violations
    // ========================================================================

    /// Milestone amounts do not sum to the agreed collaboration amount
    #[error("Milestone amounts must sum to the agreed collaboration amount: expected {expected}, got {actual}")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    /// Withdrawal or funding exceeds available balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Release amount exceeds held amount
    #[error("Release amount exceeds held amount: requested {requested}, held {held}")]
    ExceedsHeld { requested: Decimal, held: Decimal },

    /// Neither a milestone nor an explicit amount was given for a release
    #[error("Either milestoneId or amount must be provided")]
    MissingReleaseTarget,

    /// Escrow holds no funds
    #[error("No funds to refund")]
    NothingToRefund,

    // ========================================================================
    // Signature workflow violations
    // ========================================================================

    /// The role has already signed this contract
    #[error("The {role} has already signed this contract")]
    AlreadySigned { role: PartyRole },

    /// Both parties must sign before the collaboration can advance
    #[error("Both parties must sign the contract")]
    ContractNotFullySigned,

    // ========================================================================
    // Payout destination violations
    // ========================================================================

    /// Payout method does not belong to the withdrawing user
    #[error("Payout method does not belong to this user")]
    InvalidPayoutMethod,

    /// Payout method has not passed verification
    #[error("Payout method is not verified")]
    PayoutMethodNotVerified,

    // ========================================================================
    // Infrastructure
    // ========================================================================

    /// Unexpected storage-layer failure
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CollabPayError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid-state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this is an infrastructure fault rather than a business-rule
    /// violation the caller must correct
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CollaborationNotFound { .. } => "COLLABORATION_NOT_FOUND",
            Self::ContractNotFound { .. } => "CONTRACT_NOT_FOUND",
            Self::TemplateNotFound { .. } => "TEMPLATE_NOT_FOUND",
            Self::MilestoneNotFound { .. } => "MILESTONE_NOT_FOUND",
            Self::DeliverableNotFound { .. } => "DELIVERABLE_NOT_FOUND",
            Self::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            Self::EscrowNotFound { .. } => "ESCROW_NOT_FOUND",
            Self::InvoiceNotFound { .. } => "INVOICE_NOT_FOUND",
            Self::PayoutMethodNotFound { .. } => "PAYOUT_METHOD_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::RoleNotAllowed { .. } => "ROLE_NOT_ALLOWED",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::EscrowNotReleasable { .. } => "ESCROW_NOT_RELEASABLE",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::ExceedsHeld { .. } => "EXCEEDS_HELD",
            Self::MissingReleaseTarget => "MISSING_RELEASE_TARGET",
            Self::NothingToRefund => "NOTHING_TO_REFUND",
            Self::AlreadySigned { .. } => "ALREADY_SIGNED",
            Self::ContractNotFullySigned => "CONTRACT_NOT_FULLY_SIGNED",
            Self::InvalidPayoutMethod => "INVALID_PAYOUT_METHOD",
            Self::PayoutMethodNotVerified => "PAYOUT_METHOD_NOT_VERIFIED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
