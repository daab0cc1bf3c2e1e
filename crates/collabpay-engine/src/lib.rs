//! CollabPay Engine - The orchestrator facade
//!
//! Wires every service together behind one handle and owns the operations
//! that touch more than one aggregate in a single logical step:
//!
//! - `setup_escrow` creates the escrow account from the collaboration's own
//!   stored amounts and commission rate
//! - `release_escrow` resolves the release target (milestone or explicit
//!   amount) and coordinates the milestone `Paid` transition with the
//!   escrow release
//! - `cancel_with_refund` cancels the collaboration and returns any
//!   remaining held funds to the brand
//!
//! Presentation layers call these operations and render their results; the
//! engine itself is synchronous per call and has no background processing.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use collabpay_contracts::ContractService;
use collabpay_deliverables::{DeliverableService, MilestoneService};
use collabpay_escrow::{CreateEscrowParams, EscrowService};
use collabpay_invoicing::InvoiceService;
use collabpay_ledger::WalletService;
use collabpay_lifecycle::CollaborationService;
use collabpay_types::{
    Actor, CollabAction, CollabPayError, Collaboration, CollaborationId, EscrowAccount,
    EscrowRelease, Milestone, MilestoneId, Result, UserId,
};

/// Target of an escrow release: a milestone, an explicit amount, or both
#[derive(Debug, Clone, Default)]
pub struct ReleaseRequest {
    pub milestone_id: Option<MilestoneId>,
    /// Gross amount; resolved from the milestone when absent
    pub amount: Option<Decimal>,
    pub reason: String,
}

/// One handle over the whole engine
#[derive(Clone)]
pub struct CollabEngine {
    wallets: WalletService,
    escrow: EscrowService,
    collaborations: CollaborationService,
    contracts: ContractService,
    milestones: MilestoneService,
    deliverables: DeliverableService,
    invoices: InvoiceService,
}

impl CollabEngine {
    /// Construct the engine with all services wired, including the contract
    /// gate behind `Sign` transitions
    pub async fn new() -> Self {
        let wallets = WalletService::new();
        let escrow = EscrowService::new(wallets.clone());
        let collaborations = CollaborationService::new();
        let contracts = ContractService::new(collaborations.clone());
        collaborations
            .set_contract_gate(Arc::new(contracts.clone()))
            .await;
        let milestones = MilestoneService::new(collaborations.clone());
        let deliverables = DeliverableService::new(collaborations.clone());
        let invoices = InvoiceService::new();

        Self {
            wallets,
            escrow,
            collaborations,
            contracts,
            milestones,
            deliverables,
            invoices,
        }
    }

    pub fn wallets(&self) -> &WalletService {
        &self.wallets
    }

    pub fn escrow(&self) -> &EscrowService {
        &self.escrow
    }

    pub fn collaborations(&self) -> &CollaborationService {
        &self.collaborations
    }

    pub fn contracts(&self) -> &ContractService {
        &self.contracts
    }

    pub fn milestones(&self) -> &MilestoneService {
        &self.milestones
    }

    pub fn deliverables(&self) -> &DeliverableService {
        &self.deliverables
    }

    pub fn invoices(&self) -> &InvoiceService {
        &self.invoices
    }

    // ========================================================================
    // Cross-aggregate operations
    // ========================================================================

    /// Create the escrow account for a collaboration from its own stored
    /// amounts and commission rate
    pub async fn setup_escrow(
        &self,
        collaboration_id: CollaborationId,
        brand_user_id: UserId,
        influencer_user_id: UserId,
    ) -> Result<EscrowAccount> {
        let collaboration = self.collaborations.get(collaboration_id).await?;

        if self
            .escrow
            .get_by_collaboration(collaboration_id)
            .await
            .is_some()
        {
            return Err(CollabPayError::invalid_state(
                "Escrow account already exists for this collaboration",
            ));
        }

        self.escrow
            .create(CreateEscrowParams {
                collaboration_id,
                brand_id: collaboration.brand_id,
                influencer_id: collaboration.influencer_id,
                brand_user_id,
                influencer_user_id,
                amount: collaboration.agreed_amount,
                commission_rate: collaboration.commission_rate,
                currency: collaboration.currency,
            })
            .await
    }

    /// Release escrow funds against a milestone, an explicit amount, or both
    ///
    /// When a milestone is given, its gross amount is the release amount
    /// unless overridden, and the milestone is marked `Paid` as part of the
    /// same logical step.
    pub async fn release_escrow(
        &self,
        collaboration_id: CollaborationId,
        actor: Actor,
        request: ReleaseRequest,
    ) -> Result<(EscrowAccount, EscrowRelease)> {
        if request.milestone_id.is_none() && request.amount.is_none() {
            return Err(CollabPayError::MissingReleaseTarget);
        }

        let escrow = self
            .escrow
            .get_by_collaboration(collaboration_id)
            .await
            .ok_or_else(|| CollabPayError::EscrowNotFound {
                id: collaboration_id.to_string(),
            })?;

        // Claim the milestone first: the claim is atomic, so concurrent
        // payment attempts against the same milestone cannot both pass. A
        // failed release below reverts the claim.
        let claimed = match request.milestone_id {
            Some(id) => Some(self.milestones.claim_payment(id).await?),
            None => None,
        };

        let gross = match (request.amount, &claimed) {
            (Some(amount), _) => amount,
            (None, Some((milestone, _))) => milestone.amount,
            (None, None) => unreachable!("target checked above"),
        };

        let released = self
            .escrow
            .release(
                escrow.id,
                actor.user_id,
                gross,
                request.milestone_id,
                request.reason,
            )
            .await;

        match released {
            Ok((escrow, release)) => Ok((escrow, release)),
            Err(err) => {
                if let Some((milestone, previous)) = claimed {
                    self.milestones
                        .restore_status(milestone.id, previous)
                        .await?;
                }
                Err(err)
            }
        }
    }

    /// Release one milestone's gross amount and mark it paid
    pub async fn release_milestone(
        &self,
        milestone_id: MilestoneId,
        actor: Actor,
        reason: impl Into<String>,
    ) -> Result<(Milestone, EscrowAccount, EscrowRelease)> {
        let milestone = self.milestones.get(milestone_id).await?;

        let (escrow, release) = self
            .release_escrow(
                milestone.collaboration_id,
                actor,
                ReleaseRequest {
                    milestone_id: Some(milestone_id),
                    amount: None,
                    reason: reason.into(),
                },
            )
            .await?;

        let milestone = self.milestones.get(milestone_id).await?;
        info!(
            milestone = %milestone_id,
            gross = %release.amount,
            net = %release.net_amount,
            "milestone released"
        );
        Ok((milestone, escrow, release))
    }

    /// Cancel a collaboration and refund any remaining held escrow funds to
    /// the brand in the same logical step
    pub async fn cancel_with_refund(
        &self,
        collaboration_id: CollaborationId,
        actor: Actor,
        reason: impl Into<String>,
    ) -> Result<(Collaboration, Option<EscrowAccount>)> {
        let reason = reason.into();

        // The transition is the fallible step: it validates the current
        // status and the caller's role.
        let collaboration = self
            .collaborations
            .transition(
                collaboration_id,
                actor,
                CollabAction::Cancel,
                Some(reason.clone()),
            )
            .await?;

        let refunded = match self.escrow.get_by_collaboration(collaboration_id).await {
            Some(escrow) if !escrow.held_amount.is_zero() => {
                Some(self.escrow.refund(escrow.id, reason).await?)
            }
            _ => None,
        };

        Ok((collaboration, refunded))
    }
}
