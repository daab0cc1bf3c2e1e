//! CollabPay Lifecycle - The collaboration state machine
//!
//! A collaboration moves through its lifecycle exclusively via `transition`,
//! which validates the action against the transition table and the caller's
//! role, applies the new status, and appends a write-once history row. The
//! `Sign` transition into `ContractSigned` additionally requires the
//! contract to be fully signed, checked through the `ContractGate` seam so
//! the contract store stays in its own crate.

pub mod table;

pub use table::{available_actions, find_rule, transition_rules, TransitionRule};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::info;

use collabpay_fees::FeeSchedule;
use collabpay_types::{
    Actor, BrandId, CampaignId, CollabAction, CollabPayError, Collaboration, CollaborationId,
    CollaborationMessage, CollaborationStatus, Currency, HistoryEntryId, InfluencerId, MessageId,
    Result, StatusHistoryEntry,
};

/// Contract-side check consulted before a `Sign` transition may advance the
/// collaboration to `ContractSigned`
#[async_trait]
pub trait ContractGate: Send + Sync {
    /// Whether both parties have signed the collaboration's contract
    async fn is_fully_signed(&self, collaboration_id: CollaborationId) -> Result<bool>;
}

/// Parameters for creating a collaboration
#[derive(Debug, Clone)]
pub struct CreateCollaborationParams {
    pub campaign_id: CampaignId,
    pub brand_id: BrandId,
    pub influencer_id: InfluencerId,
    pub agreed_amount: Decimal,
    /// Commission rate override; platform default when absent
    pub commission_rate: Option<Decimal>,
    pub currency: Currency,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub content_due_date: Option<DateTime<Utc>>,
}

/// Collaboration store and state machine
#[derive(Clone, Default)]
pub struct CollaborationService {
    collaborations: Arc<RwLock<HashMap<CollaborationId, Collaboration>>>,
    /// Transition log, append-only
    history: Arc<RwLock<Vec<StatusHistoryEntry>>>,
    /// Party message log, append-only
    messages: Arc<RwLock<Vec<CollaborationMessage>>>,
    contract_gate: Arc<RwLock<Option<Arc<dyn ContractGate>>>>,
}

impl CollaborationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the contract gate; required before `Sign` transitions can
    /// succeed
    pub async fn set_contract_gate(&self, gate: Arc<dyn ContractGate>) {
        *self.contract_gate.write().await = Some(gate);
    }

    /// Create a collaboration in `ProposalSent`
    ///
    /// The commission rate is resolved here, once, and stored on the
    /// aggregate; every downstream fee computation reads it back.
    pub async fn create(&self, params: CreateCollaborationParams) -> Result<Collaboration> {
        if params.agreed_amount <= Decimal::ZERO {
            return Err(CollabPayError::invalid_state(
                "Agreed amount must be positive",
            ));
        }
        if let Some(rate) = params.commission_rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(CollabPayError::invalid_state(
                    "Commission rate must be between 0 and 1",
                ));
            }
        }

        let schedule = FeeSchedule::resolve(params.commission_rate);
        let fees = schedule.breakdown(params.agreed_amount);

        let now = Utc::now();
        let collaboration = Collaboration {
            id: CollaborationId::new(),
            campaign_id: params.campaign_id,
            brand_id: params.brand_id,
            influencer_id: params.influencer_id,
            status: CollaborationStatus::ProposalSent,
            agreed_amount: params.agreed_amount,
            commission_rate: schedule.commission_rate,
            platform_fee: fees.platform_fee,
            influencer_payout: fees.net_amount,
            currency: params.currency,
            start_date: params.start_date,
            end_date: params.end_date,
            content_due_date: params.content_due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
        };
        debug_assert!(collaboration.fee_invariant_holds());

        self.collaborations
            .write()
            .await
            .insert(collaboration.id, collaboration.clone());

        info!(
            collaboration = %collaboration.id,
            amount = %collaboration.agreed_amount,
            fee = %collaboration.platform_fee,
            "collaboration proposed"
        );
        Ok(collaboration)
    }

    /// Read a collaboration
    pub async fn get(&self, id: CollaborationId) -> Result<Collaboration> {
        self.collaborations
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CollabPayError::CollaborationNotFound { id: id.to_string() })
    }

    /// Apply an action to a collaboration
    ///
    /// Validates the action against the transition table for the current
    /// status and the caller's role, applies the new status, and appends a
    /// history row. The whole operation runs under one write lock.
    pub async fn transition(
        &self,
        id: CollaborationId,
        actor: Actor,
        action: CollabAction,
        reason: Option<String>,
    ) -> Result<Collaboration> {
        let mut collaborations = self.collaborations.write().await;
        let mut history = self.history.write().await;

        let collaboration = collaborations
            .get_mut(&id)
            .ok_or_else(|| CollabPayError::CollaborationNotFound { id: id.to_string() })?;

        let from_status = collaboration.status;
        let rule = table::find_rule(from_status, action).ok_or(
            CollabPayError::InvalidTransition {
                status: from_status,
                action,
            },
        )?;

        if !table::role_may_invoke(rule, actor.role) {
            return Err(CollabPayError::RoleNotAllowed {
                role: actor.role,
                action,
            });
        }

        // The Sign transition only lands once both parties have signed.
        if action == CollabAction::Sign && rule.next == CollaborationStatus::ContractSigned {
            let gate = self.contract_gate.read().await.clone();
            let fully_signed = match gate {
                Some(gate) => gate.is_fully_signed(id).await?,
                None => false,
            };
            if !fully_signed {
                return Err(CollabPayError::ContractNotFullySigned);
            }
        }

        let now = Utc::now();
        collaboration.status = rule.next;
        collaboration.updated_at = now;
        match rule.next {
            CollaborationStatus::Completed => collaboration.completed_at = Some(now),
            CollaborationStatus::Cancelled => collaboration.cancelled_at = Some(now),
            _ => {}
        }

        history.push(StatusHistoryEntry {
            id: HistoryEntryId::new(),
            collaboration_id: id,
            from_status,
            to_status: rule.next,
            action,
            actor_id: actor.user_id,
            actor_role: actor.role,
            reason,
            occurred_at: now,
        });

        info!(
            collaboration = %id,
            from = %from_status,
            to = %rule.next,
            %action,
            "collaboration transitioned"
        );
        Ok(collaboration.clone())
    }

    /// Full transition history for a collaboration, oldest first
    pub async fn history(&self, id: CollaborationId) -> Vec<StatusHistoryEntry> {
        self.history
            .read()
            .await
            .iter()
            .filter(|h| h.collaboration_id == id)
            .cloned()
            .collect()
    }

    /// Append a message between the collaboration's parties
    pub async fn post_message(
        &self,
        id: CollaborationId,
        actor: Actor,
        body: impl Into<String>,
    ) -> Result<CollaborationMessage> {
        let sender_role = actor.role.party().ok_or_else(|| {
            CollabPayError::invalid_state("Only collaboration parties can post messages")
        })?;

        // Existence check keeps the log scoped to real collaborations.
        self.get(id).await?;

        let message = CollaborationMessage {
            id: MessageId::new(),
            collaboration_id: id,
            sender_id: actor.user_id,
            sender_role,
            body: body.into(),
            sent_at: Utc::now(),
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    /// All messages for a collaboration, oldest first
    pub async fn messages(&self, id: CollaborationId) -> Vec<CollaborationMessage> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.collaboration_id == id)
            .cloned()
            .collect()
    }
}
