//! CollabPay Contracts - Generation and dual-signature workflow
//!
//! A contract is generated once per collaboration and drives the
//! collaboration to `ContractPending` in the same operation. Each party
//! signs at most once; when the second signature lands the contract becomes
//! fully signed and the collaboration is driven to `ContractSigned`
//! immediately.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use collabpay_lifecycle::{CollaborationService, ContractGate};
use collabpay_types::{
    Actor, ActorRole, CollabAction, CollabPayError, Collaboration, CollaborationId, Contract,
    ContractId, ContractSignature, ContractTemplate, ContractTemplateId, PartyRole, Result,
    SignatureRequest, UserId,
};

/// Terms body used when no template or custom terms are supplied
const DEFAULT_TEMPLATE_BODY: &str = "\
COLLABORATION AGREEMENT

Brand {{brand_id}} engages influencer {{influencer_id}} to produce the \
agreed content for campaign {{campaign_id}}.

Total compensation: {{agreed_amount}} {{currency}}, of which the platform \
retains its commission at the agreed rate. Payment is held in escrow and \
released as milestones are approved.

Content is due by {{content_due_date}}. Both parties must sign before \
production begins.";

/// Contract and template store
#[derive(Clone)]
pub struct ContractService {
    collaborations: CollaborationService,
    /// One contract per collaboration
    contracts: Arc<RwLock<HashMap<CollaborationId, Contract>>>,
    templates: Arc<RwLock<HashMap<ContractTemplateId, ContractTemplate>>>,
    default_template: ContractTemplateId,
}

impl ContractService {
    /// Create the service with the default template seeded
    pub fn new(collaborations: CollaborationService) -> Self {
        let default = ContractTemplate {
            id: ContractTemplateId::new(),
            name: "Standard collaboration agreement".to_string(),
            body: DEFAULT_TEMPLATE_BODY.to_string(),
            created_at: Utc::now(),
        };
        let default_template = default.id;
        let mut templates = HashMap::new();
        templates.insert(default.id, default);

        Self {
            collaborations,
            contracts: Arc::new(RwLock::new(HashMap::new())),
            templates: Arc::new(RwLock::new(templates)),
            default_template,
        }
    }

    /// Register an additional terms template
    pub async fn add_template(
        &self,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> ContractTemplate {
        let template = ContractTemplate {
            id: ContractTemplateId::new(),
            name: name.into(),
            body: body.into(),
            created_at: Utc::now(),
        };
        self.templates
            .write()
            .await
            .insert(template.id, template.clone());
        template
    }

    /// Generate the contract for a collaboration and drive it to
    /// `ContractPending` in the same operation
    pub async fn generate(
        &self,
        collaboration_id: CollaborationId,
        actor: Actor,
        template_id: Option<ContractTemplateId>,
        custom_terms: Option<String>,
    ) -> Result<Contract> {
        let collaboration = self.collaborations.get(collaboration_id).await?;

        if self
            .contracts
            .read()
            .await
            .contains_key(&collaboration_id)
        {
            return Err(CollabPayError::invalid_state(
                "Contract has already been generated for this collaboration",
            ));
        }

        let terms = match custom_terms {
            Some(terms) => terms,
            None => {
                let template_id = template_id.unwrap_or(self.default_template);
                let templates = self.templates.read().await;
                let template = templates.get(&template_id).ok_or_else(|| {
                    CollabPayError::TemplateNotFound {
                        id: template_id.to_string(),
                    }
                })?;
                render_terms(&template.body, &collaboration)
            }
        };

        // The transition is the fallible step: it validates the current
        // status and the caller's role. Only after it lands is the contract
        // row created.
        self.collaborations
            .transition(collaboration_id, actor, CollabAction::GenerateContract, None)
            .await?;

        let now = Utc::now();
        let contract = Contract {
            id: ContractId::new(),
            collaboration_id,
            template_id: template_id.or(Some(self.default_template)),
            terms,
            brand_signature: None,
            influencer_signature: None,
            is_fully_signed: false,
            created_at: now,
            updated_at: now,
        };
        self.contracts
            .write()
            .await
            .insert(collaboration_id, contract.clone());

        info!(collaboration = %collaboration_id, contract = %contract.id, "contract generated");
        Ok(contract)
    }

    /// Record one party's signature
    ///
    /// Fails with `AlreadySigned` when that party has signed before. When
    /// the second signature lands, the contract is marked fully signed and
    /// the collaboration is driven to `ContractSigned` immediately.
    pub async fn sign(
        &self,
        collaboration_id: CollaborationId,
        signer_id: UserId,
        role: PartyRole,
        request: SignatureRequest,
    ) -> Result<Contract> {
        // Mutate under the write lock, then release it before driving the
        // lifecycle: the Sign transition consults this store through the
        // contract gate.
        let (contract, became_fully_signed) = {
            let mut contracts = self.contracts.write().await;
            let contract = contracts.get_mut(&collaboration_id).ok_or_else(|| {
                CollabPayError::ContractNotFound {
                    collaboration_id: collaboration_id.to_string(),
                }
            })?;

            if contract.is_signed_by(role) {
                return Err(CollabPayError::AlreadySigned { role });
            }

            let signature = ContractSignature {
                signer_id,
                signature: request.signature,
                ip_address: request.ip_address,
                signed_at: Utc::now(),
            };
            match role {
                PartyRole::Brand => contract.brand_signature = Some(signature),
                PartyRole::Influencer => contract.influencer_signature = Some(signature),
            }
            contract.updated_at = Utc::now();

            let became_fully_signed = contract.both_signed();
            if became_fully_signed {
                contract.is_fully_signed = true;
            }
            (contract.clone(), became_fully_signed)
        };

        info!(
            collaboration = %collaboration_id,
            %role,
            fully_signed = became_fully_signed,
            "contract signed"
        );

        if became_fully_signed {
            let actor_role = match role {
                PartyRole::Brand => ActorRole::Brand,
                PartyRole::Influencer => ActorRole::Influencer,
            };
            self.collaborations
                .transition(
                    collaboration_id,
                    Actor::new(signer_id, actor_role),
                    CollabAction::Sign,
                    None,
                )
                .await?;
        }

        Ok(contract)
    }

    /// Read the contract for a collaboration
    pub async fn get(&self, collaboration_id: CollaborationId) -> Result<Contract> {
        self.contracts
            .read()
            .await
            .get(&collaboration_id)
            .cloned()
            .ok_or_else(|| CollabPayError::ContractNotFound {
                collaboration_id: collaboration_id.to_string(),
            })
    }
}

#[async_trait]
impl ContractGate for ContractService {
    async fn is_fully_signed(&self, collaboration_id: CollaborationId) -> Result<bool> {
        Ok(self
            .contracts
            .read()
            .await
            .get(&collaboration_id)
            .map(|c| c.is_fully_signed)
            .unwrap_or(false))
    }
}

/// Substitute collaboration fields into a template body
fn render_terms(body: &str, collaboration: &Collaboration) -> String {
    let due = collaboration
        .content_due_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "the agreed date".to_string());

    body.replace("{{brand_id}}", &collaboration.brand_id.to_string())
        .replace(
            "{{influencer_id}}",
            &collaboration.influencer_id.to_string(),
        )
        .replace("{{campaign_id}}", &collaboration.campaign_id.to_string())
        .replace(
            "{{agreed_amount}}",
            &collaboration.agreed_amount.to_string(),
        )
        .replace("{{currency}}", collaboration.currency.code())
        .replace("{{content_due_date}}", &due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collabpay_lifecycle::CreateCollaborationParams;
    use collabpay_types::{BrandId, CampaignId, CollaborationStatus, Currency, InfluencerId};
    use rust_decimal_macros::dec;

    struct Fixture {
        collaborations: CollaborationService,
        contracts: ContractService,
        collaboration: Collaboration,
        brand: Actor,
        influencer: Actor,
    }

    async fn fixture() -> Fixture {
        let collaborations = CollaborationService::new();
        let contracts = ContractService::new(collaborations.clone());
        collaborations
            .set_contract_gate(Arc::new(contracts.clone()))
            .await;

        let collaboration = collaborations
            .create(CreateCollaborationParams {
                campaign_id: CampaignId::new(),
                brand_id: BrandId::new(),
                influencer_id: InfluencerId::new(),
                agreed_amount: dec!(5000),
                commission_rate: None,
                currency: Currency::Usd,
                start_date: None,
                end_date: None,
                content_due_date: None,
            })
            .await
            .unwrap();

        let brand = Actor::brand(UserId::new());
        let influencer = Actor::influencer(UserId::new());

        // Proposal accepted so the contract can be generated
        collaborations
            .transition(collaboration.id, influencer, CollabAction::Accept, None)
            .await
            .unwrap();

        Fixture {
            collaborations,
            contracts,
            collaboration,
            brand,
            influencer,
        }
    }

    fn signature() -> SignatureRequest {
        SignatureRequest {
            signature: "signed".to_string(),
            ip_address: Some("203.0.113.7".to_string()),
        }
    }

    #[tokio::test]
    async fn test_generate_renders_terms_and_drives_status() {
        let fx = fixture().await;

        let contract = fx
            .contracts
            .generate(fx.collaboration.id, fx.brand, None, None)
            .await
            .unwrap();

        assert!(contract.terms.contains("5000"));
        assert!(contract.terms.contains("USD"));
        assert!(!contract.is_fully_signed);

        let collab = fx.collaborations.get(fx.collaboration.id).await.unwrap();
        assert_eq!(collab.status, CollaborationStatus::ContractPending);
    }

    #[tokio::test]
    async fn test_generate_with_custom_terms() {
        let fx = fixture().await;

        let contract = fx
            .contracts
            .generate(
                fx.collaboration.id,
                fx.brand,
                None,
                Some("Bespoke terms".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(contract.terms, "Bespoke terms");
    }

    #[tokio::test]
    async fn test_generate_for_missing_collaboration() {
        let fx = fixture().await;

        let err = fx
            .contracts
            .generate(CollaborationId::new(), fx.brand, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::CollaborationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_generate_twice_is_rejected() {
        let fx = fixture().await;
        fx.contracts
            .generate(fx.collaboration.id, fx.brand, None, None)
            .await
            .unwrap();

        let err = fx
            .contracts
            .generate(fx.collaboration.id, fx.brand, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_generate_requires_permitting_status() {
        let collaborations = CollaborationService::new();
        let contracts = ContractService::new(collaborations.clone());
        let collaboration = collaborations
            .create(CreateCollaborationParams {
                campaign_id: CampaignId::new(),
                brand_id: BrandId::new(),
                influencer_id: InfluencerId::new(),
                agreed_amount: dec!(1000),
                commission_rate: None,
                currency: Currency::Usd,
                start_date: None,
                end_date: None,
                content_due_date: None,
            })
            .await
            .unwrap();

        // Still PROPOSAL_SENT: GenerateContract is not in the table
        let err = contracts
            .generate(collaboration.id, Actor::brand(UserId::new()), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_double_sign_same_role_fails() {
        let fx = fixture().await;
        fx.contracts
            .generate(fx.collaboration.id, fx.brand, None, None)
            .await
            .unwrap();

        fx.contracts
            .sign(
                fx.collaboration.id,
                fx.brand.user_id,
                PartyRole::Brand,
                signature(),
            )
            .await
            .unwrap();

        let err = fx
            .contracts
            .sign(
                fx.collaboration.id,
                fx.brand.user_id,
                PartyRole::Brand,
                signature(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CollabPayError::AlreadySigned {
                role: PartyRole::Brand
            }
        ));
    }

    #[tokio::test]
    async fn test_both_signatures_drive_contract_signed() {
        let fx = fixture().await;
        fx.contracts
            .generate(fx.collaboration.id, fx.brand, None, None)
            .await
            .unwrap();

        let contract = fx
            .contracts
            .sign(
                fx.collaboration.id,
                fx.brand.user_id,
                PartyRole::Brand,
                signature(),
            )
            .await
            .unwrap();
        assert!(!contract.is_fully_signed);

        let collab = fx.collaborations.get(fx.collaboration.id).await.unwrap();
        assert_eq!(collab.status, CollaborationStatus::ContractPending);

        let contract = fx
            .contracts
            .sign(
                fx.collaboration.id,
                fx.influencer.user_id,
                PartyRole::Influencer,
                signature(),
            )
            .await
            .unwrap();
        assert!(contract.is_fully_signed);
        assert!(contract.both_signed());

        let collab = fx.collaborations.get(fx.collaboration.id).await.unwrap();
        assert_eq!(collab.status, CollaborationStatus::ContractSigned);
    }

    #[tokio::test]
    async fn test_sign_without_contract_fails() {
        let fx = fixture().await;

        let err = fx
            .contracts
            .sign(
                fx.collaboration.id,
                fx.brand.user_id,
                PartyRole::Brand,
                signature(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CollabPayError::ContractNotFound { .. }));
    }
}
