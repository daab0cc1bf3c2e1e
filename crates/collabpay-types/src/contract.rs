//! Contract and signature types
//!
//! A contract is one-to-one with a collaboration once generated. Signature
//! fields are written once per party; the contract is immutable after both
//! parties have signed.

use crate::{CollaborationId, ContractId, ContractTemplateId, PartyRole, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded signature from one party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSignature {
    pub signer_id: UserId,
    /// Opaque signature string supplied by the caller
    pub signature: String,
    pub ip_address: Option<String>,
    pub signed_at: DateTime<Utc>,
}

/// The contract aggregate, one per collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub collaboration_id: CollaborationId,
    pub template_id: Option<ContractTemplateId>,
    /// Rendered terms text
    pub terms: String,
    pub brand_signature: Option<ContractSignature>,
    pub influencer_signature: Option<ContractSignature>,
    /// Derived: both signatures present
    pub is_fully_signed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// When the given party signed, if they have
    pub fn signed_at(&self, role: PartyRole) -> Option<DateTime<Utc>> {
        match role {
            PartyRole::Brand => self.brand_signature.as_ref().map(|s| s.signed_at),
            PartyRole::Influencer => self.influencer_signature.as_ref().map(|s| s.signed_at),
        }
    }

    /// Whether the given party has signed
    pub fn is_signed_by(&self, role: PartyRole) -> bool {
        self.signed_at(role).is_some()
    }

    /// Whether both parties have signed
    pub fn both_signed(&self) -> bool {
        self.brand_signature.is_some() && self.influencer_signature.is_some()
    }
}

/// A reusable terms template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub id: ContractTemplateId,
    pub name: String,
    /// Terms body with `{{placeholder}}` variables
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Caller input for a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature: String,
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsigned_contract() -> Contract {
        Contract {
            id: ContractId::new(),
            collaboration_id: CollaborationId::new(),
            template_id: None,
            terms: "terms".to_string(),
            brand_signature: None,
            influencer_signature: None,
            is_fully_signed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_signature_tracking() {
        let mut contract = unsigned_contract();
        assert!(!contract.both_signed());
        assert!(!contract.is_signed_by(PartyRole::Brand));

        contract.brand_signature = Some(ContractSignature {
            signer_id: UserId::new(),
            signature: "sig".to_string(),
            ip_address: None,
            signed_at: Utc::now(),
        });

        assert!(contract.is_signed_by(PartyRole::Brand));
        assert!(!contract.is_signed_by(PartyRole::Influencer));
        assert!(!contract.both_signed());
    }
}
