//! Identity types for CollabPay
//!
//! All identity types are strongly typed wrappers around UUIDs to prevent
//! accidental mixing of different ID types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

// Party identity types
define_id_type!(UserId, "user", "Unique identifier for a platform user");
define_id_type!(BrandId, "brand", "Unique identifier for a brand profile");
define_id_type!(InfluencerId, "inf", "Unique identifier for an influencer profile");
define_id_type!(CampaignId, "camp", "Unique identifier for a campaign");

// Collaboration identity types
define_id_type!(CollaborationId, "collab", "Unique identifier for a collaboration");
define_id_type!(HistoryEntryId, "hist", "Unique identifier for a status history entry");
define_id_type!(MessageId, "msg", "Unique identifier for a collaboration message");

// Contract identity types
define_id_type!(ContractId, "contract", "Unique identifier for a contract");
define_id_type!(ContractTemplateId, "ctpl", "Unique identifier for a contract template");

// Work tracking identity types
define_id_type!(MilestoneId, "mstone", "Unique identifier for a payment milestone");
define_id_type!(DeliverableId, "dlv", "Unique identifier for a deliverable");
define_id_type!(DeliverableVersionId, "dlvv", "Unique identifier for a deliverable version");

// Ledger identity types
define_id_type!(WalletId, "wallet", "Unique identifier for a wallet");
define_id_type!(WalletTransactionId, "wtx", "Unique identifier for a wallet transaction");
define_id_type!(PayoutMethodId, "paym", "Unique identifier for a payout method");

// Escrow identity types
define_id_type!(EscrowId, "escrow", "Unique identifier for an escrow account");
define_id_type!(EscrowReleaseId, "esrel", "Unique identifier for an escrow release record");

// Billing identity types
define_id_type!(InvoiceId, "inv", "Unique identifier for an invoice");

/// Which side of a collaboration a party is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyRole {
    /// The brand proposing and paying for the collaboration
    Brand,
    /// The influencer producing the content
    Influencer,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brand => write!(f, "brand"),
            Self::Influencer => write!(f, "influencer"),
        }
    }
}

/// Role supplied by the caller with every mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    Brand,
    Influencer,
    /// Platform operator; passes every role gate
    Admin,
}

impl ActorRole {
    /// The collaboration side this role maps to, if any
    pub fn party(&self) -> Option<PartyRole> {
        match self {
            Self::Brand => Some(PartyRole::Brand),
            Self::Influencer => Some(PartyRole::Influencer),
            Self::Admin => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brand => write!(f, "brand"),
            Self::Influencer => write!(f, "influencer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// An authenticated caller: identity plus role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: UserId, role: ActorRole) -> Self {
        Self { user_id, role }
    }

    pub fn brand(user_id: UserId) -> Self {
        Self::new(user_id, ActorRole::Brand)
    }

    pub fn influencer(user_id: UserId) -> Self {
        Self::new(user_id, ActorRole::Influencer)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, ActorRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_parse() {
        let id = CollaborationId::new();
        let s = id.to_string();
        assert!(s.starts_with("collab_"));
        assert_eq!(CollaborationId::parse(&s).unwrap(), id);
    }

    #[test]
    fn test_id_parse_without_prefix() {
        let id = WalletId::new();
        let bare = id.as_uuid().to_string();
        assert_eq!(WalletId::parse(&bare).unwrap(), id);
    }

    #[test]
    fn test_actor_role_party() {
        assert_eq!(ActorRole::Brand.party(), Some(PartyRole::Brand));
        assert_eq!(ActorRole::Influencer.party(), Some(PartyRole::Influencer));
        assert_eq!(ActorRole::Admin.party(), None);
    }
}
