//! Collaboration messaging types
//!
//! A simple append-only message log between the two parties, scoped to a
//! collaboration. Messages have no interaction with the state machine.

use crate::{CollaborationId, MessageId, PartyRole, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message between the collaboration's parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationMessage {
    pub id: MessageId,
    pub collaboration_id: CollaborationId,
    pub sender_id: UserId,
    pub sender_role: PartyRole,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}
