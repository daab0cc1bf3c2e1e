//! Milestone types
//!
//! A milestone is a named payment tranche of a collaboration's agreed
//! amount. Milestones are created in a single validated batch and never
//! deleted afterwards.

use crate::{CollaborationId, MilestoneId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment status of a milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MilestoneStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

/// A payment tranche scoped to one collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub collaboration_id: CollaborationId,
    pub title: String,
    /// Position within the collaboration's milestone sequence
    pub order: u32,
    pub amount: Decimal,
    pub status: MilestoneStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller input for one milestone in a batch-create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneInput {
    pub title: String,
    pub amount: Decimal,
}
