//! Deliverable and version types
//!
//! A deliverable tracks one piece of required content across multiple
//! submitted versions. Versions are immutable once created; superseding and
//! review state are recorded with bulk flags, never by deleting rows.

use crate::{CollaborationId, DeliverableId, DeliverableVersionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review status of a deliverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliverableStatus {
    /// Created but nothing submitted yet
    Pending,
    Submitted,
    Approved,
    RevisionRequested,
    Rejected,
}

/// Caller-facing review decision, mapped to a stored status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewDecision {
    Approved,
    RevisionNeeded,
    Rejected,
}

impl ReviewDecision {
    /// The stored status this decision maps to
    pub fn stored_status(&self) -> DeliverableStatus {
        match self {
            Self::Approved => DeliverableStatus::Approved,
            Self::RevisionNeeded => DeliverableStatus::RevisionRequested,
            Self::Rejected => DeliverableStatus::Rejected,
        }
    }
}

/// One required piece of content for a collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: DeliverableId,
    pub collaboration_id: CollaborationId,
    pub title: String,
    /// Highest submitted version number; 0 before the first submission
    pub current_version: u32,
    pub status: DeliverableStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable submitted version of a deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableVersion {
    pub id: DeliverableVersionId,
    pub deliverable_id: DeliverableId,
    pub version: u32,
    pub media_urls: Vec<String>,
    pub caption: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// Bulk-flagged when a newer version is submitted
    pub superseded: bool,
    /// Bulk-flagged when the review call processes this version
    pub reviewed: bool,
    pub review_status: Option<DeliverableStatus>,
    pub review_feedback: Option<String>,
    pub reviewer_id: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Caller input for a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionInput {
    pub media_urls: Vec<String>,
    pub caption: Option<String>,
}

/// Caller input for a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_decision_mapping() {
        assert_eq!(
            ReviewDecision::RevisionNeeded.stored_status(),
            DeliverableStatus::RevisionRequested
        );
        assert_eq!(
            ReviewDecision::Approved.stored_status(),
            DeliverableStatus::Approved
        );
        assert_eq!(
            ReviewDecision::Rejected.stored_status(),
            DeliverableStatus::Rejected
        );
    }
}
