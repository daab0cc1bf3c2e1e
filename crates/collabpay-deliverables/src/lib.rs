//! CollabPay Deliverables - Milestone tranches and the content review cycle
//!
//! Milestones are created in one validated batch whose amounts must sum to
//! the collaboration's agreed amount. Deliverables track submitted content
//! across immutable versions; superseding and review state are recorded
//! with bulk flags, never by deleting rows.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use collabpay_lifecycle::CollaborationService;
use collabpay_types::{
    money, CollabPayError, CollaborationId, Deliverable, DeliverableId, DeliverableStatus,
    DeliverableVersion, DeliverableVersionId, Milestone, MilestoneId, MilestoneInput,
    MilestoneStatus, Result, ReviewInput, SubmissionInput, UserId,
};

// ============================================================================
// Milestones
// ============================================================================

/// Milestone store scoped to collaborations
#[derive(Clone)]
pub struct MilestoneService {
    collaborations: CollaborationService,
    milestones: Arc<RwLock<HashMap<MilestoneId, Milestone>>>,
}

impl MilestoneService {
    pub fn new(collaborations: CollaborationService) -> Self {
        Self {
            collaborations,
            milestones: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create all milestones for a collaboration in one validated batch
    ///
    /// The amounts must sum to the collaboration's agreed amount within the
    /// platform tolerance; order is preserved as given. A collaboration's
    /// milestones are created exactly once.
    pub async fn create_batch(
        &self,
        collaboration_id: CollaborationId,
        items: Vec<MilestoneInput>,
    ) -> Result<Vec<Milestone>> {
        let collaboration = self.collaborations.get(collaboration_id).await?;

        let total: rust_decimal::Decimal = items.iter().map(|i| i.amount).sum();
        if !money::approx_eq(total, collaboration.agreed_amount) {
            return Err(CollabPayError::AmountMismatch {
                expected: collaboration.agreed_amount,
                actual: total,
            });
        }

        let mut milestones = self.milestones.write().await;
        if milestones
            .values()
            .any(|m| m.collaboration_id == collaboration_id)
        {
            return Err(CollabPayError::invalid_state(
                "Milestones have already been created for this collaboration",
            ));
        }

        let now = Utc::now();
        let created: Vec<Milestone> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Milestone {
                id: MilestoneId::new(),
                collaboration_id,
                title: item.title,
                order: index as u32,
                amount: item.amount,
                status: MilestoneStatus::Pending,
                approved_at: None,
                paid_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        for milestone in &created {
            milestones.insert(milestone.id, milestone.clone());
        }

        info!(
            collaboration = %collaboration_id,
            count = created.len(),
            total = %total,
            "milestones created"
        );
        Ok(created)
    }

    /// Update a milestone's status, stamping `approved_at` / `paid_at`
    ///
    /// Moves no money; a transition to `Paid` is coordinated with the
    /// escrow release that references the same milestone.
    pub async fn update_status(
        &self,
        milestone_id: MilestoneId,
        new_status: MilestoneStatus,
    ) -> Result<Milestone> {
        let mut milestones = self.milestones.write().await;
        let milestone = milestones
            .get_mut(&milestone_id)
            .ok_or_else(|| CollabPayError::MilestoneNotFound {
                id: milestone_id.to_string(),
            })?;

        let now = Utc::now();
        milestone.status = new_status;
        milestone.updated_at = now;
        match new_status {
            MilestoneStatus::Approved => milestone.approved_at = Some(now),
            MilestoneStatus::Paid => milestone.paid_at = Some(now),
            MilestoneStatus::Pending | MilestoneStatus::Rejected => {}
        }

        info!(milestone = %milestone_id, ?new_status, "milestone status updated");
        Ok(milestone.clone())
    }

    /// Atomically claim a milestone for payment
    ///
    /// Sets the status to `Paid` under the write lock and returns the prior
    /// status; fails if the milestone was already paid, so two concurrent
    /// payment attempts cannot both succeed. The caller reverts with
    /// `restore_status` if the coordinated money movement fails.
    pub async fn claim_payment(
        &self,
        milestone_id: MilestoneId,
    ) -> Result<(Milestone, MilestoneStatus)> {
        let mut milestones = self.milestones.write().await;
        let milestone = milestones
            .get_mut(&milestone_id)
            .ok_or_else(|| CollabPayError::MilestoneNotFound {
                id: milestone_id.to_string(),
            })?;

        if milestone.status == MilestoneStatus::Paid {
            return Err(CollabPayError::invalid_state(
                "Milestone has already been paid",
            ));
        }

        let previous = milestone.status;
        let now = Utc::now();
        milestone.status = MilestoneStatus::Paid;
        milestone.paid_at = Some(now);
        milestone.updated_at = now;
        Ok((milestone.clone(), previous))
    }

    /// Undo a failed payment claim, restoring the prior status
    pub async fn restore_status(
        &self,
        milestone_id: MilestoneId,
        status: MilestoneStatus,
    ) -> Result<Milestone> {
        let mut milestones = self.milestones.write().await;
        let milestone = milestones
            .get_mut(&milestone_id)
            .ok_or_else(|| CollabPayError::MilestoneNotFound {
                id: milestone_id.to_string(),
            })?;

        milestone.status = status;
        milestone.paid_at = None;
        milestone.updated_at = Utc::now();
        Ok(milestone.clone())
    }

    /// Read a milestone
    pub async fn get(&self, milestone_id: MilestoneId) -> Result<Milestone> {
        self.milestones
            .read()
            .await
            .get(&milestone_id)
            .cloned()
            .ok_or_else(|| CollabPayError::MilestoneNotFound {
                id: milestone_id.to_string(),
            })
    }

    /// All milestones for a collaboration in batch order
    pub async fn list(&self, collaboration_id: CollaborationId) -> Vec<Milestone> {
        let milestones = self.milestones.read().await;
        let mut rows: Vec<Milestone> = milestones
            .values()
            .filter(|m| m.collaboration_id == collaboration_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.order);
        rows
    }
}

// ============================================================================
// Deliverables
// ============================================================================

/// Deliverable and version store
#[derive(Clone)]
pub struct DeliverableService {
    collaborations: CollaborationService,
    deliverables: Arc<RwLock<HashMap<DeliverableId, Deliverable>>>,
    /// All versions, append-only
    versions: Arc<RwLock<Vec<DeliverableVersion>>>,
}

impl DeliverableService {
    pub fn new(collaborations: CollaborationService) -> Self {
        Self {
            collaborations,
            deliverables: Arc::new(RwLock::new(HashMap::new())),
            versions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a required piece of content for a collaboration
    pub async fn create(
        &self,
        collaboration_id: CollaborationId,
        title: impl Into<String>,
    ) -> Result<Deliverable> {
        self.collaborations.get(collaboration_id).await?;

        let now = Utc::now();
        let deliverable = Deliverable {
            id: DeliverableId::new(),
            collaboration_id,
            title: title.into(),
            current_version: 0,
            status: DeliverableStatus::Pending,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        self.deliverables
            .write()
            .await
            .insert(deliverable.id, deliverable.clone());
        Ok(deliverable)
    }

    /// Submit a new version of a deliverable
    ///
    /// Creates an immutable version row at `current_version + 1`, bulk-flags
    /// every prior version as superseded, and moves the deliverable to
    /// `Submitted`.
    pub async fn submit(
        &self,
        deliverable_id: DeliverableId,
        input: SubmissionInput,
    ) -> Result<(Deliverable, DeliverableVersion)> {
        let mut deliverables = self.deliverables.write().await;
        let mut versions = self.versions.write().await;

        let deliverable = deliverables
            .get_mut(&deliverable_id)
            .ok_or_else(|| CollabPayError::DeliverableNotFound {
                id: deliverable_id.to_string(),
            })?;

        let new_version = deliverable.current_version + 1;

        for version in versions
            .iter_mut()
            .filter(|v| v.deliverable_id == deliverable_id)
        {
            version.superseded = true;
        }

        let version = DeliverableVersion {
            id: DeliverableVersionId::new(),
            deliverable_id,
            version: new_version,
            media_urls: input.media_urls,
            caption: input.caption,
            submitted_at: Utc::now(),
            superseded: false,
            reviewed: false,
            review_status: None,
            review_feedback: None,
            reviewer_id: None,
            reviewed_at: None,
        };
        versions.push(version.clone());

        deliverable.current_version = new_version;
        deliverable.status = DeliverableStatus::Submitted;
        deliverable.updated_at = Utc::now();

        info!(deliverable = %deliverable_id, version = new_version, "deliverable submitted");
        Ok((deliverable.clone(), version))
    }

    /// Review the current version of a deliverable
    ///
    /// Bulk-flags the current version's rows as reviewed with the stored
    /// decision; never creates a new version.
    pub async fn review(
        &self,
        deliverable_id: DeliverableId,
        reviewer_id: UserId,
        input: ReviewInput,
    ) -> Result<Deliverable> {
        let mut deliverables = self.deliverables.write().await;
        let mut versions = self.versions.write().await;

        let deliverable = deliverables
            .get_mut(&deliverable_id)
            .ok_or_else(|| CollabPayError::DeliverableNotFound {
                id: deliverable_id.to_string(),
            })?;

        if deliverable.current_version == 0 {
            return Err(CollabPayError::invalid_state(
                "Deliverable has no submitted version to review",
            ));
        }

        let stored = input.decision.stored_status();
        let now = Utc::now();
        let current = deliverable.current_version;

        for version in versions
            .iter_mut()
            .filter(|v| v.deliverable_id == deliverable_id && v.version == current)
        {
            version.reviewed = true;
            version.review_status = Some(stored);
            version.review_feedback = input.feedback.clone();
            version.reviewer_id = Some(reviewer_id);
            version.reviewed_at = Some(now);
        }

        deliverable.status = stored;
        deliverable.updated_at = now;
        if stored == DeliverableStatus::Approved {
            deliverable.approved_at = Some(now);
        }

        info!(deliverable = %deliverable_id, ?stored, "deliverable reviewed");
        Ok(deliverable.clone())
    }

    /// Read a deliverable
    pub async fn get(&self, deliverable_id: DeliverableId) -> Result<Deliverable> {
        self.deliverables
            .read()
            .await
            .get(&deliverable_id)
            .cloned()
            .ok_or_else(|| CollabPayError::DeliverableNotFound {
                id: deliverable_id.to_string(),
            })
    }

    /// All versions of a deliverable, newest first (version descending)
    pub async fn versions(&self, deliverable_id: DeliverableId) -> Vec<DeliverableVersion> {
        let versions = self.versions.read().await;
        let mut rows: Vec<DeliverableVersion> = versions
            .iter()
            .filter(|v| v.deliverable_id == deliverable_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.version.cmp(&a.version));
        rows
    }
}
