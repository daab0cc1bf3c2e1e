//! The collaboration transition table
//!
//! One source of truth for the whole state machine: a fixed table of
//! `(action, next status, allowed roles)` rules per status. `transition`
//! and `available_actions` both derive from it, and the match over
//! `CollaborationStatus` is exhaustive so no state can be silently
//! unhandled.

use collabpay_types::{ActorRole, CollabAction, CollaborationStatus, PartyRole};

/// One allowed action from a given status
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub action: CollabAction,
    pub next: CollaborationStatus,
    /// Parties that may invoke the action; admin may invoke any rule
    pub allowed_roles: &'static [PartyRole],
}

const BRAND: &[PartyRole] = &[PartyRole::Brand];
const INFLUENCER: &[PartyRole] = &[PartyRole::Influencer];
const BOTH: &[PartyRole] = &[PartyRole::Brand, PartyRole::Influencer];
/// Admin-only rules list no party roles
const ADMIN_ONLY: &[PartyRole] = &[];

const fn rule(
    action: CollabAction,
    next: CollaborationStatus,
    allowed_roles: &'static [PartyRole],
) -> TransitionRule {
    TransitionRule {
        action,
        next,
        allowed_roles,
    }
}

use collabpay_types::CollabAction as A;
use collabpay_types::CollaborationStatus as S;

const PROPOSAL_SENT: &[TransitionRule] = &[
    rule(A::Accept, S::ProposalAccepted, INFLUENCER),
    rule(A::Negotiate, S::Negotiating, INFLUENCER),
    rule(A::Reject, S::Cancelled, INFLUENCER),
    rule(A::Cancel, S::Cancelled, BRAND),
];

const NEGOTIATING: &[TransitionRule] = &[
    rule(A::Accept, S::ProposalAccepted, BOTH),
    rule(A::Cancel, S::Cancelled, BOTH),
];

const PROPOSAL_ACCEPTED: &[TransitionRule] = &[
    rule(A::GenerateContract, S::ContractPending, BRAND),
    rule(A::Cancel, S::Cancelled, BOTH),
];

const CONTRACT_PENDING: &[TransitionRule] = &[
    rule(A::Sign, S::ContractSigned, BOTH),
    rule(A::Cancel, S::Cancelled, BOTH),
];

const CONTRACT_SIGNED: &[TransitionRule] = &[
    rule(A::StartProduction, S::InProduction, INFLUENCER),
    rule(A::Cancel, S::Cancelled, BOTH),
    rule(A::Dispute, S::Disputed, BOTH),
];

const IN_PRODUCTION: &[TransitionRule] = &[
    rule(A::SubmitContent, S::ContentSubmitted, INFLUENCER),
    rule(A::Cancel, S::Cancelled, BOTH),
    rule(A::Dispute, S::Disputed, BOTH),
];

const CONTENT_SUBMITTED: &[TransitionRule] = &[
    rule(A::ApproveContent, S::ContentApproved, BRAND),
    rule(A::RequestRevision, S::RevisionRequested, BRAND),
    rule(A::Dispute, S::Disputed, BOTH),
];

const REVISION_REQUESTED: &[TransitionRule] = &[
    rule(A::SubmitContent, S::ContentSubmitted, INFLUENCER),
    rule(A::Dispute, S::Disputed, BOTH),
];

const CONTENT_APPROVED: &[TransitionRule] = &[
    rule(A::Publish, S::Published, INFLUENCER),
    rule(A::Dispute, S::Disputed, BOTH),
];

const PUBLISHED: &[TransitionRule] = &[
    rule(A::RequestPayment, S::PaymentPending, INFLUENCER),
    rule(A::Dispute, S::Disputed, BOTH),
];

const PAYMENT_PENDING: &[TransitionRule] = &[
    rule(A::Complete, S::Completed, BRAND),
    rule(A::Dispute, S::Disputed, BOTH),
];

const DISPUTED: &[TransitionRule] = &[
    rule(A::ResolveComplete, S::Completed, ADMIN_ONLY),
    rule(A::ResolveCancel, S::Cancelled, ADMIN_ONLY),
];

const TERMINAL: &[TransitionRule] = &[];

/// All rules for a status; empty for terminal states
pub fn transition_rules(status: CollaborationStatus) -> &'static [TransitionRule] {
    match status {
        S::ProposalSent => PROPOSAL_SENT,
        S::Negotiating => NEGOTIATING,
        S::ProposalAccepted => PROPOSAL_ACCEPTED,
        S::ContractPending => CONTRACT_PENDING,
        S::ContractSigned => CONTRACT_SIGNED,
        S::InProduction => IN_PRODUCTION,
        S::ContentSubmitted => CONTENT_SUBMITTED,
        S::RevisionRequested => REVISION_REQUESTED,
        S::ContentApproved => CONTENT_APPROVED,
        S::Published => PUBLISHED,
        S::PaymentPending => PAYMENT_PENDING,
        S::Disputed => DISPUTED,
        S::Completed | S::Cancelled => TERMINAL,
    }
}

/// Look up the rule for an action from a status
pub fn find_rule(
    status: CollaborationStatus,
    action: CollabAction,
) -> Option<&'static TransitionRule> {
    transition_rules(status).iter().find(|r| r.action == action)
}

/// Whether the role may invoke the rule; admin passes every gate
pub fn role_may_invoke(rule: &TransitionRule, role: ActorRole) -> bool {
    match role.party() {
        None => true,
        Some(party) => rule.allowed_roles.contains(&party),
    }
}

/// Actions visible to a role from a status; empty for terminal states
pub fn available_actions(status: CollaborationStatus, role: ActorRole) -> Vec<CollabAction> {
    transition_rules(status)
        .iter()
        .filter(|r| role_may_invoke(r, role))
        .map(|r| r.action)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [CollaborationStatus; 14] = [
        S::ProposalSent,
        S::ProposalAccepted,
        S::Negotiating,
        S::ContractPending,
        S::ContractSigned,
        S::InProduction,
        S::ContentSubmitted,
        S::RevisionRequested,
        S::ContentApproved,
        S::Published,
        S::PaymentPending,
        S::Completed,
        S::Cancelled,
        S::Disputed,
    ];

    #[test]
    fn test_terminal_states_have_no_rules() {
        assert!(transition_rules(S::Completed).is_empty());
        assert!(transition_rules(S::Cancelled).is_empty());
    }

    #[test]
    fn test_every_non_terminal_state_has_rules() {
        for status in ALL_STATUSES {
            if !status.is_terminal() {
                assert!(
                    !transition_rules(status).is_empty(),
                    "{status} has no outbound rules"
                );
            }
        }
    }

    #[test]
    fn test_actions_are_unique_per_state() {
        for status in ALL_STATUSES {
            let rules = transition_rules(status);
            for (i, a) in rules.iter().enumerate() {
                for b in &rules[i + 1..] {
                    assert_ne!(a.action, b.action, "duplicate action in {status}");
                }
            }
        }
    }

    #[test]
    fn test_rules_never_target_their_own_state() {
        for status in ALL_STATUSES {
            for rule in transition_rules(status) {
                assert_ne!(rule.next, status, "self-loop in {status}");
            }
        }
    }

    #[test]
    fn test_accept_from_proposal_sent() {
        let rule = find_rule(S::ProposalSent, A::Accept).unwrap();
        assert_eq!(rule.next, S::ProposalAccepted);
        assert!(rule.allowed_roles.contains(&PartyRole::Influencer));
        assert!(!rule.allowed_roles.contains(&PartyRole::Brand));
    }

    #[test]
    fn test_publish_not_valid_from_proposal_sent() {
        assert!(find_rule(S::ProposalSent, A::Publish).is_none());
    }

    #[test]
    fn test_admin_passes_every_gate() {
        for status in ALL_STATUSES {
            let visible = available_actions(status, ActorRole::Admin);
            assert_eq!(visible.len(), transition_rules(status).len());
        }
    }

    #[test]
    fn test_dispute_resolution_is_admin_only() {
        assert!(available_actions(S::Disputed, ActorRole::Brand).is_empty());
        assert!(available_actions(S::Disputed, ActorRole::Influencer).is_empty());
        let admin = available_actions(S::Disputed, ActorRole::Admin);
        assert!(admin.contains(&A::ResolveComplete));
        assert!(admin.contains(&A::ResolveCancel));
    }

    #[test]
    fn test_role_filtered_visibility() {
        let brand = available_actions(S::ContentSubmitted, ActorRole::Brand);
        assert!(brand.contains(&A::ApproveContent));
        assert!(brand.contains(&A::RequestRevision));

        let influencer = available_actions(S::ContentSubmitted, ActorRole::Influencer);
        assert!(!influencer.contains(&A::ApproveContent));
        assert!(influencer.contains(&A::Dispute));
    }
}
