//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{Holding, Issue, IssueStatus, Member, Role};

/// Validate that a member record is internally consistent
pub fn assert_member_invariants(member: &Member) {
    debug_assert!(
        !member.email.trim().is_empty(),
        "Member {} has empty email",
        member.id
    );

    match member.role {
        // Staff accounts carry no membership period
        Role::Admin => {
            debug_assert!(
                member.tier.is_none() && member.expires_at.is_none(),
                "Admin {} carries a membership tier or expiry",
                member.id
            );
        }
        // Borrowing members always have a tier, an expiry, and a number
        Role::Member => {
            debug_assert!(
                member.tier.is_some() && member.expires_at.is_some(),
                "Member {} is missing tier or expiry",
                member.id
            );
            debug_assert!(
                member.membership_no.is_some(),
                "Member {} has no membership number",
                member.id
            );
        }
    }
}

/// Validate that a catalog holding is internally consistent
pub fn assert_holding_invariants(holding: &Holding) {
    debug_assert!(
        !holding.serial_no.trim().is_empty(),
        "Holding {} has empty serial number",
        holding.id
    );

    debug_assert!(
        holding.cost >= 0,
        "Holding {} has negative cost {}",
        holding.id,
        holding.cost
    );
}

/// Validate that an issue record is in a reachable lifecycle state
pub fn assert_issue_invariants(issue: &Issue) {
    debug_assert!(
        issue.member_id != Uuid::nil(),
        "Issue {} has nil member_id",
        issue.id
    );

    debug_assert!(
        issue.holding_id != Uuid::nil(),
        "Issue {} has nil holding_id",
        issue.id
    );

    debug_assert!(
        issue.due_on >= issue.issued_on,
        "Issue {} is due before it was issued",
        issue.id
    );

    debug_assert!(
        issue.fine_amount >= 0,
        "Issue {} has negative fine {}",
        issue.id,
        issue.fine_amount
    );

    // Return dates are compared at calendar-day granularity
    if let Some(returned_on) = issue.returned_on {
        debug_assert!(
            returned_on.date_naive() >= issue.issued_on.date_naive(),
            "Issue {} was returned before it was issued",
            issue.id
        );
    }

    // Returned is only reachable after a physical return was recorded
    debug_assert!(
        !(issue.status == IssueStatus::Returned && issue.returned_on.is_none()),
        "Issue {} is Returned without a return date",
        issue.id
    );

    // A paid flag without a positive fine is an impossible state
    debug_assert!(
        !(issue.fine_paid && issue.fine_amount == 0),
        "Issue {} has fine_paid set but no fine",
        issue.id
    );
}

/// Validate that a member ID is not nil
pub fn assert_member_id_valid(member_id: Uuid, context: &str) {
    debug_assert!(
        member_id != Uuid::nil(),
        "Nil member_id in context: {}",
        context
    );
}
