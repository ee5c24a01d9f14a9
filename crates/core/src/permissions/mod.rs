//! Permission system for desk and catalog operations

use crate::models::Role;
use uuid::Uuid;

/// Actions gated by account role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffAction {
    // Catalog maintenance
    AddHolding,
    UpdateHolding,

    // Circulation desk
    IssueOnBehalf,
    ViewCirculationReports,

    // Membership desk
    ViewMembershipRegister,
    ToggleMemberActive,
}

/// Permission matrix for account roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: Role, action: StaffAction) -> bool {
        match action {
            // Catalog maintenance - staff only
            StaffAction::AddHolding => role == Role::Admin,
            StaffAction::UpdateHolding => role == Role::Admin,

            // Circulation desk - staff only
            StaffAction::IssueOnBehalf => role == Role::Admin,
            StaffAction::ViewCirculationReports => role == Role::Admin,

            // Membership desk - staff only
            StaffAction::ViewMembershipRegister => role == Role::Admin,
            StaffAction::ToggleMemberActive => role == Role::Admin,
        }
    }

    /// Check if an actor may touch records belonging to `subject_id`.
    ///
    /// Staff may touch anyone's records; members only their own.
    pub fn can_act_for(actor_role: Role, actor_id: Uuid, subject_id: Uuid) -> bool {
        actor_role == Role::Admin || actor_id == subject_id
    }
}
