use super::registry::{Action, Page, RoleName, RoleRegistry};
use super::subject::{Subject, TeamScope};
use crate::models::ticket::Ticket;
use crate::models::user::User;

/// Pure allow/deny decisions. Holds no state; every answer is derived from
/// the static matrix plus the target handed in by the caller.
///
/// Evaluation order:
/// 1. any active role whose matrix cell grants the action -> allow
/// 2. target-scoped refinements for edits and ticket deletion
/// 3. deny
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Page-level gate. A subject with several active roles is allowed if any
    /// of them grants the pair.
    pub fn allows(&self, subject: &Subject, page: Page, action: Action) -> bool {
        let allowed = subject
            .active_roles
            .iter()
            .any(|role| RoleRegistry::grants(*role, page, action));

        if !allowed {
            tracing::debug!(
                subject_id = subject.id,
                page = ?page,
                action = ?action,
                "permission denied"
            );
        }
        allowed
    }

    /// Target-scoped refinement for user edits: admins edit anyone, managers
    /// edit themselves and agents, agents edit only themselves.
    pub fn allows_edit_user(&self, subject: &Subject, target: &User) -> bool {
        if subject.is_admin() {
            return true;
        }
        if subject.has_role(RoleName::Manager) {
            return target.id == subject.id || target.primary_role == RoleName::Agent;
        }
        if subject.has_role(RoleName::Agent) {
            return target.id == subject.id;
        }
        false
    }

    /// Row-level ticket deletion: admins always, managers within their
    /// managed team, agents on their own tickets.
    pub fn allows_delete_ticket(&self, subject: &Subject, ticket: &Ticket, scope: &TeamScope) -> bool {
        if subject.is_admin() {
            return true;
        }
        if subject.has_role(RoleName::Manager) && scope.covers(ticket.created_by) {
            return true;
        }
        subject.has_role(RoleName::Agent) && ticket.created_by == subject.id
    }
}
