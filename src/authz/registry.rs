use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The fixed role catalog. Ids mirror the seeded `role` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Manager,
    Agent,
}

impl RoleName {
    pub fn id(&self) -> i64 {
        match self {
            RoleName::Admin => 1,
            RoleName::Manager => 2,
            RoleName::Agent => 3,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(RoleName::Admin),
            2 => Some(RoleName::Manager),
            3 => Some(RoleName::Agent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Manager => "manager",
            RoleName::Agent => "agent",
        }
    }

    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(RoleName::Admin),
            "manager" => Some(RoleName::Manager),
            "agent" => Some(RoleName::Agent),
            _ => None,
        }
    }
}

/// Back-office pages a permission can apply to. Tab labels stay a UI concern;
/// the engine only sees these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Users,
    Managers,
    Agents,
    Teams,
    Tickets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Add,
    Edit,
    Delete,
    ViewStats,
    /// Gates whether the subject sees the full list or only their own row.
    ViewAll,
}

/// Static catalog of what each role may do on each page. Loaded once per
/// process; row-level restrictions are layered on by the evaluator.
pub struct RoleRegistry;

impl RoleRegistry {
    pub fn grants(role: RoleName, page: Page, action: Action) -> bool {
        use Action::*;
        match (role, page) {
            (RoleName::Admin, Page::Tickets) => matches!(action, View | ViewStats | ViewAll),
            (RoleName::Admin, _) => true,

            (RoleName::Manager, Page::Users) => false,
            // Edit on self only; the self restriction is the evaluator's job.
            (RoleName::Manager, Page::Managers) => matches!(action, View | Edit),
            (RoleName::Manager, Page::Agents) => matches!(action, View | Add | Edit | ViewStats | ViewAll),
            (RoleName::Manager, Page::Teams) => matches!(action, View | Add | Edit | ViewStats | ViewAll),
            (RoleName::Manager, Page::Tickets) => matches!(action, View | Add | Edit | ViewStats | ViewAll),

            (RoleName::Agent, Page::Agents) => matches!(action, View | Edit),
            (RoleName::Agent, Page::Tickets) => {
                matches!(action, View | Add | Edit | Delete | ViewStats | ViewAll)
            }
            (RoleName::Agent, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_full_entity_pages() {
        for page in [Page::Users, Page::Managers, Page::Agents, Page::Teams] {
            for action in [Action::View, Action::Add, Action::Edit, Action::Delete, Action::ViewStats, Action::ViewAll] {
                assert!(RoleRegistry::grants(RoleName::Admin, page, action));
            }
        }
    }

    #[test]
    fn admin_ticket_page_is_read_only() {
        assert!(RoleRegistry::grants(RoleName::Admin, Page::Tickets, Action::View));
        assert!(RoleRegistry::grants(RoleName::Admin, Page::Tickets, Action::ViewStats));
        assert!(RoleRegistry::grants(RoleName::Admin, Page::Tickets, Action::ViewAll));
        assert!(!RoleRegistry::grants(RoleName::Admin, Page::Tickets, Action::Add));
        assert!(!RoleRegistry::grants(RoleName::Admin, Page::Tickets, Action::Delete));
    }

    #[test]
    fn manager_locked_out_of_user_page() {
        for action in [Action::View, Action::Add, Action::Edit, Action::Delete] {
            assert!(!RoleRegistry::grants(RoleName::Manager, Page::Users, action));
        }
    }

    #[test]
    fn manager_cannot_delete_tickets_at_page_level() {
        assert!(RoleRegistry::grants(RoleName::Manager, Page::Tickets, Action::Edit));
        assert!(!RoleRegistry::grants(RoleName::Manager, Page::Tickets, Action::Delete));
    }

    #[test]
    fn agent_sees_only_own_record_without_view_all() {
        assert!(RoleRegistry::grants(RoleName::Agent, Page::Agents, Action::View));
        assert!(!RoleRegistry::grants(RoleName::Agent, Page::Agents, Action::ViewAll));
        assert!(!RoleRegistry::grants(RoleName::Agent, Page::Teams, Action::View));
    }

    #[test]
    fn agent_owns_the_ticket_page() {
        for action in [Action::View, Action::Add, Action::Edit, Action::Delete, Action::ViewStats, Action::ViewAll] {
            assert!(RoleRegistry::grants(RoleName::Agent, Page::Tickets, action));
        }
    }

    #[test]
    fn role_ids_round_trip() {
        for role in [RoleName::Admin, RoleName::Manager, RoleName::Agent] {
            assert_eq!(RoleName::from_id(role.id()), Some(role));
            assert_eq!(RoleName::from_str(role.as_str()), Some(role));
        }
        assert_eq!(RoleName::from_id(9), None);
    }
}
