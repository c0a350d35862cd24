use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use super::registry::RoleName;

/// The authenticated operator: identity plus the active role set. The
/// `primary_role` is the denormalized cache column; authority checks always
/// consult `active_roles`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub primary_role: RoleName,
    #[schema(value_type = Vec<RoleName>)]
    pub active_roles: HashSet<RoleName>,
}

impl Subject {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>, primary_role: RoleName) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            primary_role,
            active_roles: HashSet::from([primary_role]),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleName>) -> Self {
        self.active_roles = roles.into_iter().collect();
        self.active_roles.insert(self.primary_role);
        self
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.active_roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(RoleName::Admin)
    }
}

/// Resolved row-level reach of a manager: the team they currently manage and
/// its active member ids. Empty for subjects who manage nothing.
#[derive(Debug, Clone, Default)]
pub struct TeamScope {
    pub team_id: Option<i64>,
    pub member_ids: HashSet<i64>,
}

impl TeamScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(mut self, team_id: i64, member_ids: impl IntoIterator<Item = i64>) -> Self {
        self.team_id = Some(team_id);
        self.member_ids = member_ids.into_iter().collect();
        self
    }

    pub fn covers(&self, user_id: i64) -> bool {
        self.member_ids.contains(&user_id)
    }
}
