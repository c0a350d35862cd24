use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Team {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: i64,
    pub is_active: i64,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List row joined with the manager's display name.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TeamListItem {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub manager_id: i64,
    pub manager_name: String,
    pub is_active: i64,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TeamMember {
    pub id: i64,
    pub team_id: i64,
    pub member_id: i64,
    pub is_active: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member row joined with the agent's identity for the team page.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TeamMemberListItem {
    pub member_id: i64,
    pub member_name: String,
    pub member_email: String,
    pub is_active: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamCreateRequest {
    #[schema(example = "North Region")]
    pub name: String,
    pub manager_id: i64,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TeamUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manager_id: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: i64,
}
