use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::RoleName;
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub national_id: Option<String>,
    pub name: String,
    pub email: String,
    pub primary_role: RoleName,
    pub active: bool,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub national_id: Option<String>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
    pub is_active: i64,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(value: DbUser) -> Result<Self, Self::Error> {
        let primary_role = RoleName::from_id(value.role_id)
            .ok_or_else(|| AppError::integrity(format!("unknown role id {}", value.role_id)))?;

        Ok(User {
            id: value.id,
            national_id: value.national_id,
            name: value.name,
            email: value.email,
            primary_role,
            active: value.is_active != 0,
            created_by: value.created_by,
            updated_by: value.updated_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// List row joined with role and creator names for the entity pages.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct UserListItem {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role_name: String,
    pub is_active: i64,
    pub created_by_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateRequest {
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    #[schema(example = 3)]
    pub primary_role_id: i64,
    pub national_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub national_id: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRolesRequest {
    /// Replacement role set; the first entry becomes the primary role.
    pub role_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub subject: crate::authz::Subject,
}

/// Which deletion mode `delete_user` chose, surfaced so the UI can say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeletionOutcome {
    Hard,
    Soft,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletionResponse {
    pub outcome: DeletionOutcome,
}
