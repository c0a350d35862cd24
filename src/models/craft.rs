use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Craft {
    pub id: i64,
    pub name: String,
    pub is_active: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Specialty {
    pub id: i64,
    pub craft_id: i64,
    pub name: String,
    pub is_active: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CraftCreateRequest {
    #[schema(example = "Plumbing")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpecialtyCreateRequest {
    pub craft_id: i64,
    #[schema(example = "Pipe fitting")]
    pub name: String,
}
