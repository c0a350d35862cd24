use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;

/// A ticket as the core sees it: the legacy comma-joined columns are parsed
/// into typed values at this boundary and never leak further in.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Ticket {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub problem_desc: Option<String>,
    pub is_paid: bool,
    pub amount: i64,
    pub craft_id: i64,
    #[schema(value_type = Vec<i64>)]
    pub specialty_ids: BTreeSet<i64>,
    pub active: bool,
    pub created_by: i64,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `problems` row. `craft_ids` holds a single craft id as text and
/// `speciality_ids` a comma-joined list, kept for on-disk compatibility.
#[derive(Debug, Clone, FromRow)]
pub struct DbProblem {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub problem_desc: Option<String>,
    pub is_paid: i64,
    pub amount: i64,
    pub craft_ids: String,
    pub speciality_ids: String,
    pub is_active: i64,
    pub created_by: i64,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbProblem> for Ticket {
    type Error = AppError;

    fn try_from(value: DbProblem) -> Result<Self, Self::Error> {
        let craft_id = value
            .craft_ids
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::integrity(format!("invalid craft_ids column: {:?}", value.craft_ids)))?;
        let specialty_ids = parse_id_list(&value.speciality_ids)?;

        Ok(Ticket {
            id: value.id,
            customer_name: value.customer_name,
            customer_phone: value.customer_phone,
            problem_desc: value.problem_desc,
            is_paid: value.is_paid != 0,
            amount: value.amount,
            craft_id,
            specialty_ids,
            active: value.is_active != 0,
            created_by: value.created_by,
            updated_by: value.updated_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

pub fn parse_id_list(raw: &str) -> Result<BTreeSet<i64>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| AppError::integrity(format!("invalid id list entry: {part:?}")))
        })
        .collect()
}

pub fn join_id_list(ids: &BTreeSet<i64>) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketCreateRequest {
    #[schema(example = "Musa Ibrahim")]
    pub customer_name: String,
    #[schema(example = "+2348012345678")]
    pub customer_phone: String,
    pub problem_desc: Option<String>,
    pub is_paid: bool,
    #[schema(example = 25000)]
    pub amount: i64,
    pub craft_id: i64,
    #[serde(default)]
    pub specialty_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TicketUpdateRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub problem_desc: Option<String>,
    pub is_paid: Option<bool>,
    pub amount: Option<i64>,
    pub craft_id: Option<i64>,
    pub specialty_ids: Option<Vec<i64>>,
}
