use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which timestamp the report date window applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    Created,
    Updated,
    #[default]
    None,
}

/// Compound filter accepted by the report tabs. Empty vectors mean "no
/// restriction on that axis".
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReportFilter {
    #[serde(default)]
    pub text: Option<String>,
    /// `Some(true)` = paid only, `Some(false)` = unpaid only.
    #[serde(default)]
    pub payment_status: Option<bool>,
    #[serde(default)]
    pub craft_ids: Vec<i64>,
    #[serde(default)]
    pub specialty_ids: Vec<i64>,
    #[serde(default)]
    pub team_ids: Vec<i64>,
    #[serde(default)]
    pub creator_ids: Vec<i64>,
    #[serde(default)]
    pub date_mode: DateMode,
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
}

/// Long-form export row: one per (ticket, matched specialty).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportRow {
    pub ticket_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub craft_id: i64,
    pub craft_name: Option<String>,
    pub specialty_id: Option<i64>,
    pub specialty_name: Option<String>,
    pub is_paid: bool,
    pub amount: i64,
    pub created_by: i64,
    pub team_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ReportTotals {
    pub tickets: u64,
    pub paid_tickets: u64,
    pub total_amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketReport {
    pub rows: Vec<ReportRow>,
    pub totals: ReportTotals,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentCommission {
    pub agent_id: i64,
    pub tickets: u64,
    pub total_amount: i64,
    pub commission: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ManagerCommission {
    pub manager_id: i64,
    pub eligible_tickets: u64,
    pub commission: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CommissionReport {
    pub agents: Vec<AgentCommission>,
    pub managers: Vec<ManagerCommission>,
    pub agent_total: i64,
    pub manager_total: i64,
}
