use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::{Action, Page, PermissionEvaluator};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::report::{CommissionReport, ReportFilter, TicketReport};
use crate::reports::{aggregator, commission};
use crate::routes::users::subject;
use crate::store::tickets;

async fn gate_stats(state: &AppState, auth: &AuthUser) -> AppResult<()> {
    let subject = subject(state, auth).await?;
    if !PermissionEvaluator::new().allows(&subject, Page::Tickets, Action::ViewStats) {
        return Err(AppError::forbidden("not permitted on this page"));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/reports/tickets",
    tag = "Reports",
    request_body = ReportFilter,
    responses((status = 200, description = "Long-form rows plus totals", body = TicketReport)),
    security(("bearerAuth" = []))
)]
pub async fn ticket_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(filter): Json<ReportFilter>,
) -> AppResult<Json<TicketReport>> {
    gate_stats(&state, &auth).await?;

    let all = tickets::list_problems(&state.pool).await?;
    let ctx = tickets::report_context(&state.pool).await?;

    let rows = aggregator::aggregate(&all, &filter, &ctx);
    let totals = aggregator::totals(&rows);

    Ok(Json(TicketReport { rows, totals }))
}

#[utoipa::path(
    post,
    path = "/reports/commission",
    tag = "Reports",
    request_body = ReportFilter,
    responses((status = 200, description = "Agent and manager payables", body = CommissionReport)),
    security(("bearerAuth" = []))
)]
pub async fn commission_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(filter): Json<ReportFilter>,
) -> AppResult<Json<CommissionReport>> {
    gate_stats(&state, &auth).await?;

    let all = tickets::list_problems(&state.pool).await?;
    let ctx = tickets::report_context(&state.pool).await?;

    let scoped = aggregator::selected(&all, &filter, &ctx);
    let report = commission::calculate(&scoped, &ctx.manager_of_creator);

    Ok(Json(report))
}
