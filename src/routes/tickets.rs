use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{ticket_filter, Action, Page, PermissionEvaluator, TicketAction};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::ticket::{Ticket, TicketCreateRequest, TicketUpdateRequest};
use crate::routes::users::{actor_id, subject};
use crate::store::{teams, tickets};

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "Tickets",
    responses((status = 200, description = "Tickets visible to the subject", body = [Ticket])),
    security(("bearerAuth" = []))
)]
pub async fn list_tickets(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Ticket>>> {
    let subject = subject(&state, &auth).await?;
    if !PermissionEvaluator::new().allows(&subject, Page::Tickets, Action::View) {
        return Err(AppError::forbidden("not permitted on this page"));
    }

    let scope = teams::team_scope(&state.pool, subject.id).await?;
    let all = tickets::list_problems(&state.pool).await?;
    Ok(Json(ticket_filter::filter(&subject, &scope, all, TicketAction::View)))
}

#[utoipa::path(
    post,
    path = "/tickets",
    tag = "Tickets",
    request_body = TicketCreateRequest,
    responses(
        (status = 201, description = "Ticket created", body = Ticket),
        (status = 422, description = "Specialty or payment invariant violated")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TicketCreateRequest>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    let subject = subject(&state, &auth).await?;
    if !PermissionEvaluator::new().allows(&subject, Page::Tickets, Action::Add) {
        return Err(AppError::forbidden("not permitted on this page"));
    }

    let ticket = tickets::create_problem(&state.pool, &payload, subject.id).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[utoipa::path(
    get,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses((status = 200, description = "Ticket detail", body = Ticket)),
    security(("bearerAuth" = []))
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let subject = subject(&state, &auth).await?;
    if !PermissionEvaluator::new().allows(&subject, Page::Tickets, Action::View) {
        return Err(AppError::forbidden("not permitted on this page"));
    }

    Ok(Json(tickets::get_problem(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    request_body = TicketUpdateRequest,
    responses(
        (status = 200, description = "Ticket updated", body = Ticket),
        (status = 403, description = "Ticket outside the subject's authority")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<TicketUpdateRequest>,
) -> AppResult<Json<Ticket>> {
    let subject = subject(&state, &auth).await?;
    let evaluator = PermissionEvaluator::new();
    // Admins carry no page-level edit on tickets but retain row authority.
    if !subject.is_admin() && !evaluator.allows(&subject, Page::Tickets, Action::Edit) {
        return Err(AppError::forbidden("not permitted on this page"));
    }

    let existing = tickets::get_problem(&state.pool, id).await?;
    let scope = teams::team_scope(&state.pool, subject.id).await?;
    if !ticket_filter::authorized(&subject, &scope, &existing, TicketAction::Edit) {
        return Err(AppError::forbidden("ticket outside your authority"));
    }

    let ticket = tickets::update_problem(&state.pool, id, &payload, actor_id(&subject)).await?;
    Ok(Json(ticket))
}

#[utoipa::path(
    delete,
    path = "/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "Ticket id")),
    responses(
        (status = 204, description = "Ticket deleted"),
        (status = 403, description = "Ticket outside the subject's authority")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let subject = subject(&state, &auth).await?;

    let existing = tickets::get_problem(&state.pool, id).await?;
    let scope = teams::team_scope(&state.pool, subject.id).await?;
    if !PermissionEvaluator::new().allows_delete_ticket(&subject, &existing, &scope) {
        return Err(AppError::forbidden("ticket outside your authority"));
    }

    tickets::delete_problem(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
