use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::app::AppState;
use crate::authz::{Action, Page, PermissionEvaluator};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::craft::{Craft, CraftCreateRequest, Specialty, SpecialtyCreateRequest};
use crate::routes::users::subject;
use crate::store::crafts;

#[derive(Debug, Deserialize)]
pub struct SpecialtyQuery {
    pub craft_id: Option<i64>,
}

/// Anyone who can open the ticket page may read the taxonomy; mutating it is
/// an administrative act.
async fn gate_read(state: &AppState, auth: &AuthUser) -> AppResult<()> {
    let subject = subject(state, auth).await?;
    if !PermissionEvaluator::new().allows(&subject, Page::Tickets, Action::View) {
        return Err(AppError::forbidden("not permitted on this page"));
    }
    Ok(())
}

async fn gate_admin(state: &AppState, auth: &AuthUser) -> AppResult<()> {
    let subject = subject(state, auth).await?;
    if !subject.is_admin() {
        return Err(AppError::forbidden("taxonomy changes are admin-only"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/crafts",
    tag = "Crafts",
    responses((status = 200, description = "Active crafts", body = [Craft])),
    security(("bearerAuth" = []))
)]
pub async fn list_crafts(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Craft>>> {
    gate_read(&state, &auth).await?;
    Ok(Json(crafts::list_crafts(&state.pool).await?))
}

#[utoipa::path(
    post,
    path = "/crafts",
    tag = "Crafts",
    request_body = CraftCreateRequest,
    responses((status = 201, description = "Craft created", body = Craft)),
    security(("bearerAuth" = []))
)]
pub async fn create_craft(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CraftCreateRequest>,
) -> AppResult<(StatusCode, Json<Craft>)> {
    gate_admin(&state, &auth).await?;
    let craft = crafts::create_craft(&state.pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(craft)))
}

#[utoipa::path(
    delete,
    path = "/crafts/{id}",
    tag = "Crafts",
    params(("id" = i64, Path, description = "Craft id")),
    responses((status = 204, description = "Craft and its specialties deactivated")),
    security(("bearerAuth" = []))
)]
pub async fn deactivate_craft(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    gate_admin(&state, &auth).await?;
    crafts::deactivate_craft(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/specialties",
    tag = "Crafts",
    params(("craft_id" = Option<i64>, Query, description = "Restrict to one craft")),
    responses((status = 200, description = "Active specialties", body = [Specialty])),
    security(("bearerAuth" = []))
)]
pub async fn list_specialties(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SpecialtyQuery>,
) -> AppResult<Json<Vec<Specialty>>> {
    gate_read(&state, &auth).await?;
    Ok(Json(crafts::list_specialties(&state.pool, query.craft_id).await?))
}

#[utoipa::path(
    post,
    path = "/specialties",
    tag = "Crafts",
    request_body = SpecialtyCreateRequest,
    responses(
        (status = 201, description = "Specialty created", body = Specialty),
        (status = 404, description = "Parent craft missing")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_specialty(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SpecialtyCreateRequest>,
) -> AppResult<(StatusCode, Json<Specialty>)> {
    gate_admin(&state, &auth).await?;
    let specialty = crafts::create_speciality(&state.pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(specialty)))
}

#[utoipa::path(
    delete,
    path = "/specialties/{id}",
    tag = "Crafts",
    params(("id" = i64, Path, description = "Specialty id")),
    responses((status = 204, description = "Specialty deactivated")),
    security(("bearerAuth" = []))
)]
pub async fn deactivate_specialty(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    gate_admin(&state, &auth).await?;
    crafts::deactivate_speciality(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
