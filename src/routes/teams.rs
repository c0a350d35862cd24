use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{Action, Page, PermissionEvaluator};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::team::{AddMemberRequest, Team, TeamCreateRequest, TeamListItem, TeamMemberListItem, TeamUpdateRequest};
use crate::models::user::UserListItem;
use crate::routes::users::{actor_id, subject};
use crate::store::teams;

async fn gate(state: &AppState, auth: &AuthUser, action: Action) -> AppResult<crate::authz::Subject> {
    let subject = subject(state, auth).await?;
    if !PermissionEvaluator::new().allows(&subject, Page::Teams, action) {
        return Err(AppError::forbidden("not permitted on this page"));
    }
    Ok(subject)
}

#[utoipa::path(
    get,
    path = "/teams",
    tag = "Teams",
    responses((status = 200, description = "List teams", body = [TeamListItem])),
    security(("bearerAuth" = []))
)]
pub async fn list_teams(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<TeamListItem>>> {
    let _ = gate(&state, &auth, Action::View).await?;
    Ok(Json(teams::list_teams(&state.pool).await?))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "Teams",
    request_body = TeamCreateRequest,
    responses(
        (status = 201, description = "Team created", body = Team),
        (status = 409, description = "Team name already in use"),
        (status = 422, description = "Manager invalid or already leading a team")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TeamCreateRequest>,
) -> AppResult<(StatusCode, Json<Team>)> {
    let subject = gate(&state, &auth, Action::Add).await?;
    let team = teams::create_team(&state.pool, &payload, actor_id(&subject)).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[utoipa::path(
    get,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    responses((status = 200, description = "Team detail", body = Team)),
    security(("bearerAuth" = []))
)]
pub async fn get_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Team>> {
    let _ = gate(&state, &auth, Action::View).await?;
    Ok(Json(teams::get_team(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    request_body = TeamUpdateRequest,
    responses((status = 200, description = "Team updated", body = Team)),
    security(("bearerAuth" = []))
)]
pub async fn update_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<TeamUpdateRequest>,
) -> AppResult<Json<Team>> {
    let subject = gate(&state, &auth, Action::Edit).await?;
    let team = teams::update_team(&state.pool, id, &payload, actor_id(&subject)).await?;
    Ok(Json(team))
}

#[utoipa::path(
    delete,
    path = "/teams/{id}",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    responses(
        (status = 204, description = "Team deleted"),
        (status = 409, description = "Team still has active members")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let _ = gate(&state, &auth, Action::Delete).await?;
    teams::delete_team(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/teams/{id}/members",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    responses((status = 200, description = "Active members", body = [TeamMemberListItem])),
    security(("bearerAuth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<TeamMemberListItem>>> {
    let _ = gate(&state, &auth, Action::View).await?;
    Ok(Json(teams::list_members(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/teams/{id}/members",
    tag = "Teams",
    params(("id" = i64, Path, description = "Team id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added"),
        (status = 422, description = "Agent invalid, busy, or the team's manager")
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<StatusCode> {
    let subject = gate(&state, &auth, Action::Edit).await?;
    teams::add_member(&state.pool, id, payload.user_id, actor_id(&subject)).await?;
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/teams/{id}/members/{user_id}",
    tag = "Teams",
    params(
        ("id" = i64, Path, description = "Team id"),
        ("user_id" = i64, Path, description = "Member user id")
    ),
    responses((status = 204, description = "Member removed")),
    security(("bearerAuth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let subject = gate(&state, &auth, Action::Edit).await?;
    teams::remove_member(&state.pool, id, user_id, actor_id(&subject)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/teams/available-managers",
    tag = "Teams",
    responses((status = 200, description = "Managers free to lead a team", body = [UserListItem])),
    security(("bearerAuth" = []))
)]
pub async fn available_managers(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<UserListItem>>> {
    let _ = gate(&state, &auth, Action::View).await?;
    Ok(Json(teams::available_managers(&state.pool).await?))
}

#[utoipa::path(
    get,
    path = "/teams/available-agents",
    tag = "Teams",
    responses((status = 200, description = "Agents free to join a team", body = [UserListItem])),
    security(("bearerAuth" = []))
)]
pub async fn available_agents(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<UserListItem>>> {
    let _ = gate(&state, &auth, Action::View).await?;
    Ok(Json(teams::available_agents(&state.pool).await?))
}
