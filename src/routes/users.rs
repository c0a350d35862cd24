use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{Action, Page, PermissionEvaluator, RoleName, Subject};
use crate::errors::{AppError, AppResult};
use crate::identity;
use crate::jwt::AuthUser;
use crate::models::user::{
    DeletionResponse, UpdateRolesRequest, User, UserCreateRequest, UserListItem, UserUpdateRequest,
};
use crate::store::{deletion, users};

/// Bootstrap logins have no user row; their writes carry no author id.
pub(crate) fn actor_id(subject: &Subject) -> Option<i64> {
    (subject.id != identity::BOOTSTRAP_SUBJECT_ID).then_some(subject.id)
}

pub(crate) async fn subject(state: &AppState, auth: &AuthUser) -> AppResult<Subject> {
    identity::load_subject(&state.pool, &state.config, auth.user_id).await
}

fn require(allowed: bool) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden("not permitted on this page"))
    }
}

async fn list_page(state: &AppState, auth: &AuthUser, page: Page, role: Option<RoleName>) -> AppResult<Vec<UserListItem>> {
    let subject = subject(state, auth).await?;
    let evaluator = PermissionEvaluator::new();
    require(evaluator.allows(&subject, page, Action::View))?;

    let rows = users::list_users(&state.pool, role).await?;
    if evaluator.allows(&subject, page, Action::ViewAll) {
        Ok(rows)
    } else {
        // Without `can_view_all` the page collapses to the subject's own row.
        Ok(rows.into_iter().filter(|row| row.id == subject.id).collect())
    }
}

async fn create_on_page(
    state: &AppState,
    auth: &AuthUser,
    page: Page,
    forced_role: Option<RoleName>,
    mut req: UserCreateRequest,
) -> AppResult<User> {
    let subject = subject(state, auth).await?;
    require(PermissionEvaluator::new().allows(&subject, page, Action::Add))?;

    if let Some(role) = forced_role {
        req.primary_role_id = role.id();
    }
    users::create_user(&state.pool, &req, actor_id(&subject)).await
}

async fn update_on_page(
    state: &AppState,
    auth: &AuthUser,
    page: Page,
    id: i64,
    req: &UserUpdateRequest,
) -> AppResult<User> {
    let subject = subject(state, auth).await?;
    let evaluator = PermissionEvaluator::new();
    require(evaluator.allows(&subject, page, Action::Edit))?;

    let target = users::get_user(&state.pool, id).await?;
    require(evaluator.allows_edit_user(&subject, &target))?;

    users::update_user(&state.pool, id, req, actor_id(&subject)).await
}

async fn delete_on_page(state: &AppState, auth: &AuthUser, page: Page, id: i64) -> AppResult<DeletionResponse> {
    let subject = subject(state, auth).await?;
    require(PermissionEvaluator::new().allows(&subject, page, Action::Delete))?;

    let outcome = deletion::delete_user(&state.pool, id, actor_id(&subject)).await?;
    Ok(DeletionResponse { outcome })
}

// ---------------------------------------------------------------------------
// /users — the admin-only user page
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses((status = 200, description = "List users", body = [UserListItem])),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<UserListItem>>> {
    Ok(Json(list_page(&state, &auth, Page::Users, None).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Email already in use")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = create_on_page(&state, &auth, Page::Users, None, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "User detail", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    let subject = subject(&state, &auth).await?;
    let evaluator = PermissionEvaluator::new();
    require(evaluator.allows(&subject, Page::Users, Action::View))?;
    if !evaluator.allows(&subject, Page::Users, Action::ViewAll) && id != subject.id {
        return Err(AppError::forbidden("not permitted on this page"));
    }

    Ok(Json(users::get_user(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "User updated", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(update_on_page(&state, &auth, Page::Users, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Deletion outcome", body = DeletionResponse),
        (status = 409, description = "User is protected by active references")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletionResponse>> {
    Ok(Json(delete_on_page(&state, &auth, Page::Users, id).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}/roles",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateRolesRequest,
    responses((status = 200, description = "Roles replaced", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn update_roles(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRolesRequest>,
) -> AppResult<Json<User>> {
    let subject = subject(&state, &auth).await?;
    require(PermissionEvaluator::new().allows(&subject, Page::Users, Action::Edit))?;

    let user = users::update_roles(&state.pool, id, &payload.role_ids, actor_id(&subject)).await?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// /managers — manager page (managers see and edit their own row)
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/managers",
    tag = "Managers",
    responses((status = 200, description = "List managers", body = [UserListItem])),
    security(("bearerAuth" = []))
)]
pub async fn list_managers(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<UserListItem>>> {
    Ok(Json(list_page(&state, &auth, Page::Managers, Some(RoleName::Manager)).await?))
}

#[utoipa::path(
    post,
    path = "/managers",
    tag = "Managers",
    request_body = UserCreateRequest,
    responses((status = 201, description = "Manager created", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn create_manager(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = create_on_page(&state, &auth, Page::Managers, Some(RoleName::Manager), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    put,
    path = "/managers/{id}",
    tag = "Managers",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "Manager updated", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn update_manager(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(update_on_page(&state, &auth, Page::Managers, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/managers/{id}",
    tag = "Managers",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Deletion outcome", body = DeletionResponse)),
    security(("bearerAuth" = []))
)]
pub async fn delete_manager(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletionResponse>> {
    Ok(Json(delete_on_page(&state, &auth, Page::Managers, id).await?))
}

// ---------------------------------------------------------------------------
// /agents — agent page (managers administer agents, agents see themselves)
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/agents",
    tag = "Agents",
    responses((status = 200, description = "List agents", body = [UserListItem])),
    security(("bearerAuth" = []))
)]
pub async fn list_agents(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<UserListItem>>> {
    Ok(Json(list_page(&state, &auth, Page::Agents, Some(RoleName::Agent)).await?))
}

#[utoipa::path(
    post,
    path = "/agents",
    tag = "Agents",
    request_body = UserCreateRequest,
    responses((status = 201, description = "Agent created", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn create_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = create_on_page(&state, &auth, Page::Agents, Some(RoleName::Agent), payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    put,
    path = "/agents/{id}",
    tag = "Agents",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "Agent updated", body = User)),
    security(("bearerAuth" = []))
)]
pub async fn update_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    Ok(Json(update_on_page(&state, &auth, Page::Agents, id, &payload).await?))
}

#[utoipa::path(
    delete,
    path = "/agents/{id}",
    tag = "Agents",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Deletion outcome", body = DeletionResponse)),
    security(("bearerAuth" = []))
)]
pub async fn delete_agent(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletionResponse>> {
    Ok(Json(delete_on_page(&state, &auth, Page::Agents, id).await?))
}
