use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::authz::Subject;
use crate::errors::AppResult;
use crate::identity;
use crate::jwt::AuthUser;
use crate::models::user::{AuthResponse, LoginRequest};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or inactive account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let subject = identity::authenticate(&state.pool, &state.config, &payload.email, &payload.password).await?;
    let token = state.jwt.encode(subject.id)?;

    Ok(Json(AuthResponse { token, subject }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current subject", body = Subject)),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Subject>> {
    let subject = identity::load_subject(&state.pool, &state.config, auth.user_id).await?;
    Ok(Json(subject))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged")),
    security(("bearerAuth" = []))
)]
pub async fn logout(_auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}
