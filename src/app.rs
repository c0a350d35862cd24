use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, crafts, health, reports, teams, tickets, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, config: AppConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let app_config = AppConfig::from_env()?;
    let state = AppState::new(pool, jwt_config, app_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/", post(users::create_user))
        .route("/:id", get(users::get_user))
        .route("/:id", put(users::update_user))
        .route("/:id", delete(users::delete_user))
        .route("/:id/roles", put(users::update_roles));

    let manager_routes = Router::new()
        .route("/", get(users::list_managers))
        .route("/", post(users::create_manager))
        .route("/:id", put(users::update_manager))
        .route("/:id", delete(users::delete_manager));

    let agent_routes = Router::new()
        .route("/", get(users::list_agents))
        .route("/", post(users::create_agent))
        .route("/:id", put(users::update_agent))
        .route("/:id", delete(users::delete_agent));

    let team_routes = Router::new()
        .route("/", get(teams::list_teams))
        .route("/", post(teams::create_team))
        .route("/available-managers", get(teams::available_managers))
        .route("/available-agents", get(teams::available_agents))
        .route("/:id", get(teams::get_team))
        .route("/:id", put(teams::update_team))
        .route("/:id", delete(teams::delete_team))
        .route("/:id/members", get(teams::list_members))
        .route("/:id/members", post(teams::add_member))
        .route("/:id/members/:user_id", delete(teams::remove_member));

    let ticket_routes = Router::new()
        .route("/", get(tickets::list_tickets))
        .route("/", post(tickets::create_ticket))
        .route("/:id", get(tickets::get_ticket))
        .route("/:id", put(tickets::update_ticket))
        .route("/:id", delete(tickets::delete_ticket));

    let report_routes = Router::new()
        .route("/tickets", post(reports::ticket_report))
        .route("/commission", post(reports::commission_report));

    let craft_routes = Router::new()
        .route("/", get(crafts::list_crafts))
        .route("/", post(crafts::create_craft))
        .route("/:id", delete(crafts::deactivate_craft));

    let specialty_routes = Router::new()
        .route("/", get(crafts::list_specialties))
        .route("/", post(crafts::create_specialty))
        .route("/:id", delete(crafts::deactivate_specialty));

    let router = Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/managers", manager_routes)
        .nest("/agents", agent_routes)
        .nest("/teams", team_routes)
        .nest("/tickets", ticket_routes)
        .nest("/reports", report_routes)
        .nest("/crafts", craft_routes)
        .nest("/specialties", specialty_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
