use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authz;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(
            authz::Subject,
            authz::RoleName,
            models::user::User,
            models::user::UserListItem,
            models::user::UserCreateRequest,
            models::user::UserUpdateRequest,
            models::user::UpdateRolesRequest,
            models::user::LoginRequest,
            models::user::AuthResponse,
            models::user::DeletionOutcome,
            models::user::DeletionResponse,
            models::team::Team,
            models::team::TeamListItem,
            models::team::TeamMember,
            models::team::TeamMemberListItem,
            models::team::TeamCreateRequest,
            models::team::TeamUpdateRequest,
            models::team::AddMemberRequest,
            models::ticket::Ticket,
            models::ticket::TicketCreateRequest,
            models::ticket::TicketUpdateRequest,
            models::craft::Craft,
            models::craft::Specialty,
            models::craft::CraftCreateRequest,
            models::craft::SpecialtyCreateRequest,
            models::report::ReportFilter,
            models::report::DateMode,
            models::report::ReportRow,
            models::report::ReportTotals,
            models::report::TicketReport,
            models::report::AgentCommission,
            models::report::ManagerCommission,
            models::report::CommissionReport,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User administration"),
        (name = "Managers", description = "Manager page"),
        (name = "Agents", description = "Agent page"),
        (name = "Teams", description = "Team and membership management"),
        (name = "Tickets", description = "Support tickets"),
        (name = "Reports", description = "Filtered reports and commissions"),
        (name = "Crafts", description = "Craft/specialty taxonomy"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;

    ensure_security_components(&mut doc);
    ensure_global_security(&mut doc);
    ensure_servers(&mut doc, port);

    Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .with_credentials(true)
        .persist_authorization(true);

    let doc_json = Arc::new(serde_json::to_value(&doc).expect("OpenAPI serialization must succeed"));

    let json_route = {
        let doc_json = Arc::clone(&doc_json);
        get(move || {
            let doc_json = Arc::clone(&doc_json);
            async move { Json((*doc_json).clone()) }
        })
    };

    Router::new()
        .route("/api-docs/openapi.json", json_route)
        .merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_security_components(doc: &mut Value) {
    let components = doc
        .as_object_mut()
        .expect("OpenAPI root must be an object")
        .entry("components")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .expect("components must be an object");

    let schemes = components
        .entry("securitySchemes")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .expect("securitySchemes must be an object");

    schemes.insert(
        "bearerAuth".to_string(),
        json!({
            "type": "http",
            "scheme": "bearer",
            "bearerFormat": "JWT"
        }),
    );
}

fn ensure_global_security(doc: &mut Value) {
    doc.as_object_mut()
        .expect("OpenAPI root must be an object")
        .entry("security")
        .or_insert_with(|| json!([{ "bearerAuth": [] }]));
}

fn ensure_servers(doc: &mut Value, port: u16) {
    let server_url = format!("http://localhost:{}", port);

    match doc.get_mut("servers") {
        Some(Value::Array(arr)) => {
            let has = arr
                .iter()
                .any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
            if !has {
                arr.push(json!({ "url": server_url }));
            }
        }
        _ => {
            doc["servers"] = json!([{ "url": server_url }]);
        }
    }
}
