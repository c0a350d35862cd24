use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use backdesk::create_app;

const BOOTSTRAP_EMAIL: &str = "root@backdesk.local";
const BOOTSTRAP_PASSWORD: &str = "Bootstr4p!pass";
const PASSWORD: &str = "Aa1!aaaa";

async fn setup() -> Result<(Router, SqlitePool, TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_tickets.db");
    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    std::env::set_var("BOOTSTRAP_ADMIN_EMAIL", BOOTSTRAP_EMAIL);
    std::env::set_var("BOOTSTRAP_ADMIN_PASSWORD", BOOTSTRAP_PASSWORD);
    let app = create_app(pool.clone()).await?;

    Ok((app, pool, dir))
}

async fn request(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(app.clone().oneshot(req).await?)
}

async fn body_json(resp: Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let resp = request(app, "POST", "/auth/login", None, Some(json!({"email": email, "password": password}))).await?;
    assert_eq!(resp.status(), StatusCode::OK, "login should succeed");
    let body = body_json(resp).await?;
    Ok(body["token"].as_str().context("token missing")?.to_string())
}

async fn create_user(app: &Router, token: &str, name: &str, email: &str, role_id: i64) -> Result<i64> {
    let resp = request(app, "POST", "/users", Some(token), Some(json!({
        "name": name,
        "email": email,
        "password": PASSWORD,
        "primary_role_id": role_id
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED, "user {email} should be created");
    let body = body_json(resp).await?;
    body["id"].as_i64().context("id missing")
}

async fn create_ticket(app: &Router, token: &str, craft_id: i64, customer: &str) -> Result<i64> {
    let resp = request(app, "POST", "/tickets", Some(token), Some(json!({
        "customer_name": customer,
        "customer_phone": "0800",
        "is_paid": false,
        "amount": 0,
        "craft_id": craft_id
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED, "ticket should be created");
    body_json(resp).await?["id"].as_i64().context("ticket id missing")
}

struct Fixture {
    craft_id: i64,
    admin: String,
    manager_token: String,
    a1_token: String,
    a2_token: String,
    a1_tickets: Vec<i64>,
    a2_tickets: Vec<i64>,
}

/// Manager leads a team containing agent A1; agent A2 works teamless.
async fn seed(app: &Router) -> Result<Fixture> {
    let admin = login(app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;

    let resp = request(app, "POST", "/crafts", Some(&admin), Some(json!({"name": "Plumbing"}))).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let craft_id = body_json(resp).await?["id"].as_i64().context("craft id missing")?;

    let manager = create_user(app, &admin, "Mgr", "mgr@example.com", 2).await?;
    let a1 = create_user(app, &admin, "Agent One", "a1@example.com", 3).await?;
    let _a2 = create_user(app, &admin, "Agent Two", "a2@example.com", 3).await?;

    let resp = request(app, "POST", "/teams", Some(&admin), Some(json!({
        "name": "Alpha",
        "manager_id": manager
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let team_id = body_json(resp).await?["id"].as_i64().context("id missing")?;
    let resp = request(app, "POST", &format!("/teams/{team_id}/members"), Some(&admin), Some(json!({"user_id": a1}))).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let manager_token = login(app, "mgr@example.com", PASSWORD).await?;
    let a1_token = login(app, "a1@example.com", PASSWORD).await?;
    let a2_token = login(app, "a2@example.com", PASSWORD).await?;

    let mut a1_tickets = Vec::new();
    for i in 0..2 {
        a1_tickets.push(create_ticket(app, &a1_token, craft_id, &format!("A1 customer {i}")).await?);
    }
    let mut a2_tickets = Vec::new();
    for i in 0..3 {
        a2_tickets.push(create_ticket(app, &a2_token, craft_id, &format!("A2 customer {i}")).await?);
    }

    Ok(Fixture {
        craft_id,
        admin,
        manager_token,
        a1_token,
        a2_token,
        a1_tickets,
        a2_tickets,
    })
}

#[tokio::test]
async fn every_role_views_the_full_ticket_list() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let fx = seed(&app).await?;

    for token in [&fx.admin, &fx.manager_token, &fx.a1_token, &fx.a2_token] {
        let resp = request(&app, "GET", "/tickets", Some(token), None).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        let tickets = body_json(resp).await?;
        assert_eq!(tickets.as_array().map(Vec::len), Some(5));
    }

    Ok(())
}

#[tokio::test]
async fn agents_delete_only_their_own_tickets() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let fx = seed(&app).await?;

    let foreign = fx.a2_tickets[0];
    let resp = request(&app, "DELETE", &format!("/tickets/{foreign}"), Some(&fx.a1_token), None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let own = fx.a1_tickets[0];
    let resp = request(&app, "DELETE", &format!("/tickets/{own}"), Some(&fx.a1_token), None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = request(&app, "GET", &format!("/tickets/{own}"), Some(&fx.a1_token), None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn manager_authority_follows_the_managed_team() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let fx = seed(&app).await?;

    // A1 is on the manager's team; their tickets are editable and deletable
    let team_ticket = fx.a1_tickets[0];
    let resp = request(&app, "PUT", &format!("/tickets/{team_ticket}"), Some(&fx.manager_token), Some(json!({
        "problem_desc": "triaged"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = request(&app, "DELETE", &format!("/tickets/{team_ticket}"), Some(&fx.manager_token), None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // A2 is outside the team
    let outside = fx.a2_tickets[0];
    let resp = request(&app, "PUT", &format!("/tickets/{outside}"), Some(&fx.manager_token), Some(json!({
        "problem_desc": "nope"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = request(&app, "DELETE", &format!("/tickets/{outside}"), Some(&fx.manager_token), None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn admins_hold_row_authority_but_cannot_open_tickets() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let fx = seed(&app).await?;

    // The ticket page grants admins no add action
    let resp = request(&app, "POST", "/tickets", Some(&fx.admin), Some(json!({
        "customer_name": "Admin Customer",
        "customer_phone": "0800",
        "is_paid": false,
        "amount": 0,
        "craft_id": fx.craft_id
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Row-level authority is unrestricted
    let any = fx.a2_tickets[1];
    let resp = request(&app, "DELETE", &format!("/tickets/{any}"), Some(&fx.admin), None).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn specialties_must_belong_to_the_tickets_craft() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let fx = seed(&app).await?;

    let resp = request(&app, "POST", "/crafts", Some(&fx.admin), Some(json!({"name": "Electrical"}))).await?;
    let other_craft = body_json(resp).await?["id"].as_i64().context("craft id missing")?;
    let resp = request(&app, "POST", "/specialties", Some(&fx.admin), Some(json!({
        "craft_id": other_craft,
        "name": "Wiring"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let foreign_specialty = body_json(resp).await?["id"].as_i64().context("specialty id missing")?;

    let resp = request(&app, "POST", "/tickets", Some(&fx.a1_token), Some(json!({
        "customer_name": "Mismatch",
        "customer_phone": "0800",
        "is_paid": false,
        "amount": 0,
        "craft_id": fx.craft_id,
        "specialty_ids": [foreign_specialty]
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await?["error"], "invalid_specialty");

    Ok(())
}

#[tokio::test]
async fn payment_flag_and_amount_move_together() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let fx = seed(&app).await?;

    let resp = request(&app, "POST", "/tickets", Some(&fx.a1_token), Some(json!({
        "customer_name": "Paid Zero",
        "customer_phone": "0800",
        "is_paid": true,
        "amount": 0,
        "craft_id": fx.craft_id
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await?["error"], "invalid_payment");

    let resp = request(&app, "POST", "/tickets", Some(&fx.a1_token), Some(json!({
        "customer_name": "Unpaid Amount",
        "customer_phone": "0800",
        "is_paid": false,
        "amount": 500,
        "craft_id": fx.craft_id
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The merged state of an update is validated too
    let existing = fx.a1_tickets[0];
    let resp = request(&app, "PUT", &format!("/tickets/{existing}"), Some(&fx.a1_token), Some(json!({
        "is_paid": true
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = request(&app, "PUT", &format!("/tickets/{existing}"), Some(&fx.a1_token), Some(json!({
        "is_paid": true,
        "amount": 2500
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}
