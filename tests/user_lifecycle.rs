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
    let db_path = dir.path().join("test_users.db");
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

async fn seed_craft(app: &Router, admin: &str) -> Result<i64> {
    let resp = request(app, "POST", "/crafts", Some(admin), Some(json!({"name": "Plumbing"}))).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await?["id"].as_i64().context("craft id missing")
}

#[tokio::test]
async fn untouched_users_are_hard_deleted() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;
    let user_id = create_user(&app, &admin, "Fresh", "fresh@example.com", 3).await?;

    let resp = request(&app, "DELETE", &format!("/users/{user_id}"), Some(&admin), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["outcome"], "hard");

    let resp = request(&app, "GET", &format!("/users/{user_id}"), Some(&admin), None).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn users_with_activity_are_soft_deleted() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;
    let craft_id = seed_craft(&app, &admin).await?;
    let user_id = create_user(&app, &admin, "Author", "author@example.com", 3).await?;

    // Authoring a ticket makes the account referenced history
    let token = login(&app, "author@example.com", PASSWORD).await?;
    let resp = request(&app, "POST", "/tickets", Some(&token), Some(json!({
        "customer_name": "Musa",
        "customer_phone": "0800",
        "is_paid": false,
        "amount": 0,
        "craft_id": craft_id
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = request(&app, "DELETE", &format!("/users/{user_id}"), Some(&admin), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["outcome"], "soft");

    // The row survives, deactivated, and can no longer sign in
    let resp = request(&app, "GET", &format!("/users/{user_id}"), Some(&admin), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["active"], false);

    let resp = request(&app, "POST", "/auth/login", None, Some(json!({
        "email": "author@example.com",
        "password": PASSWORD
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn active_references_protect_against_deletion() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;
    let manager = create_user(&app, &admin, "Mgr", "mgr@example.com", 2).await?;
    let agent = create_user(&app, &admin, "Agent", "agent@example.com", 3).await?;

    let resp = request(&app, "POST", "/teams", Some(&admin), Some(json!({
        "name": "Alpha",
        "manager_id": manager
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let team_id = body_json(resp).await?["id"].as_i64().context("id missing")?;

    let resp = request(&app, "POST", &format!("/teams/{team_id}/members"), Some(&admin), Some(json!({"user_id": agent}))).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = request(&app, "DELETE", &format!("/users/{manager}"), Some(&admin), None).await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await?["error"], "protected_as_manager");

    let resp = request(&app, "DELETE", &format!("/users/{agent}"), Some(&admin), None).await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await?["error"], "protected_as_member");

    Ok(())
}

#[tokio::test]
async fn emails_are_unique_case_insensitively() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;
    let _ = create_user(&app, &admin, "Ada", "Ada@Example.com", 3).await?;

    let resp = request(&app, "POST", "/users", Some(&admin), Some(json!({
        "name": "Shadow",
        "email": "ada@EXAMPLE.COM",
        "password": PASSWORD,
        "primary_role_id": 3
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Soft-deleted rows still hold their email
    let other = create_user(&app, &admin, "Other", "other@example.com", 3).await?;
    let resp = request(&app, "PUT", &format!("/users/{other}"), Some(&admin), Some(json!({
        "email": "Ada@Example.com"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn role_updates_replace_the_active_set() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;
    let user_id = create_user(&app, &admin, "Dual", "dual@example.com", 3).await?;

    let resp = request(&app, "PUT", &format!("/users/{user_id}/roles"), Some(&admin), Some(json!({
        "role_ids": [2, 3]
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await?;
    assert_eq!(body["primary_role"], "manager");

    let token = login(&app, "dual@example.com", PASSWORD).await?;
    let resp = request(&app, "GET", "/auth/me", Some(&token), None).await?;
    let me = body_json(resp).await?;
    let roles: Vec<&str> = me["active_roles"].as_array().unwrap().iter().filter_map(|r| r.as_str()).collect();
    assert!(roles.contains(&"manager"));
    assert!(roles.contains(&"agent"));

    // Narrow back to a single role; the manager assignment deactivates
    let resp = request(&app, "PUT", &format!("/users/{user_id}/roles"), Some(&admin), Some(json!({
        "role_ids": [3]
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?["primary_role"], "agent");

    let token = login(&app, "dual@example.com", PASSWORD).await?;
    let resp = request(&app, "GET", "/auth/me", Some(&token), None).await?;
    let me = body_json(resp).await?;
    let roles: Vec<&str> = me["active_roles"].as_array().unwrap().iter().filter_map(|r| r.as_str()).collect();
    assert!(!roles.contains(&"manager"));

    let resp = request(&app, "PUT", &format!("/users/{user_id}/roles"), Some(&admin), Some(json!({
        "role_ids": [9]
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn page_permissions_scope_the_user_lists() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;
    let manager = create_user(&app, &admin, "Mgr", "mgr@example.com", 2).await?;
    let _agent = create_user(&app, &admin, "Agent", "agent@example.com", 3).await?;

    // Managers have no user-page access at all
    let mgr_token = login(&app, "mgr@example.com", PASSWORD).await?;
    let resp = request(&app, "GET", "/users", Some(&mgr_token), None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Without view_all the manager page collapses to the subject's own row
    let resp = request(&app, "GET", "/managers", Some(&mgr_token), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows = body_json(resp).await?;
    let ids: Vec<i64> = rows.as_array().unwrap().iter().filter_map(|r| r["id"].as_i64()).collect();
    assert_eq!(ids, vec![manager]);

    // Managers administer the agent page in full
    let resp = request(&app, "GET", "/agents", Some(&mgr_token), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await?.as_array().map(Vec::len), Some(1));

    // Agents cannot touch the manager page
    let agent_token = login(&app, "agent@example.com", PASSWORD).await?;
    let resp = request(&app, "GET", "/managers", Some(&agent_token), None).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // A manager may edit an agent but not another manager
    let other_mgr = create_user(&app, &admin, "Mgr Two", "mgr2@example.com", 2).await?;
    let resp = request(&app, "PUT", &format!("/agents/{_agent}"), Some(&mgr_token), Some(json!({
        "name": "Renamed Agent"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = request(&app, "PUT", &format!("/managers/{other_mgr}"), Some(&mgr_token), Some(json!({
        "name": "Not Yours"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}
