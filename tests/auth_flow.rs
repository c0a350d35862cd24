use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use backdesk::create_app;

const BOOTSTRAP_EMAIL: &str = "root@backdesk.local";
const BOOTSTRAP_PASSWORD: &str = "Bootstr4p!pass";
const PASSWORD: &str = "Aa1!aaaa";

async fn setup() -> Result<(Router, SqlitePool, TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_auth.db");
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

#[tokio::test]
async fn login_applies_case_folding() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;

    let resp = request(&app, "POST", "/users", Some(&admin), Some(json!({
        "name": "Case Folded",
        "email": "a@x",
        "password": PASSWORD,
        "primary_role_id": 3
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await?;
    let user_id = created["id"].as_i64().context("id missing")?;

    // Upper-cased email resolves to the same account
    let token = login(&app, "A@X", PASSWORD).await?;
    let resp = request(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await?;
    assert_eq!(me["id"].as_i64(), Some(user_id));
    assert_eq!(me["primary_role"], "agent");

    Ok(())
}

#[tokio::test]
async fn bad_credentials_and_missing_tokens_are_rejected() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;

    let resp = request(&app, "POST", "/users", Some(&admin), Some(json!({
        "name": "Valid User",
        "email": "valid@example.com",
        "password": PASSWORD,
        "primary_role_id": 3
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Wrong password
    let resp = request(&app, "POST", "/auth/login", None, Some(json!({
        "email": "valid@example.com",
        "password": "WrongPass1!"
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Unknown email
    let resp = request(&app, "POST", "/auth/login", None, Some(json!({
        "email": "nobody@example.com",
        "password": PASSWORD
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Protected route without token
    let resp = request(&app, "GET", "/tickets", None, None).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn weak_passwords_fail_the_strength_policy() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;

    for weak in ["short1!", "alllower1!", "ALLUPPER1!", "NoDigits!!", "NoSpecial11"] {
        let resp = request(&app, "POST", "/users", Some(&admin), Some(json!({
            "name": "Weak",
            "email": "weak@example.com",
            "password": weak,
            "primary_role_id": 3
        })))
        .await?;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "password {weak:?} should be rejected");
    }

    Ok(())
}

#[tokio::test]
async fn inactive_accounts_cannot_sign_in() -> Result<()> {
    let (app, _pool, _dir) = setup().await?;
    let admin = login(&app, BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).await?;

    let resp = request(&app, "POST", "/users", Some(&admin), Some(json!({
        "name": "Dormant",
        "email": "dormant@example.com",
        "password": PASSWORD,
        "primary_role_id": 3
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user_id = body_json(resp).await?["id"].as_i64().context("id missing")?;

    let resp = request(&app, "PUT", &format!("/users/{user_id}"), Some(&admin), Some(json!({
        "active": false
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = request(&app, "POST", "/auth/login", None, Some(json!({
        "email": "dormant@example.com",
        "password": PASSWORD
    })))
    .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn legacy_hex_digests_still_verify() -> Result<()> {
    let (app, pool, _dir) = setup().await?;

    // Unmigrated row carrying a bare SHA-256 hex digest instead of argon2
    let mut hasher = Sha256::new();
    hasher.update(PASSWORD.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO user (name, email, password_hash, role_id, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, 3, 1, ?, ?)",
    )
    .bind("Legacy User")
    .bind("legacy@example.com")
    .bind(&digest)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await?;

    let token = login(&app, "legacy@example.com", PASSWORD).await?;
    let resp = request(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}
