use sqlx::SqlitePool;

use crate::authz::{RoleName, Subject};
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::user::DbUser;
use crate::store::users;
use crate::utils::{fold_email, verify_password};

/// Synthetic id for the configured bootstrap administrator; `AUTOINCREMENT`
/// row ids start at 1, so it never collides.
pub const BOOTSTRAP_SUBJECT_ID: i64 = 0;

fn bootstrap_subject(email: &str) -> Subject {
    Subject::new(BOOTSTRAP_SUBJECT_ID, "Bootstrap Admin", email, RoleName::Admin)
}

/// Verifies credentials and returns the subject with its active role set.
/// The bootstrap pair short-circuits before any database access; inactive
/// accounts fail regardless of the password.
pub async fn authenticate(pool: &SqlitePool, config: &AppConfig, email: &str, password: &str) -> AppResult<Subject> {
    if config.matches_bootstrap(email, password) {
        tracing::info!("bootstrap admin signed in");
        return Ok(bootstrap_subject(&fold_email(email)));
    }

    let db_user = users::get_user_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::auth_failed("invalid credentials"))?;

    if db_user.is_active == 0 {
        return Err(AppError::auth_failed("account is inactive"));
    }
    if !verify_password(password, &db_user.password_hash)? {
        return Err(AppError::auth_failed("invalid credentials"));
    }

    subject_from(pool, db_user).await
}

/// Rebuilds the subject for a previously-issued token.
pub async fn load_subject(pool: &SqlitePool, config: &AppConfig, user_id: i64) -> AppResult<Subject> {
    if user_id == BOOTSTRAP_SUBJECT_ID {
        return match &config.bootstrap_admin_email {
            Some(email) => Ok(bootstrap_subject(email)),
            None => Err(AppError::auth_failed("bootstrap admin is not configured")),
        };
    }

    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, national_id, name, email, password_hash, role_id, is_active, created_by, updated_by, created_at, updated_at \
         FROM user WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::auth_failed("account no longer exists"))?;

    if db_user.is_active == 0 {
        return Err(AppError::auth_failed("account is inactive"));
    }

    subject_from(pool, db_user).await
}

async fn subject_from(pool: &SqlitePool, db_user: DbUser) -> AppResult<Subject> {
    let primary_role = RoleName::from_id(db_user.role_id)
        .ok_or_else(|| AppError::integrity(format!("unknown role id {}", db_user.role_id)))?;

    // Effective roles are the union of active assignment rows; the cached
    // column is folded in by `with_roles`.
    let roles: Vec<RoleName> = users::active_role_ids(pool, db_user.id)
        .await?
        .into_iter()
        .filter_map(RoleName::from_id)
        .collect();

    Ok(Subject::new(db_user.id, db_user.name, db_user.email, primary_role).with_roles(roles))
}
