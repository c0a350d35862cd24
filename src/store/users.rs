use sqlx::{SqliteConnection, SqlitePool};

use crate::authz::RoleName;
use crate::errors::{AppError, AppResult, ViolationKind};
use crate::models::user::{DbUser, User, UserCreateRequest, UserListItem, UserUpdateRequest};
use crate::utils::{fold_email, hash_password, utc_now};

/// I1: emails are unique case-insensitively across all users, active or not.
async fn email_in_use(conn: &mut SqliteConnection, email: &str, exclude: Option<i64>) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user WHERE lower(email) = lower(?) AND id != ?")
        .bind(email)
        .bind(exclude.unwrap_or(-1))
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn create_user(pool: &SqlitePool, req: &UserCreateRequest, actor: Option<i64>) -> AppResult<User> {
    let role = RoleName::from_id(req.primary_role_id)
        .ok_or_else(|| AppError::violation(ViolationKind::InvalidRole, "unknown role"))?;

    let email = fold_email(&req.email);
    let password_hash = hash_password(&req.password)?;

    let mut tx = pool.begin().await?;

    if email_in_use(&mut tx, &email, None).await? {
        return Err(AppError::conflict("email already in use"));
    }

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO user (national_id, name, email, password_hash, role_id, is_active, created_by, updated_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
    )
    .bind(&req.national_id)
    .bind(&req.name)
    .bind(&email)
    .bind(&password_hash)
    .bind(role.id())
    .bind(actor)
    .bind(actor)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "email already in use"))?;

    let id = result.last_insert_rowid();

    // The role table and the assignment rows stay consistent atomically.
    sqlx::query(
        "INSERT INTO user_role (user_id, role_id, is_active, created_by, created_at, updated_at) \
         VALUES (?, ?, 1, ?, ?, ?)",
    )
    .bind(id)
    .bind(role.id())
    .bind(actor)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let user = fetch_db_user(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(user_id = id, role = role.as_str(), "user created");
    user.try_into()
}

pub async fn update_user(pool: &SqlitePool, id: i64, patch: &UserUpdateRequest, actor: Option<i64>) -> AppResult<User> {
    let mut tx = pool.begin().await?;
    let mut user = fetch_db_user(&mut tx, id).await?;

    if let Some(email) = patch.email.as_deref() {
        let folded = fold_email(email);
        if email_in_use(&mut tx, &folded, Some(id)).await? {
            return Err(AppError::conflict("email already in use"));
        }
        user.email = folded;
    }
    if let Some(name) = patch.name.as_ref() {
        user.name = name.clone();
    }
    if patch.national_id.is_some() {
        user.national_id = patch.national_id.clone();
    }
    if let Some(password) = patch.password.as_deref() {
        user.password_hash = hash_password(password)?;
    }
    if let Some(active) = patch.active {
        user.is_active = active as i64;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE user SET national_id = ?, name = ?, email = ?, password_hash = ?, is_active = ?, updated_by = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&user.national_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.is_active)
    .bind(actor)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "email already in use"))?;

    user.updated_at = now;
    user.updated_by = actor;
    tx.commit().await?;

    user.try_into()
}

/// Replaces the active assignment set: rows outside the new set are
/// deactivated, rows inside are inserted or reactivated, and the cached
/// `role_id` column follows the first entry, all in one transaction.
pub async fn update_roles(pool: &SqlitePool, user_id: i64, role_ids: &[i64], actor: Option<i64>) -> AppResult<User> {
    if role_ids.is_empty() {
        return Err(AppError::bad_request("at least one role is required"));
    }
    for id in role_ids {
        if RoleName::from_id(*id).is_none() {
            return Err(AppError::violation(ViolationKind::InvalidRole, format!("unknown role id {id}")));
        }
    }

    let mut tx = pool.begin().await?;
    let _ = fetch_db_user(&mut tx, user_id).await?;

    let now = utc_now();
    let placeholders = role_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");

    let deactivate = format!(
        "UPDATE user_role SET is_active = 0, updated_at = ? WHERE user_id = ? AND role_id NOT IN ({placeholders})",
    );
    let mut query = sqlx::query(&deactivate).bind(now).bind(user_id);
    for id in role_ids {
        query = query.bind(id);
    }
    query.execute(&mut *tx).await?;

    for role_id in role_ids {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM user_role WHERE user_id = ? AND role_id = ?")
                .bind(user_id)
                .bind(role_id)
                .fetch_optional(&mut *tx)
                .await?;

        match existing {
            Some(row_id) => {
                sqlx::query("UPDATE user_role SET is_active = 1, updated_at = ? WHERE id = ?")
                    .bind(now)
                    .bind(row_id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO user_role (user_id, role_id, is_active, created_by, created_at, updated_at) \
                     VALUES (?, ?, 1, ?, ?, ?)",
                )
                .bind(user_id)
                .bind(role_id)
                .bind(actor)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    sqlx::query("UPDATE user SET role_id = ?, updated_by = ?, updated_at = ? WHERE id = ?")
        .bind(role_ids[0])
        .bind(actor)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let user = fetch_db_user(&mut tx, user_id).await?;
    tx.commit().await?;

    user.try_into()
}

async fn fetch_db_user(conn: &mut SqliteConnection, id: i64) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(
        "SELECT id, national_id, name, email, password_hash, role_id, is_active, created_by, updated_by, created_at, updated_at \
         FROM user WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn get_user(pool: &SqlitePool, id: i64) -> AppResult<User> {
    let mut conn = pool.acquire().await?;
    fetch_db_user(&mut conn, id).await?.try_into()
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, national_id, name, email, password_hash, role_id, is_active, created_by, updated_by, created_at, updated_at \
         FROM user WHERE lower(email) = lower(?)",
    )
    .bind(fold_email(email))
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Active assignment rows; the effective role set is their union.
pub async fn active_role_ids(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<i64>> {
    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT role_id FROM user_role WHERE user_id = ? AND is_active = 1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(ids)
}

/// Page listing, optionally narrowed to one role (the manager/agent pages).
pub async fn list_users(pool: &SqlitePool, role: Option<RoleName>) -> AppResult<Vec<UserListItem>> {
    let base = "SELECT u.id, u.name, u.email, r.name AS role_name, u.is_active, c.name AS created_by_name \
                FROM user u \
                JOIN role r ON r.id = u.role_id \
                LEFT JOIN user c ON c.id = u.created_by";

    let rows = match role {
        Some(role) => {
            let sql = format!("{base} WHERE u.role_id = ? ORDER BY u.id DESC");
            sqlx::query_as::<_, UserListItem>(&sql)
                .bind(role.id())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("{base} ORDER BY u.id DESC");
            sqlx::query_as::<_, UserListItem>(&sql).fetch_all(pool).await?
        }
    };

    Ok(rows)
}
