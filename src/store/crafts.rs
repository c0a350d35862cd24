use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::craft::{Craft, CraftCreateRequest, Specialty, SpecialtyCreateRequest};

pub async fn create_craft(pool: &SqlitePool, req: &CraftCreateRequest) -> AppResult<Craft> {
    let result = sqlx::query("INSERT INTO craft (name, is_active) VALUES (?, 1)")
        .bind(&req.name)
        .execute(pool)
        .await?;

    get_craft(pool, result.last_insert_rowid()).await
}

pub async fn create_speciality(pool: &SqlitePool, req: &SpecialtyCreateRequest) -> AppResult<Specialty> {
    let craft_exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM craft WHERE id = ? AND is_active = 1")
        .bind(req.craft_id)
        .fetch_one(pool)
        .await?;
    if craft_exists == 0 {
        return Err(AppError::not_found("craft not found"));
    }

    let result = sqlx::query("INSERT INTO speciality (craft_id, name, is_active) VALUES (?, ?, 1)")
        .bind(req.craft_id)
        .bind(&req.name)
        .execute(pool)
        .await?;

    let specialty = sqlx::query_as::<_, Specialty>(
        "SELECT id, craft_id, name, is_active FROM speciality WHERE id = ?",
    )
    .bind(result.last_insert_rowid())
    .fetch_one(pool)
    .await?;

    Ok(specialty)
}

/// Reference data is never hard-deleted; tickets keep pointing at retired
/// taxonomy rows.
pub async fn deactivate_craft(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let affected = sqlx::query("UPDATE craft SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("craft not found"));
    }

    sqlx::query("UPDATE speciality SET is_active = 0 WHERE craft_id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn deactivate_speciality(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let affected = sqlx::query("UPDATE speciality SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(id)
        .execute(pool)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("specialty not found"));
    }
    Ok(())
}

pub async fn get_craft(pool: &SqlitePool, id: i64) -> AppResult<Craft> {
    sqlx::query_as::<_, Craft>("SELECT id, name, is_active FROM craft WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("craft not found"))
}

pub async fn list_crafts(pool: &SqlitePool) -> AppResult<Vec<Craft>> {
    let crafts = sqlx::query_as::<_, Craft>("SELECT id, name, is_active FROM craft WHERE is_active = 1 ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(crafts)
}

pub async fn list_specialties(pool: &SqlitePool, craft_id: Option<i64>) -> AppResult<Vec<Specialty>> {
    let specialties = match craft_id {
        Some(craft_id) => {
            sqlx::query_as::<_, Specialty>(
                "SELECT id, craft_id, name, is_active FROM speciality WHERE craft_id = ? AND is_active = 1 ORDER BY name",
            )
            .bind(craft_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Specialty>(
                "SELECT id, craft_id, name, is_active FROM speciality WHERE is_active = 1 ORDER BY name",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(specialties)
}
