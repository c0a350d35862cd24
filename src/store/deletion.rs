use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::{AppError, AppResult, ProtectedKind};
use crate::models::user::DeletionOutcome;
use crate::utils::utc_now;

/// Detects whether a user has authored any persisted artifact. Pluggable so
/// the deletion decision stays testable without a database.
#[async_trait]
pub trait ActivityProbe {
    async fn has_activity(&mut self, user_id: i64) -> AppResult<bool>;
}

/// Probe over the live store. Self-references that only reflect the user's
/// own row creation do not count as activity. Leading a team counts even
/// after the team is deactivated: the row keeps pointing at the manager.
pub struct StoreProbe<'c> {
    pub conn: &'c mut SqliteConnection,
}

#[async_trait]
impl ActivityProbe for StoreProbe<'_> {
    async fn has_activity(&mut self, user_id: i64) -> AppResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM problems WHERE created_by = ?1 OR updated_by = ?1) \
                 OR EXISTS(SELECT 1 FROM user WHERE (created_by = ?1 OR updated_by = ?1) AND id != ?1) \
                 OR EXISTS(SELECT 1 FROM team WHERE created_by = ?1 OR updated_by = ?1 OR manager_id = ?1) \
                 OR EXISTS(SELECT 1 FROM team_member WHERE created_by = ?1 OR updated_by = ?1)",
        )
        .bind(user_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(found != 0)
    }
}

/// The pure deletion rule, separated from the store so it can be exercised
/// directly: refusal beats soft delete beats hard delete.
pub fn decide(manages_active_team: bool, is_active_member: bool, has_activity: bool) -> Result<DeletionOutcome, ProtectedKind> {
    if manages_active_team {
        return Err(ProtectedKind::AsManager);
    }
    if is_active_member {
        return Err(ProtectedKind::AsMember);
    }
    if has_activity {
        Ok(DeletionOutcome::Soft)
    } else {
        Ok(DeletionOutcome::Hard)
    }
}

/// Deletes a user, choosing hard vs. soft from referential activity. The
/// chosen mode is returned so the caller can surface it.
pub async fn delete_user(pool: &SqlitePool, user_id: i64, actor: Option<i64>) -> AppResult<DeletionOutcome> {
    let mut tx = pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::not_found("user not found"));
    }

    let manages: i64 =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM team WHERE manager_id = ? AND is_active = 1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

    let member: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM team_member tm JOIN team t ON t.id = tm.team_id \
         WHERE tm.member_id = ? AND tm.is_active = 1 AND t.is_active = 1)",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    let has_activity = {
        let mut probe = StoreProbe { conn: &mut *tx };
        probe.has_activity(user_id).await?
    };

    let outcome = decide(manages != 0, member != 0, has_activity).map_err(|kind| {
        let detail = match kind {
            ProtectedKind::AsManager => "user still manages an active team",
            ProtectedKind::AsMember => "user is still an active team member",
        };
        AppError::protected(kind, detail)
    })?;

    match outcome {
        DeletionOutcome::Soft => {
            sqlx::query("UPDATE user SET is_active = 0, updated_by = ?, updated_at = ? WHERE id = ?")
                .bind(actor)
                .bind(utc_now())
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        DeletionOutcome::Hard => {
            sqlx::query("DELETE FROM user_role WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            // Inactive membership rows would dangle after a physical removal.
            sqlx::query("DELETE FROM team_member WHERE member_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM user WHERE id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    tracing::info!(user_id, outcome = ?outcome, "user deleted");
    Ok(outcome)
}
