use sqlx::{SqliteConnection, SqlitePool};

use crate::authz::TeamScope;
use crate::errors::{AppError, AppResult};
use crate::models::team::{Team, TeamCreateRequest, TeamListItem, TeamMemberListItem, TeamUpdateRequest};
use crate::models::user::UserListItem;
use crate::store::guard::{self, TeamWrite};
use crate::utils::utc_now;

const CODE_PREFIX: &str = "TEAM";

/// Allocates the next team code: `TEAM` + zero-padded successor of the
/// highest existing numeric suffix. On collision (the unique index is the
/// arbiter) the caller falls back to [`fallback_code`].
async fn next_code(conn: &mut SqliteConnection) -> AppResult<String> {
    let codes: Vec<String> = sqlx::query_scalar("SELECT code FROM team")
        .fetch_all(conn)
        .await?;

    let max = codes
        .iter()
        .filter_map(|code| code.strip_prefix(CODE_PREFIX))
        .filter_map(|suffix| suffix.parse::<i64>().ok())
        .max()
        .unwrap_or(0);

    Ok(format!("{CODE_PREFIX}{:03}", max + 1))
}

fn fallback_code() -> String {
    format!("{CODE_PREFIX}{:04}", utc_now().timestamp() % 10000)
}

pub async fn create_team(pool: &SqlitePool, req: &TeamCreateRequest, actor: Option<i64>) -> AppResult<Team> {
    let mut tx = pool.begin().await?;

    guard::validate(
        &mut tx,
        &TeamWrite::CreateTeam {
            name: &req.name,
            manager_id: req.manager_id,
        },
    )
    .await?;

    let mut code = next_code(&mut tx).await?;
    let taken: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM team WHERE code = ?")
        .bind(&code)
        .fetch_one(&mut *tx)
        .await?;
    if taken > 0 {
        code = fallback_code();
    }

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO team (code, name, description, manager_id, is_active, created_by, updated_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?)",
    )
    .bind(&code)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.manager_id)
    .bind(actor)
    .bind(actor)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "team code already in use"))?;

    let id = result.last_insert_rowid();
    let team = fetch_team(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(team_id = id, code = %team.code, "team created");
    Ok(team)
}

pub async fn update_team(pool: &SqlitePool, id: i64, patch: &TeamUpdateRequest, actor: Option<i64>) -> AppResult<Team> {
    let mut tx = pool.begin().await?;
    let mut team = fetch_team(&mut tx, id).await?;

    if let Some(name) = patch.name.as_deref() {
        if !name.eq_ignore_ascii_case(&team.name) {
            guard::validate(&mut tx, &TeamWrite::RenameTeam { team_id: id, name }).await?;
        }
        team.name = name.to_string();
    }
    if let Some(description) = patch.description.as_ref() {
        team.description = Some(description.clone());
    }
    if let Some(manager_id) = patch.manager_id {
        guard::validate(&mut tx, &TeamWrite::ChangeManager { team_id: id, manager_id }).await?;
        team.manager_id = manager_id;
    }
    if let Some(active) = patch.active {
        team.is_active = active as i64;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE team SET name = ?, description = ?, manager_id = ?, is_active = ?, updated_by = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&team.name)
    .bind(&team.description)
    .bind(team.manager_id)
    .bind(team.is_active)
    .bind(actor)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    team.updated_at = now;
    team.updated_by = actor;
    tx.commit().await?;

    Ok(team)
}

/// Teams are only hard-deleted, and only when no membership is active.
pub async fn delete_team(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    let _ = fetch_team(&mut tx, id).await?;

    let active_members: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM team_member WHERE team_id = ? AND is_active = 1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if active_members > 0 {
        return Err(AppError::conflict("team still has active members"));
    }

    sqlx::query("DELETE FROM team_member WHERE team_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM team WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn add_member(pool: &SqlitePool, team_id: i64, user_id: i64, actor: Option<i64>) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    let team = fetch_team(&mut tx, team_id).await?;
    if team.is_active == 0 {
        return Err(AppError::not_found("team not found"));
    }

    guard::validate(&mut tx, &TeamWrite::AddMember { team_id, member_id: user_id }).await?;

    let now = utc_now();
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM team_member WHERE team_id = ? AND member_id = ?")
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    match existing {
        Some(row_id) => {
            sqlx::query("UPDATE team_member SET is_active = 1, updated_by = ?, updated_at = ? WHERE id = ?")
                .bind(actor)
                .bind(now)
                .bind(row_id)
                .execute(&mut *tx)
                .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO team_member (team_id, member_id, is_active, created_by, updated_by, created_at, updated_at) \
                 VALUES (?, ?, 1, ?, ?, ?, ?)",
            )
            .bind(team_id)
            .bind(user_id)
            .bind(actor)
            .bind(actor)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Membership rows are deactivated rather than removed so authorship lineage
/// survives for the activity probe.
pub async fn remove_member(pool: &SqlitePool, team_id: i64, user_id: i64, actor: Option<i64>) -> AppResult<()> {
    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE team_member SET is_active = 0, updated_by = ?, updated_at = ? \
         WHERE team_id = ? AND member_id = ? AND is_active = 1",
    )
    .bind(actor)
    .bind(now)
    .bind(team_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("membership not found"));
    }
    Ok(())
}

async fn fetch_team(conn: &mut SqliteConnection, id: i64) -> AppResult<Team> {
    sqlx::query_as::<_, Team>(
        "SELECT id, code, name, description, manager_id, is_active, created_by, updated_by, created_at, updated_at \
         FROM team WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("team not found"))
}

pub async fn get_team(pool: &SqlitePool, id: i64) -> AppResult<Team> {
    let mut conn = pool.acquire().await?;
    fetch_team(&mut conn, id).await
}

pub async fn list_teams(pool: &SqlitePool) -> AppResult<Vec<TeamListItem>> {
    let teams = sqlx::query_as::<_, TeamListItem>(
        "SELECT t.id, t.code, t.name, t.description, t.manager_id, u.name AS manager_name, t.is_active, \
                (SELECT COUNT(1) FROM team_member tm WHERE tm.team_id = t.id AND tm.is_active = 1) AS member_count \
         FROM team t \
         JOIN user u ON u.id = t.manager_id \
         WHERE t.is_active = 1 \
         ORDER BY t.id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(teams)
}

pub async fn list_members(pool: &SqlitePool, team_id: i64) -> AppResult<Vec<TeamMemberListItem>> {
    let members = sqlx::query_as::<_, TeamMemberListItem>(
        "SELECT tm.member_id, u.name AS member_name, u.email AS member_email, tm.is_active \
         FROM team_member tm \
         JOIN user u ON u.id = tm.member_id \
         WHERE tm.team_id = ? AND tm.is_active = 1 \
         ORDER BY u.name",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Active managers not currently leading an active team.
pub async fn available_managers(pool: &SqlitePool) -> AppResult<Vec<UserListItem>> {
    let rows = sqlx::query_as::<_, UserListItem>(
        "SELECT u.id, u.name, u.email, r.name AS role_name, u.is_active, c.name AS created_by_name \
         FROM user u \
         JOIN role r ON r.id = u.role_id \
         LEFT JOIN user c ON c.id = u.created_by \
         WHERE u.is_active = 1 \
           AND (u.role_id = 2 OR EXISTS ( \
                SELECT 1 FROM user_role ur WHERE ur.user_id = u.id AND ur.role_id = 2 AND ur.is_active = 1)) \
           AND NOT EXISTS (SELECT 1 FROM team t WHERE t.manager_id = u.id AND t.is_active = 1) \
         ORDER BY u.name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Active agents free to join: not an active member of any active team.
pub async fn available_agents(pool: &SqlitePool) -> AppResult<Vec<UserListItem>> {
    let rows = sqlx::query_as::<_, UserListItem>(
        "SELECT u.id, u.name, u.email, r.name AS role_name, u.is_active, c.name AS created_by_name \
         FROM user u \
         JOIN role r ON r.id = u.role_id \
         LEFT JOIN user c ON c.id = u.created_by \
         WHERE u.is_active = 1 \
           AND (u.role_id = 3 OR EXISTS ( \
                SELECT 1 FROM user_role ur WHERE ur.user_id = u.id AND ur.role_id = 3 AND ur.is_active = 1)) \
           AND NOT EXISTS ( \
                SELECT 1 FROM team_member tm JOIN team t ON t.id = tm.team_id \
                WHERE tm.member_id = u.id AND tm.is_active = 1 AND t.is_active = 1) \
         ORDER BY u.name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Resolves the row-level reach of a subject: the team they manage and its
/// active member ids. Subjects who manage nothing get an empty scope.
pub async fn team_scope(pool: &SqlitePool, subject_id: i64) -> AppResult<TeamScope> {
    let team_id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM team WHERE manager_id = ? AND is_active = 1")
            .bind(subject_id)
            .fetch_optional(pool)
            .await?;

    let Some(team_id) = team_id else {
        return Ok(TeamScope::new());
    };

    let member_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT member_id FROM team_member WHERE team_id = ? AND is_active = 1",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(TeamScope::new().with_team(team_id, member_ids))
}
