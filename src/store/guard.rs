use sqlx::SqliteConnection;

use crate::authz::RoleName;
use crate::errors::{AppError, AppResult, ViolationKind};

/// Team or membership writes the guard knows how to validate.
#[derive(Debug, Clone)]
pub enum TeamWrite<'a> {
    CreateTeam { name: &'a str, manager_id: i64 },
    RenameTeam { team_id: i64, name: &'a str },
    ChangeManager { team_id: i64, manager_id: i64 },
    AddMember { team_id: i64, member_id: i64 },
}

/// Validates a team-shaped write against the membership invariants. Must run
/// on the same connection as the mutation so check-then-act stays atomic.
pub async fn validate(conn: &mut SqliteConnection, op: &TeamWrite<'_>) -> AppResult<()> {
    match op {
        TeamWrite::CreateTeam { name, manager_id } => {
            ensure_name_free(conn, name, None).await?;
            ensure_manager_role(conn, *manager_id).await?;
            ensure_manager_unclaimed(conn, *manager_id, None).await?;
        }
        TeamWrite::RenameTeam { team_id, name } => {
            ensure_name_free(conn, name, Some(*team_id)).await?;
        }
        TeamWrite::ChangeManager { team_id, manager_id } => {
            ensure_manager_role(conn, *manager_id).await?;
            // The current row is excluded so re-saving the same manager is a no-op.
            ensure_manager_unclaimed(conn, *manager_id, Some(*team_id)).await?;
            ensure_not_member_of(conn, *team_id, *manager_id).await?;
        }
        TeamWrite::AddMember { team_id, member_id } => {
            ensure_agent_role(conn, *member_id).await?;
            ensure_member_unclaimed(conn, *member_id).await?;
            ensure_not_manager_of(conn, *team_id, *member_id).await?;
        }
    }
    Ok(())
}

async fn ensure_name_free(conn: &mut SqliteConnection, name: &str, exclude_team: Option<i64>) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM team WHERE lower(name) = lower(?) AND is_active = 1 AND id != ?",
    )
    .bind(name)
    .bind(exclude_team.unwrap_or(-1))
    .fetch_one(conn)
    .await?;

    if count > 0 {
        return Err(AppError::conflict("team name already in use"));
    }
    Ok(())
}

/// True when the user is active and carries the role, either via the cached
/// column or an active assignment row.
async fn holds_active_role(conn: &mut SqliteConnection, user_id: i64, role: RoleName) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM user u \
         WHERE u.id = ? AND u.is_active = 1 \
           AND (u.role_id = ? OR EXISTS ( \
                SELECT 1 FROM user_role ur \
                WHERE ur.user_id = u.id AND ur.role_id = ? AND ur.is_active = 1))",
    )
    .bind(user_id)
    .bind(role.id())
    .bind(role.id())
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

async fn ensure_manager_role(conn: &mut SqliteConnection, user_id: i64) -> AppResult<()> {
    if !holds_active_role(conn, user_id, RoleName::Manager).await? {
        return Err(AppError::violation(
            ViolationKind::InvalidManagerRole,
            "user is not an active manager",
        ));
    }
    Ok(())
}

async fn ensure_agent_role(conn: &mut SqliteConnection, user_id: i64) -> AppResult<()> {
    if !holds_active_role(conn, user_id, RoleName::Agent).await? {
        return Err(AppError::violation(
            ViolationKind::InvalidMemberRole,
            "user is not an active agent",
        ));
    }
    Ok(())
}

async fn ensure_manager_unclaimed(conn: &mut SqliteConnection, manager_id: i64, exclude_team: Option<i64>) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM team WHERE manager_id = ? AND is_active = 1 AND id != ?",
    )
    .bind(manager_id)
    .bind(exclude_team.unwrap_or(-1))
    .fetch_one(conn)
    .await?;

    if count > 0 {
        return Err(AppError::violation(
            ViolationKind::ManagerBusy,
            "manager already leads an active team",
        ));
    }
    Ok(())
}

async fn ensure_member_unclaimed(conn: &mut SqliteConnection, member_id: i64) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM team_member tm \
         JOIN team t ON t.id = tm.team_id \
         WHERE tm.member_id = ? AND tm.is_active = 1 AND t.is_active = 1",
    )
    .bind(member_id)
    .fetch_one(conn)
    .await?;

    if count > 0 {
        return Err(AppError::violation(
            ViolationKind::AgentBusy,
            "agent already belongs to an active team",
        ));
    }
    Ok(())
}

async fn ensure_not_member_of(conn: &mut SqliteConnection, team_id: i64, user_id: i64) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM team_member WHERE team_id = ? AND member_id = ? AND is_active = 1",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    if count > 0 {
        return Err(AppError::violation(
            ViolationKind::ManagerIsMember,
            "manager cannot also be a member of the team",
        ));
    }
    Ok(())
}

async fn ensure_not_manager_of(conn: &mut SqliteConnection, team_id: i64, user_id: i64) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM team WHERE id = ? AND manager_id = ? AND is_active = 1",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    if count > 0 {
        return Err(AppError::violation(
            ViolationKind::ManagerIsMember,
            "team manager cannot be added as a member",
        ));
    }
    Ok(())
}
