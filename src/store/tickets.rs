use std::collections::BTreeSet;

use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::{AppError, AppResult, ViolationKind};
use crate::models::ticket::{join_id_list, DbProblem, Ticket, TicketCreateRequest, TicketUpdateRequest};
use crate::reports::aggregator::ReportContext;
use crate::utils::utc_now;

/// I8: payment flag and amount move together.
fn validate_payment(is_paid: bool, amount: i64) -> AppResult<()> {
    if is_paid && amount <= 0 {
        return Err(AppError::violation(
            ViolationKind::InvalidPayment,
            "paid tickets require a positive amount",
        ));
    }
    if !is_paid && amount != 0 {
        return Err(AppError::violation(
            ViolationKind::InvalidPayment,
            "unpaid tickets must carry a zero amount",
        ));
    }
    Ok(())
}

/// I7: every attached specialty belongs to the ticket's craft.
async fn validate_specialties(conn: &mut SqliteConnection, craft_id: i64, specialty_ids: &BTreeSet<i64>) -> AppResult<()> {
    let craft_exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM craft WHERE id = ? AND is_active = 1")
        .bind(craft_id)
        .fetch_one(&mut *conn)
        .await?;
    if craft_exists == 0 {
        return Err(AppError::not_found("craft not found"));
    }

    for specialty_id in specialty_ids {
        let belongs: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM speciality WHERE id = ? AND craft_id = ? AND is_active = 1",
        )
        .bind(specialty_id)
        .bind(craft_id)
        .fetch_one(&mut *conn)
        .await?;

        if belongs == 0 {
            return Err(AppError::violation(
                ViolationKind::InvalidSpecialty,
                format!("specialty {specialty_id} does not belong to craft {craft_id}"),
            ));
        }
    }
    Ok(())
}

pub async fn create_problem(pool: &SqlitePool, req: &TicketCreateRequest, creator: i64) -> AppResult<Ticket> {
    validate_payment(req.is_paid, req.amount)?;
    let specialty_ids: BTreeSet<i64> = req.specialty_ids.iter().copied().collect();

    let mut tx = pool.begin().await?;
    validate_specialties(&mut tx, req.craft_id, &specialty_ids).await?;

    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO problems (customer_name, customer_phone, problem_desc, is_paid, amount, craft_ids, speciality_ids, is_active, created_by, updated_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
    )
    .bind(&req.customer_name)
    .bind(&req.customer_phone)
    .bind(&req.problem_desc)
    .bind(req.is_paid as i64)
    .bind(req.amount)
    .bind(req.craft_id.to_string())
    .bind(join_id_list(&specialty_ids))
    .bind(creator)
    .bind(creator)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let ticket = fetch_problem(&mut tx, result.last_insert_rowid()).await?;
    tx.commit().await?;

    ticket.try_into()
}

pub async fn update_problem(pool: &SqlitePool, id: i64, patch: &TicketUpdateRequest, actor: Option<i64>) -> AppResult<Ticket> {
    let mut tx = pool.begin().await?;
    let row = fetch_problem(&mut tx, id).await?;
    let mut ticket: Ticket = row.try_into()?;

    if let Some(customer_name) = patch.customer_name.as_ref() {
        ticket.customer_name = customer_name.clone();
    }
    if let Some(customer_phone) = patch.customer_phone.as_ref() {
        ticket.customer_phone = customer_phone.clone();
    }
    if patch.problem_desc.is_some() {
        ticket.problem_desc = patch.problem_desc.clone();
    }
    if let Some(is_paid) = patch.is_paid {
        ticket.is_paid = is_paid;
    }
    if let Some(amount) = patch.amount {
        ticket.amount = amount;
    }
    if let Some(craft_id) = patch.craft_id {
        ticket.craft_id = craft_id;
    }
    if let Some(specialty_ids) = patch.specialty_ids.as_ref() {
        ticket.specialty_ids = specialty_ids.iter().copied().collect();
    }

    // The merged state must satisfy the ticket invariants, not just the patch.
    validate_payment(ticket.is_paid, ticket.amount)?;
    validate_specialties(&mut tx, ticket.craft_id, &ticket.specialty_ids).await?;

    let now = utc_now();
    sqlx::query(
        "UPDATE problems SET customer_name = ?, customer_phone = ?, problem_desc = ?, is_paid = ?, amount = ?, \
         craft_ids = ?, speciality_ids = ?, updated_by = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&ticket.customer_name)
    .bind(&ticket.customer_phone)
    .bind(&ticket.problem_desc)
    .bind(ticket.is_paid as i64)
    .bind(ticket.amount)
    .bind(ticket.craft_id.to_string())
    .bind(join_id_list(&ticket.specialty_ids))
    .bind(actor)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    ticket.updated_at = now;
    ticket.updated_by = actor;
    tx.commit().await?;

    Ok(ticket)
}

/// Hard delete; row-level authority is the caller's responsibility.
pub async fn delete_problem(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let affected = sqlx::query("DELETE FROM problems WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("ticket not found"));
    }
    Ok(())
}

async fn fetch_problem(conn: &mut SqliteConnection, id: i64) -> AppResult<DbProblem> {
    sqlx::query_as::<_, DbProblem>(
        "SELECT id, customer_name, customer_phone, problem_desc, is_paid, amount, craft_ids, speciality_ids, is_active, created_by, updated_by, created_at, updated_at \
         FROM problems WHERE id = ? AND is_active = 1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("ticket not found"))
}

pub async fn get_problem(pool: &SqlitePool, id: i64) -> AppResult<Ticket> {
    let mut conn = pool.acquire().await?;
    fetch_problem(&mut conn, id).await?.try_into()
}

pub async fn list_problems(pool: &SqlitePool) -> AppResult<Vec<Ticket>> {
    let rows = sqlx::query_as::<_, DbProblem>(
        "SELECT id, customer_name, customer_phone, problem_desc, is_paid, amount, craft_ids, speciality_ids, is_active, created_by, updated_by, created_at, updated_at \
         FROM problems WHERE is_active = 1 ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Ticket::try_from).collect()
}

/// Assembles the lookup tables the report aggregator and the commission
/// calculator need: taxonomy names plus creator -> team/manager resolution
/// (active membership first, then the team the creator manages).
pub async fn report_context(pool: &SqlitePool) -> AppResult<ReportContext> {
    let mut ctx = ReportContext::default();

    let crafts: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM craft")
        .fetch_all(pool)
        .await?;
    ctx.craft_names = crafts.into_iter().collect();

    let specialties: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM speciality")
        .fetch_all(pool)
        .await?;
    ctx.specialty_names = specialties.into_iter().collect();

    let memberships: Vec<(i64, i64, i64)> = sqlx::query_as(
        "SELECT tm.member_id, tm.team_id, t.manager_id \
         FROM team_member tm JOIN team t ON t.id = tm.team_id \
         WHERE tm.is_active = 1 AND t.is_active = 1",
    )
    .fetch_all(pool)
    .await?;
    for (member_id, team_id, manager_id) in memberships {
        ctx.team_of_creator.insert(member_id, team_id);
        ctx.manager_of_creator.insert(member_id, manager_id);
    }

    let managed: Vec<(i64, i64)> = sqlx::query_as("SELECT manager_id, id FROM team WHERE is_active = 1")
        .fetch_all(pool)
        .await?;
    for (manager_id, team_id) in managed {
        ctx.team_of_creator.entry(manager_id).or_insert(team_id);
        ctx.manager_of_creator.entry(manager_id).or_insert(manager_id);
    }

    Ok(ctx)
}
