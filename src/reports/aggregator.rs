use std::collections::{HashMap, HashSet};

use crate::models::report::{DateMode, ReportFilter, ReportRow, ReportTotals};
use crate::models::ticket::Ticket;

/// Names and relations the aggregator needs that are not on the ticket row
/// itself. The store assembles this once per report request.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub craft_names: HashMap<i64, String>,
    pub specialty_names: HashMap<i64, String>,
    /// Creator id -> team id, resolved via active membership or, failing
    /// that, the team the creator manages.
    pub team_of_creator: HashMap<i64, i64>,
    /// Creator id -> manager id of that team.
    pub manager_of_creator: HashMap<i64, i64>,
}

fn matches_text(ticket: &Ticket, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    ticket.customer_name.to_lowercase().contains(&needle)
        || ticket.customer_phone.to_lowercase().contains(&needle)
        || ticket
            .problem_desc
            .as_deref()
            .map(|d| d.to_lowercase().contains(&needle))
            .unwrap_or(false)
}

fn matches(ticket: &Ticket, filter: &ReportFilter, ctx: &ReportContext) -> bool {
    if let Some(text) = filter.text.as_deref() {
        if !text.trim().is_empty() && !matches_text(ticket, text.trim()) {
            return false;
        }
    }
    if let Some(paid) = filter.payment_status {
        if ticket.is_paid != paid {
            return false;
        }
    }
    if !filter.craft_ids.is_empty() && !filter.craft_ids.contains(&ticket.craft_id) {
        return false;
    }
    if !filter.creator_ids.is_empty() && !filter.creator_ids.contains(&ticket.created_by) {
        return false;
    }
    if !filter.team_ids.is_empty() {
        match ctx.team_of_creator.get(&ticket.created_by) {
            Some(team_id) if filter.team_ids.contains(team_id) => {}
            _ => return false,
        }
    }

    let stamp = match filter.date_mode {
        DateMode::Created => Some(ticket.created_at),
        DateMode::Updated => Some(ticket.updated_at),
        DateMode::None => None,
    };
    if let Some(stamp) = stamp {
        if let Some(from) = filter.date_from {
            if stamp < from {
                return false;
            }
        }
        if let Some(to) = filter.date_to {
            if stamp > to {
                return false;
            }
        }
    }

    true
}

/// The filtered ticket set itself: every filter axis applied, duplicates
/// dropped, ordered by ticket id descending. A specialty filter excludes
/// tickets with no matching specialty. This is the set the commission
/// calculator consumes.
pub fn selected(tickets: &[Ticket], filter: &ReportFilter, ctx: &ReportContext) -> Vec<Ticket> {
    let specialty_filter: HashSet<i64> = filter.specialty_ids.iter().copied().collect();

    let mut kept: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| matches(t, filter, ctx))
        .filter(|t| {
            specialty_filter.is_empty() || t.specialty_ids.iter().any(|id| specialty_filter.contains(id))
        })
        .collect();
    kept.sort_by(|a, b| b.id.cmp(&a.id));
    kept.dedup_by_key(|t| t.id);

    kept.into_iter().cloned().collect()
}

/// Shapes the filtered set into long-form rows: one row per (ticket, matched
/// specialty); a ticket without specialties yields a single bare row unless a
/// specialty filter is active. Ordering is deterministic: ticket id
/// descending, specialty id ascending.
pub fn aggregate(tickets: &[Ticket], filter: &ReportFilter, ctx: &ReportContext) -> Vec<ReportRow> {
    let specialty_filter: HashSet<i64> = filter.specialty_ids.iter().copied().collect();

    let kept = selected(tickets, filter, ctx);
    let mut rows = Vec::new();
    for ticket in &kept {
        let matched: Vec<i64> = if specialty_filter.is_empty() {
            ticket.specialty_ids.iter().copied().collect()
        } else {
            ticket
                .specialty_ids
                .iter()
                .copied()
                .filter(|id| specialty_filter.contains(id))
                .collect()
        };

        if matched.is_empty() {
            if specialty_filter.is_empty() {
                rows.push(row_for(ticket, None, ctx));
            }
            continue;
        }

        // BTreeSet iteration keeps specialty ids ascending.
        for specialty_id in matched {
            rows.push(row_for(ticket, Some(specialty_id), ctx));
        }
    }

    rows
}

fn row_for(ticket: &Ticket, specialty_id: Option<i64>, ctx: &ReportContext) -> ReportRow {
    ReportRow {
        ticket_id: ticket.id,
        customer_name: ticket.customer_name.clone(),
        customer_phone: ticket.customer_phone.clone(),
        craft_id: ticket.craft_id,
        craft_name: ctx.craft_names.get(&ticket.craft_id).cloned(),
        specialty_id,
        specialty_name: specialty_id.and_then(|id| ctx.specialty_names.get(&id).cloned()),
        is_paid: ticket.is_paid,
        amount: ticket.amount,
        created_by: ticket.created_by,
        team_id: ctx.team_of_creator.get(&ticket.created_by).copied(),
        created_at: ticket.created_at,
    }
}

/// Totals over the distinct tickets behind a row set.
pub fn totals(rows: &[ReportRow]) -> ReportTotals {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut out = ReportTotals::default();
    for row in rows {
        if seen.insert(row.ticket_id) {
            out.tickets += 1;
            if row.is_paid {
                out.paid_tickets += 1;
            }
            out.total_amount += row.amount;
        }
    }
    out
}
