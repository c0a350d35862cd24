use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::report::{AgentCommission, CommissionReport, ManagerCommission};
use crate::models::ticket::Ticket;

/// Commission constants, integer naira. Fixed org-wide, not per-team.
pub const AGENT_RATE_PERCENT: i64 = 3;
pub const AGENT_CAP: i64 = 1500;
pub const MANAGER_THRESHOLD: i64 = 20000;
pub const MANAGER_FEE: i64 = 150;

/// Integer division rounding half to even, used for the single multiplicative
/// step so cap-boundary amounts don't drift.
fn div_round_half_even(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(denominator > 0 && numerator >= 0);
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    match (remainder * 2).cmp(&denominator) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

/// Per-ticket agent payable: 3% of the amount, capped. Unpaid or non-positive
/// amounts contribute nothing.
pub fn agent_commission(ticket: &Ticket) -> i64 {
    if !ticket.is_paid || ticket.amount <= 0 {
        return 0;
    }
    div_round_half_even(ticket.amount * AGENT_RATE_PERCENT, 100).min(AGENT_CAP)
}

/// Per-ticket manager payable: a flat fee once the paid amount clears the
/// threshold.
pub fn manager_fee(ticket: &Ticket) -> i64 {
    if ticket.is_paid && ticket.amount >= MANAGER_THRESHOLD {
        MANAGER_FEE
    } else {
        0
    }
}

/// Derives payables over an already-filtered ticket set, deduplicated by
/// ticket id. `manager_of_creator` maps a ticket creator to the manager of
/// the team that creator belongs to; tickets whose creator has no team credit
/// no manager.
pub fn calculate(tickets: &[Ticket], manager_of_creator: &HashMap<i64, i64>) -> CommissionReport {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut by_agent: BTreeMap<i64, AgentCommission> = BTreeMap::new();
    let mut by_manager: BTreeMap<i64, ManagerCommission> = BTreeMap::new();

    for ticket in tickets {
        if !seen.insert(ticket.id) {
            continue;
        }

        let entry = by_agent.entry(ticket.created_by).or_insert(AgentCommission {
            agent_id: ticket.created_by,
            tickets: 0,
            total_amount: 0,
            commission: 0,
        });
        entry.tickets += 1;
        entry.total_amount += ticket.amount;
        entry.commission += agent_commission(ticket);

        let fee = manager_fee(ticket);
        if fee > 0 {
            if let Some(&manager_id) = manager_of_creator.get(&ticket.created_by) {
                let entry = by_manager.entry(manager_id).or_insert(ManagerCommission {
                    manager_id,
                    eligible_tickets: 0,
                    commission: 0,
                });
                entry.eligible_tickets += 1;
                entry.commission += fee;
            }
        }
    }

    let agent_total = by_agent.values().map(|a| a.commission).sum();
    let manager_total = by_manager.values().map(|m| m.commission).sum();

    CommissionReport {
        agents: by_agent.into_values().collect(),
        managers: by_manager.into_values().collect(),
        agent_total,
        manager_total,
    }
}
