use super::registry::RoleName;
use super::subject::{Subject, TeamScope};
use crate::models::ticket::Ticket;

/// Row-level ticket operations the filter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAction {
    View,
    Edit,
    Delete,
}

/// Whether `subject` may perform `action` on a single ticket. All roles carry
/// `can_view_all` on the ticket page, so viewing is unrestricted; edit and
/// delete narrow to the subject's own rows or, for a manager, the rows
/// authored by their managed team.
pub fn authorized(subject: &Subject, scope: &TeamScope, ticket: &Ticket, action: TicketAction) -> bool {
    match action {
        TicketAction::View => true,
        TicketAction::Edit | TicketAction::Delete => {
            if subject.is_admin() {
                return true;
            }
            if subject.has_role(RoleName::Manager) && scope.covers(ticket.created_by) {
                return true;
            }
            subject.has_role(RoleName::Agent) && ticket.created_by == subject.id
        }
    }
}

/// Pure set filter over a fetched ticket collection.
pub fn filter(subject: &Subject, scope: &TeamScope, tickets: Vec<Ticket>, action: TicketAction) -> Vec<Ticket> {
    tickets
        .into_iter()
        .filter(|ticket| authorized(subject, scope, ticket, action))
        .collect()
}
