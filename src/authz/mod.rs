//! Authorization module - role matrix and row-level authority
//!
//! This module implements the RBAC engine:
//! - Static per-page, per-action role matrix ([`registry`])
//! - Pure allow/deny evaluation with target-scoped refinements ([`evaluator`])
//! - Row-level ticket filtering ([`ticket_filter`])

mod evaluator;
mod registry;
mod subject;
pub mod ticket_filter;

pub use evaluator::PermissionEvaluator;
pub use registry::{Action, Page, RoleName, RoleRegistry};
pub use subject::{Subject, TeamScope};
pub use ticket_filter::TicketAction;
