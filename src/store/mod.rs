//! EntityStore: CRUD over the persisted back-office rows. Every mutating
//! operation opens one transaction, runs its guard checks inside it, mutates,
//! and commits; pre-checks done elsewhere are advisory only.

pub mod crafts;
pub mod deletion;
pub mod guard;
pub mod teams;
pub mod tickets;
pub mod users;
