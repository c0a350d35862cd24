pub mod auth;
pub mod crafts;
pub mod health;
pub mod reports;
pub mod teams;
pub mod tickets;
pub mod users;
