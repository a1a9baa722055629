//! API handlers.

pub mod access;
pub mod health;
pub mod maintenance;
pub mod payments;
pub mod purchases;
pub mod users;
