//! Kurspay HTTP API Service.
//!
//! This crate provides the HTTP API for the kurspay course-payment backend,
//! including:
//!
//! - Purchase initiation and course-access lookup
//! - Admin payment review (confirm/reject)
//! - The scheduled expiry sweeper and its manual trigger
//! - Per-actor rate limiting for public actions
//!
//! # Authentication
//!
//! End users authenticate with JWT tokens validated against the auth
//! provider's JWKS endpoint. Admin endpoints additionally require the
//! caller's stored role to be `Admin` (or membership in the configured
//! bootstrap list).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing consistency

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use mailer::{Mailer, MailerError};
pub use routes::create_router;
pub use state::AppState;
