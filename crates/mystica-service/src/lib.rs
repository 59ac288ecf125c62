//! Mystica economy HTTP API service.
//!
//! This crate exposes the economy components over HTTP:
//!
//! - Currency balances and the transaction trail
//! - Credits, debits and affordability checks
//! - Idempotent reward application
//! - Instant loot collection
//!
//! Requests are not authenticated; the service is meant to sit behind the
//! game backend, which owns player identity.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers call the synchronous store

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
