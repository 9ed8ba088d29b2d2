//! Expensia: a personal-finance tracker.
//!
//! The server side is a JSON REST auth service (registration, login, and a
//! single-use password-reset email flow) backed by Postgres. The
//! [`ledger`] module is the client-side transaction ledger as a library:
//! per-user transaction storage with category and monthly aggregations.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod mailer;
pub mod state;
pub mod store;
