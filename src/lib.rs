//! Terminal dashboard and CLI for a service registry.
//!
//! Lists registered clients, starts, stops and deletes them, registers new
//! ones and streams their logs. The registry behind the HTTP API is the only
//! source of truth; every mutating action is followed by a full list reload.

pub mod app;
pub mod cli;
pub mod core;
pub mod screens;
pub mod utils;
