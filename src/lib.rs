//! Outpost Agent Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.
//!
//! The agent registers itself with a shared backing store, then runs a
//! polling loop: claim pending jobs addressed to this agent, execute each
//! job's script, append a log record with the captured output, and advance
//! the job's lifecycle state.

pub mod config;
pub mod error;
pub mod executor;
pub mod poller;
pub mod recorder;
pub mod registrar;
pub mod retry;
pub mod runner;
pub mod scheduler;
/// Backing-store access
///
/// Record types, the `StoreClient` trait, and the HTTP implementation.
pub mod store;
