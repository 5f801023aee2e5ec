//! Weather alert poller service.
//!
//! Polls the upstream CAP feed on a fixed interval, keeps the latest alert
//! set in memory and serves it over HTTP.

pub mod config;
pub mod scheduler;
pub mod server;
pub mod state;

pub use config::PollerConfig;
pub use scheduler::Scheduler;
pub use server::{create_router, run_server, ServerState};
pub use state::{AlertSnapshot, AlertStore, CycleRecord, CycleStatus};
