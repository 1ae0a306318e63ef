// AI Filtering Orchestration
// Implements: request guard, job tracking with status polling, per-ticket state, facade.
// All backend calls go through backend_client; nothing here builds URLs or headers.

pub mod context;
pub mod error;
pub mod fetch;
pub mod guard;
pub mod handlers;
pub mod orchestrator;
pub mod poller;
pub mod status;
pub mod tracker;
