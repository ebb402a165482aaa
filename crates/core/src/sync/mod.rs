//! Sync planner (§4.3). The executor that carries out a [`SyncDecision`]
//! against a real provider lives in `chronarc-infra::sync::executor`.

pub mod planner;

pub use planner::{default_initial_window, missing_weeks, plan_sync, week_start, SyncDecision, SyncReason};
