//! # Chronarc Core
//!
//! Pure business logic layer — no infrastructure dependencies.
//!
//! This crate contains:
//! - The query language (parser + evaluator).
//! - The weighted-vote classifier and its repository-backed service.
//! - The sync planner (pure decision function).
//! - The ephemeral time-entry engine.
//! - Port traits describing the capabilities these depend on; concrete
//!   adapters live in `chronarc-infra`.
//!
//! ## Architecture Principles
//! - Only depends on `chronarc-domain`.
//! - No database, HTTP, or scheduling code.
//! - All external dependencies via traits (`ports`).

pub mod classification;
pub mod ports;
pub mod query;
pub mod sync;
pub mod time_entries;

pub use classification::{ApplyRulesOutcome, BulkClassifyOutcome, ClassificationService, PreviewOutcome};
pub use ports::{
    CalendarProvider, CalendarRepository, ConnectionRepository, EventRepository,
    ProjectRepository, RuleRepository, SyncJobRepository, TimeEntryRepository,
};
pub use sync::{plan_sync, SyncDecision, SyncReason};
pub use time_entries::TimeEntryService;
