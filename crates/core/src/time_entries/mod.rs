//! Ephemeral time-entry engine (§4.7).

pub mod engine;
pub mod service;

pub use engine::{compute_entry, list_entries, round_to_quarter_hour};
pub use service::TimeEntryService;
