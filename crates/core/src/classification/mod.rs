//! Weighted-vote classifier (§4.2): the pure scoring engine plus the
//! repository-backed service implementing `apply_rules` and `preview`.

pub mod engine;
pub mod service;

pub use engine::classify;
pub use service::{ApplyRulesOutcome, BulkClassifyOutcome, ClassificationService, PreviewOutcome};
