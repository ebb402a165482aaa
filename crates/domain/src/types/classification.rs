//! Query-language AST and classifier outcome types.
//!
//! The AST is a tagged variant (`Expr`) rather than stringly-typed, so the
//! evaluator never re-parses a value at match time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    Title,
    Description,
    Attendees,
    Text,
    Domain,
    Email,
    Calendar,
    Response,
    Recurring,
    IsAllDay,
    HasAttendees,
    Transparency,
    DayOfWeek,
    TimeOfDay,
    Status,
    Project,
    Confidence,
}

impl Field {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Self::Title,
            "description" => Self::Description,
            "attendees" => Self::Attendees,
            "text" => Self::Text,
            "domain" => Self::Domain,
            "email" => Self::Email,
            "calendar" => Self::Calendar,
            "response" => Self::Response,
            "recurring" => Self::Recurring,
            "is-all-day" => Self::IsAllDay,
            "has-attendees" => Self::HasAttendees,
            "transparency" => Self::Transparency,
            "day-of-week" => Self::DayOfWeek,
            "time-of-day" => Self::TimeOfDay,
            "status" => Self::Status,
            "project" => Self::Project,
            "confidence" => Self::Confidence,
            _ => return None,
        })
    }
}

/// Comparison operator for ordered fields (`time-of-day`, `confidence`).
/// String/boolean fields only ever use `Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

/// A literal term value as parsed, before it is interpreted against a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Bool(bool),
    Time { hour: u32, minute: u32 },
    Number(f64),
}

/// Boolean query AST. `And`/`Or` hold at least two operands; `Not` wraps a
/// single operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Term { field: Field, op: Op, value: Value },
}

/// Outcome of classifying a single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassificationOutcome {
    Skipped {
        confidence: f64,
    },
    Classified {
        winner_target_id: Uuid,
        confidence: f64,
        needs_review: bool,
        source: crate::types::calendar::ClassificationSource,
    },
    Unclassified,
}

/// Per-rule evaluation detail and per-target score totals, returned
/// alongside every classification decision for explainability.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClassificationExplanation {
    pub rule_matches: Vec<RuleMatch>,
    pub target_scores: Vec<TargetScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: Uuid,
    pub matched: bool,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetScore {
    pub project_id: Uuid,
    pub rule_weight: f64,
    pub fingerprint_weight: f64,
}

impl TargetScore {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.rule_weight + self.fingerprint_weight
    }
}
