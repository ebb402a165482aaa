//! Domain entities: calendar connections/calendars/events, projects and
//! classification rules, time entries, and the query/classifier AST types.

pub mod calendar;
pub mod classification;
pub mod project;
pub mod time_entry;

pub use calendar::{
    Attendee, Calendar, CalendarConnection, CalendarEvent, ClassificationSource,
    ClassificationStatus, JobType, ResponseStatus, SyncJob, Transparency,
};
pub use classification::{
    ClassificationExplanation, ClassificationOutcome, Expr, Field, Op, RuleMatch, TargetScore,
    Value,
};
pub use project::{ClassificationRule, Project};
pub use time_entry::{ComputedEntry, MaterialisedState, TimeEntry};
