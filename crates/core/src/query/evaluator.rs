//! Pure evaluator: `matches(context, &Expr) -> bool`.

use chrono::{Datelike, Timelike};
use chronarc_domain::types::calendar::CalendarEvent;
use chronarc_domain::types::classification::{Expr, Field, Op, Value};

/// Everything the evaluator needs beyond the event itself: fields that live
/// on related entities (calendar display name, assigned project name) rather
/// than on the event row.
pub struct QueryContext<'a> {
    pub event: &'a CalendarEvent,
    pub calendar_name: &'a str,
    pub project_name: Option<&'a str>,
}

/// Evaluate a parsed query against an event. Pure and deterministic:
/// `O(|event fields| * |query nodes|)`.
#[must_use]
pub fn matches(ctx: &QueryContext<'_>, expr: &Expr) -> bool {
    match expr {
        Expr::And(operands) => operands.iter().all(|e| matches(ctx, e)),
        Expr::Or(operands) => operands.iter().any(|e| matches(ctx, e)),
        Expr::Not(inner) => !matches(ctx, inner),
        Expr::Term { field, op, value } => matches_term(ctx, *field, *op, value),
    }
}

fn matches_term(ctx: &QueryContext<'_>, field: Field, op: Op, value: &Value) -> bool {
    let event = ctx.event;
    match field {
        Field::Title => text_contains(&event.title, value),
        Field::Description => text_contains(&event.description, value),
        Field::Attendees => event.attendees.iter().any(|a| text_contains(&a.email, value)),
        Field::Text => {
            text_contains(&event.title, value)
                || text_contains(&event.description, value)
                || event.attendees.iter().any(|a| text_contains(&a.email, value))
        }
        Field::Domain => {
            let Value::Text(domain) = value else { return false };
            event.attendee_domains().iter().any(|d| d.eq_ignore_ascii_case(domain))
        }
        Field::Email => {
            let Value::Text(email) = value else { return false };
            event.attendees.iter().any(|a| a.email.eq_ignore_ascii_case(email))
        }
        Field::Calendar => text_contains(ctx.calendar_name, value),
        Field::Response => {
            let Value::Text(expected) = value else { return false };
            event.response_status.to_string().eq_ignore_ascii_case(expected)
        }
        Field::Recurring => {
            let Value::Bool(expected) = value else { return false };
            event.is_recurring == *expected
        }
        Field::IsAllDay => {
            let Value::Bool(expected) = value else { return false };
            is_all_day(event) == *expected
        }
        Field::HasAttendees => {
            let Value::Bool(expected) = value else { return false };
            (!event.attendees.is_empty()) == *expected
        }
        Field::Transparency => {
            let Value::Text(expected) = value else { return false };
            event.transparency.to_string().eq_ignore_ascii_case(expected)
        }
        Field::DayOfWeek => {
            let Value::Text(expected) = value else { return false };
            day_of_week_name(event).eq_ignore_ascii_case(expected)
        }
        Field::TimeOfDay => {
            let Value::Time { hour, minute } = value else { return false };
            let start_minutes = event.start.time().hour() * 60 + event.start.time().minute();
            let target_minutes = hour * 60 + minute;
            compare(start_minutes as f64, op, target_minutes as f64)
        }
        Field::Status => {
            let Value::Text(expected) = value else { return false };
            event.classification_status.to_string().eq_ignore_ascii_case(expected)
        }
        Field::Project => {
            let Value::Text(expected) = value else { return false };
            ctx.project_name
                .map(|name| name.to_ascii_lowercase().contains(&expected.to_ascii_lowercase()))
                .unwrap_or(false)
        }
        Field::Confidence => {
            let Value::Number(expected) = value else { return false };
            let confidence = event.classification_confidence.unwrap_or(0.0);
            compare(confidence, op, *expected)
        }
    }
}

fn text_contains(haystack: &str, value: &Value) -> bool {
    let Value::Text(needle) = value else { return false };
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

fn compare(lhs: f64, op: Op, rhs: f64) -> bool {
    match op {
        Op::Lt => lhs < rhs,
        Op::Le => lhs <= rhs,
        Op::Eq => (lhs - rhs).abs() < f64::EPSILON,
        Op::Ge => lhs >= rhs,
        Op::Gt => lhs > rhs,
    }
}

fn is_all_day(event: &CalendarEvent) -> bool {
    let start = event.start.time();
    let end = event.end.time();
    start.hour() == 0
        && start.minute() == 0
        && start.second() == 0
        && end.hour() == 0
        && end.minute() == 0
        && end.second() == 0
        && event.end.date_naive() > event.start.date_naive()
}

fn day_of_week_name(event: &CalendarEvent) -> &'static str {
    use chrono::Weekday::{Fri, Mon, Sat, Sun, Thu, Tue, Wed};
    match event.start.weekday() {
        Mon => "mon",
        Tue => "tue",
        Wed => "wed",
        Thu => "thu",
        Fri => "fri",
        Sat => "sat",
        Sun => "sun",
    }
}
