//! Ephemeral time-entry computation (§4.7): union-of-intervals hour
//! computation and the materialised/ephemeral merge. Both pure functions —
//! no I/O, easy to exercise exhaustively.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chronarc_domain::constants::HOUR_ROUNDING_INCREMENT;
use chronarc_domain::types::calendar::{CalendarEvent, ClassificationStatus};
use chronarc_domain::types::time_entry::{ComputedEntry, TimeEntry};
use uuid::Uuid;

/// Compute a `(project, date)` entry from the events eligible to contribute:
/// classified to `project_id`, starting on `date` (UTC), not orphaned or
/// suppressed.
#[must_use]
pub fn compute_entry(events: &[CalendarEvent], project_id: Uuid, date: NaiveDate) -> Option<ComputedEntry> {
    let mut contributing: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| {
            e.start.date_naive() == date
                && e.classification_status == ClassificationStatus::Classified
                && e.project_id == Some(project_id)
                && e.is_eligible()
        })
        .collect();

    if contributing.is_empty() {
        return None;
    }

    contributing.sort_by_key(|e| e.start);

    let hours = round_to_quarter_hour(union_duration_hours(&contributing));

    let mut seen_titles = std::collections::HashSet::new();
    let title = contributing
        .iter()
        .filter(|e| seen_titles.insert(e.title.clone()))
        .map(|e| e.title.clone())
        .collect::<Vec<_>>()
        .join(", ");

    let description = contributing
        .iter()
        .map(|e| e.description.clone())
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let contributing_events = contributing.iter().map(|e| e.id).collect();

    Some(ComputedEntry { project_id, date, hours, title, description, contributing_events })
}

/// Sum of non-overlapping durations across a project's events on one day,
/// in hours, before rounding.
fn union_duration_hours(events: &[&CalendarEvent]) -> f64 {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        events.iter().map(|e| (e.start, e.end)).collect();
    intervals.sort_by_key(|(start, _)| *start);

    let mut total = chrono::Duration::zero();
    let mut current: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    for (start, end) in intervals {
        current = match current {
            None => Some((start, end)),
            Some((cur_start, cur_end)) => {
                if start <= cur_end {
                    Some((cur_start, cur_end.max(end)))
                } else {
                    total = total + (cur_end - cur_start);
                    Some((start, end))
                }
            }
        };
    }
    if let Some((start, end)) = current {
        total = total + (end - start);
    }

    total.num_seconds() as f64 / 3600.0
}

#[must_use]
pub fn round_to_quarter_hour(hours: f64) -> f64 {
    (hours / HOUR_ROUNDING_INCREMENT).round() * HOUR_ROUNDING_INCREMENT
}

/// Merge materialised rows with computed ephemeral rows for every
/// `(project, date)` in range with classified events but no materialised
/// row. Materialised rows always win.
#[must_use]
pub fn list_entries(
    materialised: Vec<TimeEntry>,
    computed: Vec<ComputedEntry>,
) -> Vec<TimeEntry> {
    let mut by_key: HashMap<(Uuid, NaiveDate), TimeEntry> = HashMap::new();
    for entry in materialised {
        by_key.insert((entry.project_id, entry.date), entry);
    }
    for entry in computed {
        by_key.entry((entry.project_id, entry.date)).or_insert_with(|| TimeEntry {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            project_id: entry.project_id,
            date: entry.date,
            hours: entry.hours,
            title: entry.title,
            description: entry.description,
            contributing_events: entry.contributing_events,
            materialised: None,
            is_pinned: false,
            is_locked: false,
            invoice_id: None,
        });
    }
    let mut rows: Vec<TimeEntry> = by_key.into_values().collect();
    rows.sort_by_key(|e| e.date);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronarc_domain::types::calendar::{Attendee, ResponseStatus, Transparency};
    use chrono::TimeZone;

    fn event(
        project_id: Uuid,
        start_hm: (u32, u32),
        end_hm: (u32, u32),
        title: &str,
    ) -> CalendarEvent {
        CalendarEvent {
            id: Uuid::new_v4(),
            calendar_id: Uuid::new_v4(),
            external_id: format!("e-{title}"),
            title: title.to_string(),
            description: String::new(),
            start: Utc.with_ymd_and_hms(2025, 3, 10, start_hm.0, start_hm.1, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 10, end_hm.0, end_hm.1, 0).unwrap(),
            attendees: vec![Attendee {
                email: "a@x.com".to_string(),
                is_self: true,
                response_status: ResponseStatus::Accepted,
            }],
            is_recurring: false,
            response_status: ResponseStatus::Accepted,
            transparency: Transparency::Opaque,
            is_orphaned: false,
            is_suppressed: false,
            classification_status: ClassificationStatus::Classified,
            is_skipped: false,
            needs_review: false,
            project_id: Some(project_id),
            classification_source: None,
            classification_confidence: None,
        }
    }

    // Scenario 6 from the spec's end-to-end tests.
    #[test]
    fn overlapping_events_count_union_once() {
        let p = Uuid::new_v4();
        let q = Uuid::new_v4();
        let events = vec![
            event(p, (9, 0), (10, 0), "Block A"),
            event(p, (9, 30), (11, 0), "Block B"),
            event(q, (9, 15), (10, 15), "Block C"),
        ];

        let p_entry = compute_entry(&events, p, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).unwrap();
        assert!((p_entry.hours - 2.0).abs() < 1e-9);

        let q_entry = compute_entry(&events, q, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).unwrap();
        assert!((q_entry.hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_overlapping_events_sum() {
        let p = Uuid::new_v4();
        let events = vec![event(p, (9, 0), (9, 30), "A"), event(p, (10, 0), (10, 30), "B")];
        let entry = compute_entry(&events, p, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).unwrap();
        assert!((entry.hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_to_quarter_hour() {
        assert!((round_to_quarter_hour(1.1) - 1.0).abs() < 1e-9);
        assert!((round_to_quarter_hour(1.13) - 1.25).abs() < 1e-9);
        assert!((round_to_quarter_hour(0.9) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn title_deduplicated_ordered_by_start() {
        let p = Uuid::new_v4();
        let events = vec![
            event(p, (10, 0), (10, 30), "Standup"),
            event(p, (9, 0), (9, 30), "Standup"),
        ];
        let entry = compute_entry(&events, p, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).unwrap();
        assert_eq!(entry.title, "Standup");
    }

    #[test]
    fn no_eligible_events_returns_none() {
        let p = Uuid::new_v4();
        let mut e = event(p, (9, 0), (10, 0), "X");
        e.is_orphaned = true;
        let entry = compute_entry(&[e], p, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert!(entry.is_none());
    }

    #[test]
    fn materialised_always_wins_over_ephemeral() {
        let project_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let materialised_entry = TimeEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            project_id,
            date,
            hours: 5.0,
            title: "Persisted".to_string(),
            description: String::new(),
            contributing_events: vec![],
            materialised: Some(chronarc_domain::types::time_entry::MaterialisedState {
                snapshot_computed_hours: 5.0,
            }),
            is_pinned: true,
            is_locked: false,
            invoice_id: None,
        };
        let computed = ComputedEntry {
            project_id,
            date,
            hours: 2.0,
            title: "Ephemeral".to_string(),
            description: String::new(),
            contributing_events: vec![],
        };

        let merged = list_entries(vec![materialised_entry], vec![computed]);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].hours - 5.0).abs() < 1e-9);
    }
}
