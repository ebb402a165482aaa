//! Integration tests for `ClassificationService::apply_rules` against
//! in-memory repositories: idempotence and manual precedence (§8).

mod support;

use std::collections::HashSet;
use std::sync::Arc;

use chronarc_core::ClassificationService;
use chronarc_domain::types::calendar::{
    Attendee, Calendar, CalendarEvent, ClassificationSource, ClassificationStatus, ResponseStatus,
    Transparency,
};
use chronarc_domain::types::project::Project;
use chrono::{NaiveDate, TimeZone, Utc};
use support::{MockCalendarRepository, MockEventRepository, MockProjectRepository, MockRuleRepository};
use uuid::Uuid;

fn calendar() -> Calendar {
    Calendar {
        id: Uuid::new_v4(),
        connection_id: Uuid::new_v4(),
        external_id: "primary".to_string(),
        display_name: "Work".to_string(),
        colour: None,
        is_primary: true,
        is_selected: true,
        min_synced_date: None,
        max_synced_date: None,
        sync_token: None,
        last_synced_at: None,
        needs_reauth: false,
        sync_failure_count: 0,
    }
}

fn event(calendar_id: Uuid, title: &str, domain: &str, source: Option<ClassificationSource>) -> CalendarEvent {
    CalendarEvent {
        id: Uuid::new_v4(),
        calendar_id,
        external_id: format!("e-{title}"),
        title: title.to_string(),
        description: String::new(),
        start: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap(),
        attendees: vec![Attendee {
            email: format!("a@{domain}"),
            is_self: false,
            response_status: ResponseStatus::Accepted,
        }],
        is_recurring: false,
        response_status: ResponseStatus::Accepted,
        transparency: Transparency::Opaque,
        is_orphaned: false,
        is_suppressed: false,
        classification_status: ClassificationStatus::Pending,
        is_skipped: false,
        needs_review: false,
        project_id: None,
        classification_source: source,
        classification_confidence: None,
    }
}

fn project(domain: &str) -> Project {
    let mut domains = HashSet::new();
    domains.insert(domain.to_string());
    Project {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Acme".to_string(),
        domains,
        emails: HashSet::new(),
        keywords: HashSet::new(),
        is_archived: false,
        is_hidden_by_default: false,
        does_not_accumulate_hours: false,
    }
}

#[tokio::test]
async fn apply_rules_is_idempotent() {
    let cal = calendar();
    let user_id = Uuid::new_v4();
    let proj = project("acme.com");
    let ev = event(cal.id, "Acme sync", "acme.com", None);
    let event_id = ev.id;

    let events = Arc::new(MockEventRepository::with_events(vec![ev]));
    let service = ClassificationService::new(
        events.clone(),
        Arc::new(MockProjectRepository(vec![proj.clone()])),
        Arc::new(MockRuleRepository(vec![])),
        Arc::new(MockCalendarRepository(cal)),
    );

    let range = (
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    );

    let first = service.apply_rules(user_id, range.0, range.1, false).await.unwrap();
    assert_eq!(first.classified, 1);
    assert_eq!(events.snapshot(event_id).project_id, Some(proj.id));

    // Second pass over the same range makes no additional mutations.
    let second = service.apply_rules(user_id, range.0, range.1, false).await.unwrap();
    assert_eq!(second.classified, 0);
}

#[tokio::test]
async fn rule_classified_events_are_not_mistaken_for_manual() {
    let cal = calendar();
    let user_id = Uuid::new_v4();
    let proj = project("acme.com");
    let ev = event(cal.id, "Acme sync", "acme.com", None);
    let event_id = ev.id;

    let events = Arc::new(MockEventRepository::with_events(vec![ev]));
    let service = ClassificationService::new(
        events.clone(),
        Arc::new(MockProjectRepository(vec![proj.clone()])),
        Arc::new(MockRuleRepository(vec![])),
        Arc::new(MockCalendarRepository(cal)),
    );

    let range = (
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    );
    service.apply_rules(user_id, range.0, range.1, false).await.unwrap();

    let classified = events.snapshot(event_id);
    assert_eq!(classified.classification_source, Some(ClassificationSource::Fingerprint));
    assert_ne!(classified.classification_source, Some(ClassificationSource::Manual));
}

#[tokio::test]
async fn manual_classification_is_never_overridden() {
    let cal = calendar();
    let user_id = Uuid::new_v4();
    let proj = project("acme.com");
    let manual_project = Uuid::new_v4();
    let ev = event(cal.id, "Acme sync", "acme.com", Some(ClassificationSource::Manual));
    let event_id = ev.id;
    let mut ev = ev;
    ev.project_id = Some(manual_project);

    let events = Arc::new(MockEventRepository::with_events(vec![ev]));
    let service = ClassificationService::new(
        events.clone(),
        Arc::new(MockProjectRepository(vec![proj])),
        Arc::new(MockRuleRepository(vec![])),
        Arc::new(MockCalendarRepository(cal)),
    );

    let range = (
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    );
    service.apply_rules(user_id, range.0, range.1, false).await.unwrap();

    assert_eq!(events.snapshot(event_id).project_id, Some(manual_project));
}
