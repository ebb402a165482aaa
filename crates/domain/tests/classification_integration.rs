//! Integration tests for domain entity invariants.

use chronarc_domain::types::calendar::{
    Attendee, Calendar, CalendarConnection, CalendarEvent, ClassificationSource,
    ClassificationStatus, ResponseStatus, Transparency,
};
use chronarc_domain::types::project::{ClassificationRule, Project};
use chronarc_domain::types::time_entry::{MaterialisedState, TimeEntry};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashSet;
use uuid::Uuid;

fn sample_event(project_id: Option<Uuid>, source: Option<ClassificationSource>) -> CalendarEvent {
    CalendarEvent {
        id: Uuid::new_v4(),
        calendar_id: Uuid::new_v4(),
        external_id: "evt-1".to_string(),
        title: "Acme weekly sync".to_string(),
        description: String::new(),
        start: Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap(),
        attendees: vec![
            Attendee {
                email: "alice@acme.com".to_string(),
                is_self: false,
                response_status: ResponseStatus::Accepted,
            },
            Attendee {
                email: "bob@beta.io".to_string(),
                is_self: true,
                response_status: ResponseStatus::Accepted,
            },
        ],
        is_recurring: false,
        response_status: ResponseStatus::Accepted,
        transparency: Transparency::Opaque,
        is_orphaned: false,
        is_suppressed: false,
        classification_status: ClassificationStatus::Pending,
        is_skipped: false,
        needs_review: false,
        project_id,
        classification_source: source,
        classification_confidence: None,
    }
}

#[test]
fn event_is_manually_classified_only_with_manual_source() {
    let manual = sample_event(Some(Uuid::new_v4()), Some(ClassificationSource::Manual));
    let rule = sample_event(Some(Uuid::new_v4()), Some(ClassificationSource::Rule));
    let none = sample_event(None, None);

    assert!(manual.is_manually_classified());
    assert!(!rule.is_manually_classified());
    assert!(!none.is_manually_classified());
}

#[test]
fn event_eligibility_excludes_orphaned_and_suppressed() {
    let mut event = sample_event(None, None);
    assert!(event.is_eligible());

    event.is_orphaned = true;
    assert!(!event.is_eligible());

    event.is_orphaned = false;
    event.is_suppressed = true;
    assert!(!event.is_eligible());
}

#[test]
fn attendee_domains_extracted_after_at_sign() {
    let event = sample_event(None, None);
    let domains = event.attendee_domains();
    assert_eq!(domains, vec!["acme.com", "beta.io"]);
}

#[test]
fn calendar_syncable_respects_reauth_and_failure_count() {
    let base = Calendar {
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
    };

    assert!(base.is_syncable());

    let needs_reauth = Calendar { needs_reauth: true, ..base.clone() };
    assert!(!needs_reauth.is_syncable());

    let quarantined = Calendar { sync_failure_count: 3, ..base };
    assert!(!quarantined.is_syncable());
}

#[test]
fn connection_needs_refresh_within_skew() {
    let now = Utc::now();
    let connection = CalendarConnection {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        provider: "google".to_string(),
        access_token: "tok".to_string(),
        refresh_token: "refresh".to_string(),
        token_expires_at: now + Duration::minutes(3),
        last_synced_at: None,
        created_at: now,
    };

    assert!(connection.needs_token_refresh(now, Duration::minutes(5)));
    assert!(!connection.needs_token_refresh(now, Duration::minutes(1)));
}

#[test]
fn rule_is_either_skip_or_target() {
    let skip = ClassificationRule {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        query: "title:standup".to_string(),
        project_id: None,
        attended: Some(false),
        weight: 1.0,
        is_enabled: true,
    };
    assert!(skip.is_skip_rule());
    assert!(!skip.is_target_rule());

    let target = ClassificationRule {
        project_id: Some(Uuid::new_v4()),
        attended: None,
        ..skip
    };
    assert!(target.is_target_rule());
    assert!(!target.is_skip_rule());
}

#[test]
fn project_carries_fingerprints() {
    let mut domains = HashSet::new();
    domains.insert("acme.com".to_string());
    let project = Project {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Acme".to_string(),
        domains,
        emails: HashSet::new(),
        keywords: HashSet::new(),
        is_archived: false,
        is_hidden_by_default: false,
        does_not_accumulate_hours: false,
    };
    assert!(project.domains.contains("acme.com"));
}

#[test]
fn time_entry_staleness_formula() {
    let base = TimeEntry {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        hours: 2.0,
        title: "Acme weekly sync".to_string(),
        description: String::new(),
        contributing_events: vec![],
        materialised: Some(MaterialisedState { snapshot_computed_hours: 2.0 }),
        is_pinned: false,
        is_locked: false,
        invoice_id: None,
    };

    // hours == computed: not stale regardless of snapshot drift.
    assert!(!base.is_stale(2.0));

    // computed == snapshot: events haven't drifted, not stale.
    let drifted_hours = TimeEntry { hours: 1.5, ..base.clone() };
    assert!(!drifted_hours.is_stale(2.0));

    // hours != computed and computed != snapshot: stale.
    assert!(base.is_stale(3.0));

    // Ephemeral (never materialised) entries are never stale.
    let ephemeral = TimeEntry { materialised: None, ..base };
    assert!(!ephemeral.is_stale(5.0));
}

#[test]
fn invoiced_entry_reports_invoiced() {
    let entry = TimeEntry {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        hours: 1.0,
        title: String::new(),
        description: String::new(),
        contributing_events: vec![],
        materialised: None,
        is_pinned: false,
        is_locked: true,
        invoice_id: Some(Uuid::new_v4()),
    };
    assert!(entry.is_invoiced());
}
