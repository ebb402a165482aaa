//! In-memory mock repositories for `chronarc-core` integration tests,
//! grounded on the teacher's `MockWbsRepository` pattern (hand-written
//! `Arc<Mutex<...>>`-backed fakes implementing the real trait).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use chronarc_core::ports::{CalendarRepository, EventRepository, ProjectRepository, RuleRepository};
use chronarc_domain::errors::Result;
use chronarc_domain::types::calendar::{Calendar, CalendarEvent, ClassificationSource, ClassificationStatus};
use chronarc_domain::types::project::{ClassificationRule, Project};
use uuid::Uuid;

#[derive(Default)]
pub struct MockEventRepository {
    events: Mutex<HashMap<Uuid, CalendarEvent>>,
}

impl MockEventRepository {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        let map = events.into_iter().map(|e| (e.id, e)).collect();
        Self { events: Mutex::new(map) }
    }
}

#[async_trait]
impl EventRepository for MockEventRepository {
    async fn upsert(&self, event: &CalendarEvent) -> Result<bool> {
        let existed = self.events.lock().unwrap().insert(event.id, event.clone()).is_some();
        Ok(!existed)
    }

    async fn mark_orphaned_by_external_id(&self, _calendar_id: Uuid, _external_id: &str) -> Result<()> {
        Ok(())
    }

    async fn mark_orphaned_in_range_except(
        &self,
        _calendar_id: Uuid,
        _kept_external_ids: &[String],
        _min: NaiveDate,
        _max: NaiveDate,
    ) -> Result<usize> {
        Ok(0)
    }

    async fn classify(
        &self,
        _user_id: Uuid,
        event_id: Uuid,
        project_id: Option<Uuid>,
        skip: bool,
    ) -> Result<CalendarEvent> {
        let mut events = self.events.lock().unwrap();
        let event = events.get_mut(&event_id).expect("event must exist");
        event.project_id = project_id;
        event.is_skipped = skip;
        event.classification_status =
            if skip { ClassificationStatus::Skipped } else { ClassificationStatus::Classified };
        event.classification_source = Some(ClassificationSource::Manual);
        Ok(event.clone())
    }

    async fn apply_rule_classification(
        &self,
        event_id: Uuid,
        project_id: Option<Uuid>,
        skip: bool,
        confidence: f64,
        needs_review: bool,
        source: ClassificationSource,
    ) -> Result<CalendarEvent> {
        let mut events = self.events.lock().unwrap();
        let event = events.get_mut(&event_id).expect("event must exist");
        if event.classification_source == Some(ClassificationSource::Manual) {
            return Ok(event.clone());
        }
        event.project_id = project_id;
        event.is_skipped = skip;
        event.classification_status =
            if skip { ClassificationStatus::Skipped } else { ClassificationStatus::Classified };
        event.classification_source = Some(source);
        event.classification_confidence = Some(confidence);
        event.needs_review = needs_review;
        Ok(event.clone())
    }

    async fn list(
        &self,
        _user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        _status: Option<ClassificationStatus>,
        _connection_id: Option<Uuid>,
    ) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| {
                let d = e.start.date_naive();
                d >= start && d <= end
            })
            .cloned()
            .collect())
    }

    async fn get_by_project_and_date(
        &self,
        _user_id: Uuid,
        project_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.project_id == Some(project_id) && e.start.date_naive() == date)
            .cloned()
            .collect())
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<CalendarEvent>> {
        Ok(self.events.lock().unwrap().get(&event_id).cloned())
    }
}

impl MockEventRepository {
    pub fn snapshot(&self, id: Uuid) -> CalendarEvent {
        self.events.lock().unwrap().get(&id).cloned().expect("event must exist")
    }
}

pub struct MockProjectRepository(pub Vec<Project>);

#[async_trait]
impl ProjectRepository for MockProjectRepository {
    async fn list_active(&self, _user_id: Uuid) -> Result<Vec<Project>> {
        Ok(self.0.clone())
    }

    async fn get(&self, project_id: Uuid) -> Result<Option<Project>> {
        Ok(self.0.iter().find(|p| p.id == project_id).cloned())
    }
}

pub struct MockRuleRepository(pub Vec<ClassificationRule>);

#[async_trait]
impl RuleRepository for MockRuleRepository {
    async fn list_enabled(&self, _user_id: Uuid) -> Result<Vec<ClassificationRule>> {
        Ok(self.0.clone())
    }
}

pub struct MockCalendarRepository(pub Calendar);

#[async_trait]
impl CalendarRepository for MockCalendarRepository {
    async fn get(&self, _calendar_id: Uuid) -> Result<Option<Calendar>> {
        Ok(Some(self.0.clone()))
    }

    async fn list_for_connection(&self, _connection_id: Uuid) -> Result<Vec<Calendar>> {
        Ok(vec![self.0.clone()])
    }

    async fn list_stale(&self, _staleness: chrono::Duration, _max_failures: u32) -> Result<Vec<Calendar>> {
        Ok(vec![])
    }

    async fn save(&self, _calendar: &Calendar) -> Result<()> {
        Ok(())
    }
}
