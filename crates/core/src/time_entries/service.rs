//! Materialisation, Keep/Accept, and refresh operations over time entries.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use chronarc_domain::errors::{ChronarcError, Result};
use chronarc_domain::types::calendar::ClassificationStatus;
use chronarc_domain::types::time_entry::{MaterialisedState, TimeEntry};
use uuid::Uuid;

use crate::ports::{EventRepository, TimeEntryRepository};

use super::engine::{compute_entry, list_entries};

pub struct TimeEntryService {
    events: Arc<dyn EventRepository>,
    entries: Arc<dyn TimeEntryRepository>,
}

impl TimeEntryService {
    pub fn new(events: Arc<dyn EventRepository>, entries: Arc<dyn TimeEntryRepository>) -> Self {
        Self { events, entries }
    }

    async fn computed_hours(&self, user_id: Uuid, project_id: Uuid, date: NaiveDate) -> Result<f64> {
        let events = self.events.get_by_project_and_date(user_id, project_id, date).await?;
        Ok(compute_entry(&events, project_id, date).map(|e| e.hours).unwrap_or(0.0))
    }

    /// Persist the current computed entry for `(project, date)` as a
    /// materialised row. Triggered on first user edit, pin, or explicitly.
    pub async fn materialise(&self, user_id: Uuid, project_id: Uuid, date: NaiveDate) -> Result<TimeEntry> {
        let events = self.events.get_by_project_and_date(user_id, project_id, date).await?;
        let computed = compute_entry(&events, project_id, date)
            .ok_or_else(|| ChronarcError::invalid_request("no classified events for this project/date"))?;

        let entry = TimeEntry {
            id: Uuid::new_v4(),
            user_id,
            project_id,
            date,
            hours: computed.hours,
            title: computed.title,
            description: computed.description,
            contributing_events: computed.contributing_events,
            materialised: Some(MaterialisedState { snapshot_computed_hours: computed.hours }),
            is_pinned: false,
            is_locked: false,
            invoice_id: None,
        };
        self.entries.save(&entry).await?;
        Ok(entry)
    }

    /// Re-snapshot to current computed hours without changing displayed
    /// hours. Clears staleness because clause 3 of the formula becomes
    /// false.
    pub async fn keep(&self, user_id: Uuid, entry_id: Uuid) -> Result<TimeEntry> {
        let mut entry = self.get_editable(entry_id).await?;
        let computed = self.computed_hours(user_id, entry.project_id, entry.date).await?;
        if let Some(state) = &mut entry.materialised {
            state.snapshot_computed_hours = computed;
        }
        self.entries.save(&entry).await?;
        Ok(entry)
    }

    /// Set hours to the current computed value and re-snapshot.
    pub async fn accept(&self, user_id: Uuid, entry_id: Uuid) -> Result<TimeEntry> {
        let mut entry = self.get_editable(entry_id).await?;
        let computed = self.computed_hours(user_id, entry.project_id, entry.date).await?;
        entry.hours = computed;
        if let Some(state) = &mut entry.materialised {
            state.snapshot_computed_hours = computed;
        }
        self.entries.save(&entry).await?;
        Ok(entry)
    }

    /// Resets a materialised non-invoiced entry to the current computed
    /// entry. Rejected when invoiced or there are no classified events.
    pub async fn refresh(&self, user_id: Uuid, entry_id: Uuid) -> Result<TimeEntry> {
        let mut entry = self.get_editable(entry_id).await?;

        let events = self.events.get_by_project_and_date(user_id, entry.project_id, entry.date).await?;
        let computed = compute_entry(&events, entry.project_id, entry.date)
            .ok_or_else(|| ChronarcError::invalid_request("no classified events for this entry"))?;

        entry.hours = computed.hours;
        entry.title = computed.title;
        entry.description = computed.description;
        entry.contributing_events = computed.contributing_events;
        entry.materialised = Some(MaterialisedState { snapshot_computed_hours: computed.hours });

        self.entries.save(&entry).await?;
        Ok(entry)
    }

    /// Merged materialised + ephemeral time entries over `[start, end]`,
    /// optionally narrowed to one project. Materialised rows always win;
    /// every `(project, date)` pair with classified events but no
    /// materialised row gets a computed ephemeral entry instead.
    pub async fn list_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        project_id: Option<Uuid>,
    ) -> Result<Vec<TimeEntry>> {
        let materialised = self.entries.list_materialised(user_id, start, end, project_id).await?;

        let events = self
            .events
            .list(user_id, start, end, Some(ClassificationStatus::Classified), None)
            .await?;

        let mut pairs: HashSet<(Uuid, NaiveDate)> = HashSet::new();
        for event in &events {
            if !event.is_eligible() {
                continue;
            }
            let Some(event_project_id) = event.project_id else { continue };
            if let Some(wanted) = project_id {
                if event_project_id != wanted {
                    continue;
                }
            }
            pairs.insert((event_project_id, event.start.date_naive()));
        }

        let computed = pairs
            .into_iter()
            .filter_map(|(pid, date)| compute_entry(&events, pid, date))
            .collect();

        Ok(list_entries(materialised, computed))
    }

    async fn get_editable(&self, entry_id: Uuid) -> Result<TimeEntry> {
        let entry = self
            .entries
            .get(entry_id)
            .await?
            .ok_or_else(|| ChronarcError::not_found(format!("time entry {entry_id}")))?;
        if entry.is_invoiced() {
            return Err(ChronarcError::conflict("entry is invoiced and immutable"));
        }
        Ok(entry)
    }
}
