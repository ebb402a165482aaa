//! Time entry types: the ephemeral/materialised duality at the heart of the
//! time-accounting surface.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time entry, keyed uniquely per `(user_id, project_id, date)`. Either
/// computed on read (`materialised == None`) or persisted with a snapshot of
/// the computed hours at materialisation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: f64,
    pub title: String,
    pub description: String,
    pub contributing_events: Vec<Uuid>,
    pub materialised: Option<MaterialisedState>,
    pub is_pinned: bool,
    pub is_locked: bool,
    pub invoice_id: Option<Uuid>,
}

/// Fields only present once a time entry has been materialised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialisedState {
    pub snapshot_computed_hours: f64,
}

impl TimeEntry {
    #[must_use]
    pub fn is_materialised(&self) -> bool {
        self.materialised.is_some()
    }

    #[must_use]
    pub fn is_invoiced(&self) -> bool {
        self.invoice_id.is_some()
    }

    /// Staleness per the three-clause formula: materialised, displayed hours
    /// differ from the current computed hours, and the current computed
    /// hours differ from the snapshot taken at materialisation.
    #[must_use]
    pub fn is_stale(&self, current_computed_hours: f64) -> bool {
        let Some(state) = &self.materialised else {
            return false;
        };
        self.hours != current_computed_hours
            && current_computed_hours != state.snapshot_computed_hours
    }
}

/// Hours, title, description, and contributing events computed on demand
/// from classified events for a `(project, date)` pair. Never persisted
/// until materialisation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputedEntry {
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: f64,
    pub title: String,
    pub description: String,
    pub contributing_events: Vec<Uuid>,
}
