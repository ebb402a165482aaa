//! Shared application state injected into every handler via `State`.

use std::collections::HashMap;
use std::sync::Arc;

use chronarc_core::ports::{CalendarRepository, ConnectionRepository, EventRepository, ProjectRepository, RuleRepository, TimeEntryRepository};
use chronarc_core::{ClassificationService, TimeEntryService};
use chronarc_infra::SyncExecutor;
use uuid::Uuid;

/// State shared across all request handlers.
///
/// `executors` is keyed by `CalendarConnection.provider` ("google",
/// "microsoft", ...): each remote calendar provider gets its own
/// `SyncExecutor`, since a `SyncExecutor` is bound to exactly one
/// `CalendarProvider` implementation.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<dyn ConnectionRepository>,
    pub calendars: Arc<dyn CalendarRepository>,
    pub events: Arc<dyn EventRepository>,
    pub entries: Arc<dyn TimeEntryRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub rules: Arc<dyn RuleRepository>,
    pub classification: Arc<ClassificationService>,
    pub time_entries: Arc<TimeEntryService>,
    pub executors: Arc<HashMap<String, Arc<SyncExecutor>>>,
    /// This is a single-user, local time-accounting service: session/login
    /// token issuance is explicitly out of scope, so a single fixed user id
    /// stands in for the caller on every request rather than deriving one
    /// from an auth layer.
    pub user_id: Uuid,
}

#[allow(clippy::too_many_arguments)]
impl AppState {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        calendars: Arc<dyn CalendarRepository>,
        events: Arc<dyn EventRepository>,
        entries: Arc<dyn TimeEntryRepository>,
        projects: Arc<dyn ProjectRepository>,
        rules: Arc<dyn RuleRepository>,
        executors: HashMap<String, Arc<SyncExecutor>>,
        user_id: Uuid,
    ) -> Self {
        let classification = Arc::new(ClassificationService::new(
            events.clone(),
            projects.clone(),
            rules.clone(),
            calendars.clone(),
        ));
        let time_entries = Arc::new(TimeEntryService::new(events.clone(), entries.clone()));

        Self {
            connections,
            calendars,
            events,
            entries,
            projects,
            rules,
            classification,
            time_entries,
            executors: Arc::new(executors),
            user_id,
        }
    }

    pub fn executor_for(&self, provider: &str) -> Option<Arc<SyncExecutor>> {
        self.executors.get(provider).cloned()
    }
}
