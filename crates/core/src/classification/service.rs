//! Classification service: wires the pure [`crate::classification::engine`]
//! against the event/project/rule repositories to implement the
//! `apply_rules` and `preview` operations.

use std::sync::Arc;

use chronarc_domain::errors::Result;
use chronarc_domain::types::calendar::{CalendarEvent, ClassificationSource};
use chronarc_domain::types::classification::{ClassificationExplanation, ClassificationOutcome, Expr};
use chrono::NaiveDate;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::ports::{CalendarRepository, EventRepository, ProjectRepository, RuleRepository};
use crate::query::{matches, QueryCache, QueryContext};

use super::engine::classify;

pub struct ClassificationService {
    events: Arc<dyn EventRepository>,
    projects: Arc<dyn ProjectRepository>,
    rules: Arc<dyn RuleRepository>,
    calendars: Arc<dyn CalendarRepository>,
    cache: QueryCache,
}

#[derive(Debug, Default)]
pub struct ApplyRulesOutcome {
    pub classified: usize,
    pub skipped_applied: usize,
    pub skipped_count: usize,
    /// One entry per event the classifier evaluated, in evaluation order,
    /// so the HTTP layer can surface per-event rule/fingerprint scoring.
    pub explanations: Vec<EventExplanation>,
}

#[derive(Debug, Clone)]
pub struct EventExplanation {
    pub event_id: Uuid,
    pub explanation: ClassificationExplanation,
}

#[derive(Debug)]
pub struct PreviewOutcome {
    pub total_matches: usize,
    pub already_correct: usize,
    pub would_change: usize,
    pub manual_conflicts: usize,
    pub sample: Vec<Uuid>,
}

#[derive(Debug, Default)]
pub struct BulkClassifyOutcome {
    pub classified_count: usize,
    pub skipped_count: usize,
}

const PREVIEW_SAMPLE_SIZE: usize = 20;

/// Bounds used when a bulk operation isn't scoped to a date range: every
/// event the store can hold falls inside `[EPOCH, FAR_FUTURE]`.
const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};
const FAR_FUTURE: NaiveDate = match NaiveDate::from_ymd_opt(9999, 12, 31) {
    Some(d) => d,
    None => unreachable!(),
};

impl ClassificationService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        projects: Arc<dyn ProjectRepository>,
        rules: Arc<dyn RuleRepository>,
        calendars: Arc<dyn CalendarRepository>,
    ) -> Self {
        Self { events, projects, rules, calendars, cache: QueryCache::new() }
    }

    /// Runs the classifier over every non-manually-classified event in
    /// `[start, end]`, persisting decisions. Idempotent: events already
    /// classified to the computed winner are left untouched.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn apply_rules(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        dry_run: bool,
    ) -> Result<ApplyRulesOutcome> {
        let events = self.events.list(user_id, start, end, None, None).await?;
        let targets = self.projects.list_active(user_id).await?;
        let rules = self.rules.list_enabled(user_id).await?;

        let mut outcome = ApplyRulesOutcome::default();

        for event in events.iter().filter(|e| !e.is_manually_classified() && e.is_eligible()) {
            let calendar = self.calendars.get(event.calendar_id).await?;
            let calendar_name = calendar.map(|c| c.display_name).unwrap_or_default();

            let (decision, explanation) = classify(event, &calendar_name, &targets, &rules, &self.cache);

            match decision {
                ClassificationOutcome::Skipped { confidence } => {
                    debug!(event_id = %event.id, winner = "skip", confidence, "classification decision");
                    outcome.explanations.push(EventExplanation { event_id: event.id, explanation });
                    if event.is_skipped {
                        continue;
                    }
                    outcome.skipped_applied += 1;
                    outcome.skipped_count += 1;
                    if !dry_run {
                        self.persist_skip(event, confidence).await?;
                    }
                }
                ClassificationOutcome::Classified { winner_target_id, confidence, needs_review, source } => {
                    debug!(
                        event_id = %event.id,
                        winner = %winner_target_id,
                        confidence,
                        needs_review,
                        "classification decision"
                    );
                    outcome.explanations.push(EventExplanation { event_id: event.id, explanation });
                    if event.project_id == Some(winner_target_id) {
                        continue;
                    }
                    outcome.classified += 1;
                    if !dry_run {
                        self.persist_classification(event, winner_target_id, confidence, needs_review, source)
                            .await?;
                    }
                }
                ClassificationOutcome::Unclassified => {}
            }
        }

        Ok(outcome)
    }

    async fn persist_skip(&self, event: &CalendarEvent, confidence: f64) -> Result<()> {
        self.events.apply_rule_classification(event.id, None, true, confidence, false, ClassificationSource::Rule).await?;
        Ok(())
    }

    async fn persist_classification(
        &self,
        event: &CalendarEvent,
        winner_target_id: Uuid,
        confidence: f64,
        needs_review: bool,
        source: ClassificationSource,
    ) -> Result<()> {
        self.events
            .apply_rule_classification(event.id, Some(winner_target_id), false, confidence, needs_review, source)
            .await?;
        Ok(())
    }

    /// Evaluates a candidate rule query without mutating anything.
    #[instrument(skip(self, query), fields(user_id = %user_id))]
    pub async fn preview(
        &self,
        user_id: Uuid,
        query: &str,
        project_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PreviewOutcome> {
        let expr: Expr = (*self.cache.get_or_parse(query)?).clone();
        let events = self.events.list(user_id, start, end, None, None).await?;

        let mut out = PreviewOutcome {
            total_matches: 0,
            already_correct: 0,
            would_change: 0,
            manual_conflicts: 0,
            sample: Vec::new(),
        };

        for event in &events {
            let calendar = self.calendars.get(event.calendar_id).await?;
            let calendar_name = calendar.map(|c| c.display_name).unwrap_or_default();
            let ctx = QueryContext { event, calendar_name: &calendar_name, project_name: None };
            if !matches(&ctx, &expr) {
                continue;
            }
            out.total_matches += 1;
            if out.sample.len() < PREVIEW_SAMPLE_SIZE {
                out.sample.push(event.id);
            }

            if event.is_manually_classified() {
                if event.project_id != project_id {
                    out.manual_conflicts += 1;
                }
                continue;
            }

            if event.project_id == project_id {
                out.already_correct += 1;
            } else {
                out.would_change += 1;
            }
        }

        Ok(out)
    }

    /// Classifies every event (across all time, manually classified ones
    /// included) matching `query`, directly to `project_id` or as skipped.
    /// Unlike `apply_rules`, this is a user-initiated manual action, so it
    /// overrides existing manual classifications rather than deferring to
    /// them.
    #[instrument(skip(self, query), fields(user_id = %user_id))]
    pub async fn bulk_classify(
        &self,
        user_id: Uuid,
        query: &str,
        project_id: Option<Uuid>,
        skip: bool,
    ) -> Result<BulkClassifyOutcome> {
        if !skip && project_id.is_none() {
            return Err(chronarc_domain::ChronarcError::invalid_request(
                "bulk-classify requires either project_id or skip",
            ));
        }

        let expr: Expr = (*self.cache.get_or_parse(query)?).clone();
        let events = self.events.list(user_id, EPOCH, FAR_FUTURE, None, None).await?;

        let mut outcome = BulkClassifyOutcome::default();

        for event in &events {
            let calendar = self.calendars.get(event.calendar_id).await?;
            let calendar_name = calendar.map(|c| c.display_name).unwrap_or_default();
            let ctx = QueryContext { event, calendar_name: &calendar_name, project_name: None };
            if !matches(&ctx, &expr) {
                continue;
            }

            self.events.classify(user_id, event.id, project_id, skip).await?;
            if skip {
                outcome.skipped_count += 1;
            } else {
                outcome.classified_count += 1;
            }
        }

        Ok(outcome)
    }
}
