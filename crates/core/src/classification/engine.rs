//! Two-pass weighted-vote classifier.

use std::collections::HashMap;

use chronarc_domain::constants;
use chronarc_domain::types::calendar::{CalendarEvent, ClassificationSource};
use chronarc_domain::types::classification::{
    ClassificationExplanation, ClassificationOutcome, RuleMatch, TargetScore,
};
use chronarc_domain::types::project::{ClassificationRule, Project};
use uuid::Uuid;

use crate::query::{matches, QueryCache, QueryContext};

/// Classify a single event against the given rules and project fingerprints.
/// Pure given its inputs: two identical invocations produce identical
/// outcomes and explanations.
#[must_use]
pub fn classify(
    event: &CalendarEvent,
    calendar_name: &str,
    targets: &[Project],
    rules: &[ClassificationRule],
    cache: &QueryCache,
) -> (ClassificationOutcome, ClassificationExplanation) {
    let ctx = QueryContext { event, calendar_name, project_name: None };
    let mut explanation = ClassificationExplanation::default();

    let mut skip_weight = 0.0;
    let mut rule_weight_by_target: HashMap<Uuid, f64> = HashMap::new();
    let mut rule_matched_target: HashMap<Uuid, bool> = HashMap::new();

    for rule in rules.iter().filter(|r| r.is_enabled) {
        let matched = cache
            .get_or_parse(&rule.query)
            .map(|expr| matches(&ctx, &expr))
            .unwrap_or(false);

        explanation.rule_matches.push(RuleMatch { rule_id: rule.id, matched, weight: rule.weight });

        if !matched {
            continue;
        }
        if rule.is_skip_rule() {
            skip_weight += rule.weight;
        } else if let Some(project_id) = rule.project_id {
            *rule_weight_by_target.entry(project_id).or_insert(0.0) += rule.weight;
            rule_matched_target.insert(project_id, true);
        }
    }

    if skip_weight > constants::SKIP_THRESHOLD {
        let confidence = skip_weight / (skip_weight + 1.0);
        return (ClassificationOutcome::Skipped { confidence }, explanation);
    }

    let mut scores: HashMap<Uuid, TargetScore> = HashMap::new();
    for target in targets {
        let fingerprint_weight = fingerprint_score(event, target);
        let rule_weight = rule_weight_by_target.get(&target.id).copied().unwrap_or(0.0);
        if fingerprint_weight > 0.0 || rule_weight > 0.0 {
            scores.insert(
                target.id,
                TargetScore { project_id: target.id, rule_weight, fingerprint_weight },
            );
        }
    }

    explanation.target_scores = scores.values().cloned().collect();
    explanation.target_scores.sort_by(|a, b| a.project_id.cmp(&b.project_id));

    let total_weight: f64 = scores.values().map(TargetScore::total).sum();

    let winner = pick_winner(&scores);

    match winner {
        Some(winner_id) => {
            let winner_total = scores[&winner_id].total();
            if winner_total < constants::PROJECT_THRESHOLD {
                return (ClassificationOutcome::Unclassified, explanation);
            }
            let confidence = if total_weight > 0.0 { winner_total / total_weight } else { 0.0 };
            let came_from_fingerprint_only = !rule_matched_target.contains_key(&winner_id);
            let needs_review = confidence < constants::REVIEW_THRESHOLD || came_from_fingerprint_only;
            let source = if rule_matched_target.contains_key(&winner_id) {
                ClassificationSource::Rule
            } else {
                ClassificationSource::Fingerprint
            };
            (
                ClassificationOutcome::Classified {
                    winner_target_id: winner_id,
                    confidence,
                    needs_review,
                    source,
                },
                explanation,
            )
        }
        None => (ClassificationOutcome::Unclassified, explanation),
    }
}

/// Strictly-greatest winner; ties (including zero candidates) return `None`.
fn pick_winner(scores: &HashMap<Uuid, TargetScore>) -> Option<Uuid> {
    let mut best: Option<(Uuid, f64)> = None;
    let mut tied = false;
    for score in scores.values() {
        let total = score.total();
        match best {
            None => best = Some((score.project_id, total)),
            Some((_, best_total)) if total > best_total => {
                best = Some((score.project_id, total));
                tied = false;
            }
            Some((_, best_total)) if (total - best_total).abs() < f64::EPSILON => {
                tied = true;
            }
            _ => {}
        }
    }
    if tied { None } else { best.map(|(id, _)| id) }
}

fn fingerprint_score(event: &CalendarEvent, project: &Project) -> f64 {
    let mut score = 0.0;

    let domains = event.attendee_domains();
    let matched_domains: std::collections::HashSet<&str> = domains
        .into_iter()
        .filter(|d| project.domains.iter().any(|pd| pd.eq_ignore_ascii_case(d)))
        .collect();
    score += matched_domains.len() as f64 * constants::FINGERPRINT_DOMAIN_WEIGHT;

    let matched_emails = event
        .attendees
        .iter()
        .filter(|a| project.emails.iter().any(|pe| pe.eq_ignore_ascii_case(&a.email)))
        .count();
    score += matched_emails as f64 * constants::FINGERPRINT_EMAIL_WEIGHT;

    let haystack = format!("{} {}", event.title, event.description).to_ascii_lowercase();
    let matched_keywords: std::collections::HashSet<String> = project
        .keywords
        .iter()
        .filter(|kw| haystack.contains(&kw.to_ascii_lowercase()))
        .map(|kw| kw.to_ascii_lowercase())
        .collect();
    score += matched_keywords.len() as f64 * constants::FINGERPRINT_KEYWORD_WEIGHT;

    score
}
