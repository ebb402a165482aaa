//! Project and classification-rule types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billable project with classification fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub domains: HashSet<String>,
    pub emails: HashSet<String>,
    pub keywords: HashSet<String>,
    pub is_archived: bool,
    pub is_hidden_by_default: bool,
    pub does_not_accumulate_hours: bool,
}

/// A user-scoped classification rule. Exactly one of `project_id` (a target
/// rule) or `attended == Some(false)` (a skip rule) applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub project_id: Option<Uuid>,
    pub attended: Option<bool>,
    pub weight: f64,
    pub is_enabled: bool,
}

impl ClassificationRule {
    #[must_use]
    pub fn is_skip_rule(&self) -> bool {
        self.attended == Some(false)
    }

    #[must_use]
    pub fn is_target_rule(&self) -> bool {
        self.project_id.is_some()
    }
}
