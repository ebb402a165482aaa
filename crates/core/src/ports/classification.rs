//! Repository ports feeding the classifier: projects and rules.

use async_trait::async_trait;
use chronarc_domain::errors::Result;
use chronarc_domain::types::project::{ClassificationRule, Project};
use uuid::Uuid;

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn list_active(&self, user_id: Uuid) -> Result<Vec<Project>>;
    async fn get(&self, project_id: Uuid) -> Result<Option<Project>>;
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn list_enabled(&self, user_id: Uuid) -> Result<Vec<ClassificationRule>>;
}
