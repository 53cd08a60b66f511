//! TaskRepository - owner-scoped task persistence seam

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Task, TaskId};

use super::{StateError, StateManager, StateResponse};

/// Owner-scoped task storage
///
/// Every read is filtered by owner: a task belonging to someone else is
/// indistinguishable from a missing one.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(&self, task: Task) -> StateResponse<Task>;

    async fn get_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>>;

    /// All of an owner's tasks, oldest first (ties in insertion order)
    async fn list_tasks(&self, owner: &str) -> StateResponse<Vec<Task>>;

    async fn update_task(&self, task: Task) -> StateResponse<Task>;

    /// Remove a task, returning it if it existed
    async fn delete_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>>;
}

#[async_trait]
impl TaskRepository for StateManager {
    async fn create_task(&self, task: Task) -> StateResponse<Task> {
        debug!(task_id = %task.id, "TaskRepository::create_task: called");
        StateManager::create_task(self, task.clone()).await?;
        Ok(task)
    }

    async fn get_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
        StateManager::get_task(self, owner, id).await
    }

    async fn list_tasks(&self, owner: &str) -> StateResponse<Vec<Task>> {
        StateManager::list_tasks(self, owner).await
    }

    async fn update_task(&self, task: Task) -> StateResponse<Task> {
        debug!(task_id = %task.id, "TaskRepository::update_task: called");
        StateManager::update_task(self, task.clone()).await?;
        Ok(task)
    }

    async fn delete_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
        StateManager::delete_task(self, owner, id).await
    }
}

/// Convenience for callers that need the task to exist
pub async fn require_task(repo: &dyn TaskRepository, owner: &str, id: &TaskId) -> StateResponse<Task> {
    repo.get_task(owner, id)
        .await?
        .ok_or_else(|| StateError::NotFound(id.to_string()))
}
