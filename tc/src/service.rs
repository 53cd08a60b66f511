//! TaskService - direct CRUD over an owner's tasks
//!
//! The non-conversational path. Every operation is owner-scoped and every
//! committed change is published to the owner's live observers. Updates and
//! deletes hold the owner lock, so they never interleave with a chat turn's
//! staged writes.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{MAX_DIRECT_TEXT, Origin, Task, TaskId, TextError, validate_text};
use crate::notify::{Notification, Notifier};
use crate::state::{StateError, StateManager, TaskChange, require_task};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid task: {0}")]
    Validation(#[from] TextError),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    State(StateError),
}

impl From<StateError> for ServiceError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound(id) => Self::NotFound(id),
            other => Self::State(other),
        }
    }
}

/// Fields a direct update may change; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }
}

pub struct TaskService {
    state: StateManager,
    notifier: Arc<Notifier>,
}

impl TaskService {
    pub fn new(state: StateManager, notifier: Arc<Notifier>) -> Self {
        Self { state, notifier }
    }

    pub async fn create(&self, owner: &str, text: &str) -> Result<Task, ServiceError> {
        debug!(%owner, "TaskService::create: called");
        let text = validate_text(text, MAX_DIRECT_TEXT)?;
        let task = Task::new(owner, text, Origin::DirectApi, Utc::now());
        self.state.create_task(task.clone()).await?;

        info!(%owner, task_id = %task.id, "Task created");
        self.publish(owner, TaskChange::Created(task.clone()));
        Ok(task)
    }

    /// Owner's tasks, newest first, optionally restricted to one origin
    pub async fn list(&self, owner: &str, origin: Option<Origin>) -> Result<Vec<Task>, ServiceError> {
        debug!(%owner, ?origin, "TaskService::list: called");
        let mut tasks = self.state.list_tasks(owner).await?;
        if let Some(origin) = origin {
            tasks.retain(|t| t.origin == origin);
        }
        tasks.reverse();
        Ok(tasks)
    }

    pub async fn get(&self, owner: &str, id: &str) -> Result<Task, ServiceError> {
        debug!(%owner, %id, "TaskService::get: called");
        let id = parse_id(id)?;
        Ok(require_task(&self.state, owner, &id).await?)
    }

    /// Apply a partial update; completing here never spawns a recurrence
    pub async fn update(&self, owner: &str, id: &str, update: TaskUpdate) -> Result<Task, ServiceError> {
        debug!(%owner, %id, ?update, "TaskService::update: called");
        let id = parse_id(id)?;
        let _tasks = self.state.lock_owner(owner).await;
        let mut task = require_task(&self.state, owner, &id).await?;
        if update.is_empty() {
            return Ok(task);
        }

        if let Some(text) = update.text.as_deref() {
            task.text = validate_text(text, MAX_DIRECT_TEXT)?;
        }
        if let Some(completed) = update.completed {
            task.completed = completed;
        }
        task.touch(Utc::now());
        self.state.update_task(task.clone()).await?;

        info!(%owner, task_id = %task.id, "Task updated");
        self.publish(owner, TaskChange::Updated(task.clone()));
        Ok(task)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> Result<Task, ServiceError> {
        debug!(%owner, %id, "TaskService::delete: called");
        let id = parse_id(id)?;
        let _tasks = self.state.lock_owner(owner).await;
        let task = self
            .state
            .delete_task(owner, &id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        info!(%owner, task_id = %task.id, "Task deleted");
        self.publish(owner, TaskChange::Deleted(task.clone()));
        Ok(task)
    }

    fn publish(&self, owner: &str, change: TaskChange) {
        self.notifier.publish(owner, Notification::for_change(&change));
    }
}

fn parse_id(id: &str) -> Result<TaskId, ServiceError> {
    TaskId::parse(id.trim()).map_err(|_| ServiceError::NotFound(id.to_string()))
}
