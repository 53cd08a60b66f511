//! TurnScope - staged unit of work for one chat turn
//!
//! Tool handlers write through a `TurnScope` instead of the store. Writes are
//! held in an overlay that later reads in the same turn observe; the session
//! commits the accumulated changes together with the turn's messages, or
//! drops them if the turn fails.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{Task, TaskId};

use super::{StateError, StateResponse, TaskChange, TaskRepository};

#[derive(Default)]
struct Overlay {
    /// Latest staged version of each touched task, `None` once deleted
    tasks: HashMap<TaskId, Option<Task>>,
    /// Tasks created this turn, in creation order
    created: Vec<TaskId>,
    changes: Vec<TaskChange>,
}

/// Staging repository layered over a committed one
pub struct TurnScope<R> {
    base: R,
    overlay: Mutex<Overlay>,
}

impl<R: TaskRepository> TurnScope<R> {
    pub fn new(base: R) -> Self {
        debug!("TurnScope::new: called");
        Self {
            base,
            overlay: Mutex::new(Overlay::default()),
        }
    }

    /// Staged changes in the order they were made
    pub async fn changes(&self) -> Vec<TaskChange> {
        self.overlay.lock().await.changes.clone()
    }

    /// Consume the scope, yielding its staged changes
    pub fn into_changes(self) -> Vec<TaskChange> {
        self.overlay.into_inner().changes
    }
}

#[async_trait]
impl<R: TaskRepository> TaskRepository for TurnScope<R> {
    async fn create_task(&self, task: Task) -> StateResponse<Task> {
        debug!(task_id = %task.id, "TurnScope::create_task: called");
        let mut overlay = self.overlay.lock().await;
        overlay.tasks.insert(task.id.clone(), Some(task.clone()));
        overlay.created.push(task.id.clone());
        overlay.changes.push(TaskChange::Created(task.clone()));
        Ok(task)
    }

    async fn get_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
        debug!(%owner, %id, "TurnScope::get_task: called");
        {
            let overlay = self.overlay.lock().await;
            if let Some(staged) = overlay.tasks.get(id) {
                return Ok(staged.clone().filter(|t| t.owner == owner));
            }
        }
        self.base.get_task(owner, id).await
    }

    async fn list_tasks(&self, owner: &str) -> StateResponse<Vec<Task>> {
        debug!(%owner, "TurnScope::list_tasks: called");
        let committed = self.base.list_tasks(owner).await?;
        let overlay = self.overlay.lock().await;

        let mut tasks: Vec<Task> = committed
            .into_iter()
            .filter_map(|task| match overlay.tasks.get(&task.id) {
                Some(staged) => staged.clone(),
                None => Some(task),
            })
            .collect();
        tasks.extend(
            overlay
                .created
                .iter()
                .filter_map(|id| overlay.tasks.get(id).cloned().flatten())
                .filter(|t| t.owner == owner),
        );
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn update_task(&self, task: Task) -> StateResponse<Task> {
        debug!(task_id = %task.id, "TurnScope::update_task: called");
        if self.get_task(&task.owner, &task.id).await?.is_none() {
            return Err(StateError::NotFound(task.id.to_string()));
        }
        let mut overlay = self.overlay.lock().await;
        overlay.tasks.insert(task.id.clone(), Some(task.clone()));
        overlay.changes.push(TaskChange::Updated(task.clone()));
        Ok(task)
    }

    async fn delete_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
        debug!(%owner, %id, "TurnScope::delete_task: called");
        let Some(task) = self.get_task(owner, id).await? else {
            return Ok(None);
        };
        let mut overlay = self.overlay.lock().await;
        overlay.tasks.insert(id.clone(), None);
        overlay.changes.push(TaskChange::Deleted(task.clone()));
        Ok(Some(task))
    }
}
