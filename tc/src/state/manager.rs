//! StateManager - actor that owns TaskStore
//!
//! Processes commands via channels for thread-safe access to persistent state.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{OwnedMutexGuard, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{ChatMessage, Conversation, ConversationId, Filter, Store, Task, TaskId};

use super::locks::OwnerLocks;
use super::messages::{StateCommand, StateError, StateResponse, TaskChange, TurnCommit};

/// Handle to send commands to the StateManager
///
/// Clones share the actor and the owner lock table.
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    owners: Arc<OwnerLocks>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the store in `store_path`
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let mut store = Store::open(store_path.as_ref())?;

        let task_count = store.rebuild_indexes::<Task>()?;
        let conversation_count = store.rebuild_indexes::<Conversation>()?;
        let message_count = store.rebuild_indexes::<ChatMessage>()?;
        info!(
            task_count,
            conversation_count, message_count, "Rebuilt indexes for Task, Conversation, and ChatMessage records"
        );

        Ok(Self::spawn_with_store(store))
    }

    /// Spawn an actor over a throwaway in-memory store
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        debug!("spawn_in_memory: called");
        Ok(Self::spawn_with_store(Store::open_in_memory()?))
    }

    fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self {
            tx,
            owners: Arc::new(OwnerLocks::new()),
        }
    }

    /// Exclusive right to read-modify-write `owner`'s tasks
    ///
    /// Hold the guard from the first read until the writes are stored.
    pub async fn lock_owner(&self, owner: &str) -> OwnedMutexGuard<()> {
        debug!(%owner, "lock_owner: called");
        self.owners.acquire(&owner.to_string()).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand,
    ) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Task operations ===

    /// Create a new Task record
    pub async fn create_task(&self, task: Task) -> StateResponse<TaskId> {
        debug!(task_id = %task.id, owner = %task.owner, "create_task: called");
        self.request(|reply| StateCommand::CreateTask { task, reply }).await
    }

    /// Get a task by ID, scoped to its owner
    pub async fn get_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
        debug!(%owner, %id, "get_task: called");
        self.request(|reply| StateCommand::GetTask {
            owner: owner.to_string(),
            id: id.clone(),
            reply,
        })
        .await
    }

    /// Replace an existing task
    pub async fn update_task(&self, task: Task) -> StateResponse<()> {
        debug!(task_id = %task.id, "update_task: called");
        self.request(|reply| StateCommand::UpdateTask { task, reply }).await
    }

    /// Delete a task, returning the removed record
    pub async fn delete_task(&self, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
        debug!(%owner, %id, "delete_task: called");
        self.request(|reply| StateCommand::DeleteTask {
            owner: owner.to_string(),
            id: id.clone(),
            reply,
        })
        .await
    }

    /// All of an owner's tasks in creation order
    pub async fn list_tasks(&self, owner: &str) -> StateResponse<Vec<Task>> {
        debug!(%owner, "list_tasks: called");
        self.request(|reply| StateCommand::ListTasks {
            owner: owner.to_string(),
            reply,
        })
        .await
    }

    // === Conversation operations ===

    pub async fn get_conversation(&self, id: &ConversationId) -> StateResponse<Option<Conversation>> {
        debug!(%id, "get_conversation: called");
        self.request(|reply| StateCommand::GetConversation { id: id.clone(), reply })
            .await
    }

    pub async fn list_conversations(&self, owner: &str) -> StateResponse<Vec<Conversation>> {
        debug!(%owner, "list_conversations: called");
        self.request(|reply| StateCommand::ListConversations {
            owner: owner.to_string(),
            reply,
        })
        .await
    }

    /// Every message of a conversation, oldest first
    pub async fn list_messages(&self, conversation_id: &ConversationId) -> StateResponse<Vec<ChatMessage>> {
        debug!(%conversation_id, "list_messages: called");
        self.request(|reply| StateCommand::ListMessages {
            conversation_id: conversation_id.clone(),
            reply,
        })
        .await
    }

    /// Persist a whole chat turn atomically
    pub async fn commit_turn(&self, commit: TurnCommit) -> StateResponse<()> {
        debug!(
            conversation_id = %commit.conversation.id,
            message_count = commit.messages.len(),
            change_count = commit.changes.len(),
            "commit_turn: called"
        );
        self.request(|reply| StateCommand::CommitTurn {
            commit: Box::new(commit),
            reply,
        })
        .await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

fn store_err(e: eyre::Report) -> StateError {
    StateError::StoreError(e.to_string())
}

fn owned_task(store: &Store, owner: &str, id: &TaskId) -> StateResponse<Option<Task>> {
    let task: Option<Task> = store.get(id.as_str()).map_err(store_err)?;
    Ok(task.filter(|t| t.owner == owner))
}

fn apply_commit(store: &mut Store, commit: &TurnCommit) -> StateResponse<()> {
    store
        .transaction(|batch| {
            batch.upsert(&commit.conversation)?;
            for message in &commit.messages {
                batch.create(message)?;
            }
            for change in &commit.changes {
                match change {
                    TaskChange::Created(task) => batch.create(task)?,
                    TaskChange::Updated(task) => batch.update(task)?,
                    TaskChange::Deleted(task) => {
                        batch.delete::<Task>(task.id.as_str())?;
                    }
                }
            }
            Ok(())
        })
        .map_err(store_err)
}

/// The actor loop that processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("actor_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateTask { task, reply } => {
                debug!(task_id = %task.id, "actor_loop: CreateTask command");
                let id = task.id.clone();
                let result = store.create(task).map(|_| id).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetTask { owner, id, reply } => {
                debug!(%id, "actor_loop: GetTask command");
                let _ = reply.send(owned_task(&store, &owner, &id));
            }

            StateCommand::UpdateTask { task, reply } => {
                debug!(task_id = %task.id, "actor_loop: UpdateTask command");
                let result = match owned_task(&store, &task.owner, &task.id) {
                    Ok(Some(_)) => store.update(task).map_err(store_err),
                    Ok(None) => Err(StateError::NotFound(task.id.to_string())),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }

            StateCommand::DeleteTask { owner, id, reply } => {
                debug!(%id, "actor_loop: DeleteTask command");
                let result = match owned_task(&store, &owner, &id) {
                    Ok(Some(task)) => store.delete::<Task>(id.as_str()).map(|_| Some(task)).map_err(store_err),
                    other => other,
                };
                let _ = reply.send(result);
            }

            StateCommand::ListTasks { owner, reply } => {
                debug!(%owner, "actor_loop: ListTasks command");
                let result: StateResponse<Vec<Task>> = store
                    .list(&[Filter::eq("owner", owner)])
                    .map(|mut tasks: Vec<Task>| {
                        tasks.sort_by_key(|t| t.created_at);
                        tasks
                    })
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetConversation { id, reply } => {
                debug!(%id, "actor_loop: GetConversation command");
                let result = store.get(id.as_str()).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListConversations { owner, reply } => {
                debug!(%owner, "actor_loop: ListConversations command");
                let result = store.list(&[Filter::eq("owner", owner)]).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListMessages { conversation_id, reply } => {
                debug!(%conversation_id, "actor_loop: ListMessages command");
                let result: StateResponse<Vec<ChatMessage>> = store
                    .list(&[Filter::eq("conversation_id", conversation_id.to_string())])
                    .map(|mut messages: Vec<ChatMessage>| {
                        messages.sort_by_key(|m| m.created_at);
                        messages
                    })
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::CommitTurn { commit, reply } => {
                debug!(conversation_id = %commit.conversation.id, "actor_loop: CommitTurn command");
                let result = apply_commit(&mut store, &commit);
                if let Err(e) = &result {
                    warn!(error = %e, "actor_loop: turn commit rolled back");
                }
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("actor_loop: exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Origin;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_manager_task_crud() {
        let temp = tempdir().unwrap();
        let manager = StateManager::spawn(temp.path()).unwrap();

        let task = Task::new("alice", "Buy milk", Origin::DirectApi, Utc::now());
        let id = manager.create_task(task.clone()).await.unwrap();
        assert_eq!(id, task.id);

        let mut retrieved = manager.get_task("alice", &id).await.unwrap().unwrap();
        assert_eq!(retrieved.text, "Buy milk");

        retrieved.completed = true;
        manager.update_task(retrieved).await.unwrap();
        assert!(manager.get_task("alice", &id).await.unwrap().unwrap().completed);

        let deleted = manager.delete_task("alice", &id).await.unwrap();
        assert!(deleted.is_some());
        assert!(manager.list_tasks("alice").await.unwrap().is_empty());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_tasks_are_owner_scoped() {
        let manager = StateManager::spawn_in_memory().unwrap();
        let task = Task::new("alice", "Secret", Origin::Chat, Utc::now());
        let id = manager.create_task(task.clone()).await.unwrap();

        assert!(manager.get_task("bob", &id).await.unwrap().is_none());
        assert!(manager.list_tasks("bob").await.unwrap().is_empty());
        assert!(manager.delete_task("bob", &id).await.unwrap().is_none());

        let mut stolen = task;
        stolen.owner = "bob".to_string();
        assert!(matches!(
            manager.update_task(stolen).await,
            Err(StateError::NotFound(_))
        ));
        assert_eq!(manager.list_tasks("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_tasks_in_creation_order() {
        let manager = StateManager::spawn_in_memory().unwrap();
        let now = Utc::now();
        let a = Task::new("alice", "A", Origin::Chat, now);
        let b = Task::new("alice", "B", Origin::Chat, now);
        let c = Task::new("alice", "C", Origin::Chat, now + Duration::seconds(1));
        manager.create_task(a).await.unwrap();
        manager.create_task(b).await.unwrap();
        manager.create_task(c).await.unwrap();

        let texts: Vec<String> = manager
            .list_tasks("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_commit_turn_is_atomic() {
        let manager = StateManager::spawn_in_memory().unwrap();
        let now = Utc::now();
        let conversation = Conversation::new("alice", now);
        let prompt = ChatMessage::user(&conversation, "add a task", now);
        let ghost = Task::new("alice", "Never stored", Origin::Chat, now);

        let commit = TurnCommit {
            conversation: conversation.clone(),
            messages: vec![prompt],
            changes: vec![
                TaskChange::Created(Task::new("alice", "Staged", Origin::Chat, now)),
                TaskChange::Updated(ghost),
            ],
        };
        assert!(manager.commit_turn(commit).await.is_err());

        assert!(manager.get_conversation(&conversation.id).await.unwrap().is_none());
        assert!(manager.list_messages(&conversation.id).await.unwrap().is_empty());
        assert!(manager.list_tasks("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_turn_persists_everything() {
        let manager = StateManager::spawn_in_memory().unwrap();
        let now = Utc::now();
        let conversation = Conversation::new("alice", now);
        let prompt = ChatMessage::user(&conversation, "add a task", now);
        let reply = ChatMessage::assistant_reply(&prompt, "done", vec![], now);

        let commit = TurnCommit {
            conversation: conversation.clone(),
            messages: vec![prompt.clone(), reply.clone()],
            changes: vec![TaskChange::Created(Task::new("alice", "Staged", Origin::Chat, now))],
        };
        manager.commit_turn(commit).await.unwrap();

        let messages = manager.list_messages(&conversation.id).await.unwrap();
        assert_eq!(messages, vec![prompt, reply]);
        assert_eq!(manager.list_tasks("alice").await.unwrap().len(), 1);
        assert_eq!(manager.list_conversations("alice").await.unwrap().len(), 1);
    }
}
