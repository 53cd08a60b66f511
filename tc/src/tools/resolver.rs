//! Ordinal resolver
//!
//! A task reference is either a 1-based position ("2") or a task ID. Positions
//! index a fresh owner-scoped snapshot ordered oldest first, so "task 2" is
//! always the second-oldest current task rather than a stable handle. Task IDs
//! carry a non-numeric prefix, so the two forms never collide.

use tracing::debug;

use crate::domain::{Task, TaskId};
use crate::state::TaskRepository;

use super::{ReferenceError, ToolError};

/// Resolve `token` to one of `owner`'s tasks
pub async fn resolve(repo: &dyn TaskRepository, owner: &str, token: &str) -> Result<Task, ToolError> {
    let token = token.trim();
    debug!(%owner, %token, "resolve: called");

    if token.is_empty() {
        return Err(ReferenceError::MalformedReference(token.to_string()).into());
    }

    if token.bytes().all(|b| b.is_ascii_digit()) {
        let mut tasks = repo.list_tasks(owner).await?;
        let count = tasks.len();
        let position = token
            .parse::<usize>()
            .ok()
            .and_then(|ordinal| ordinal.checked_sub(1))
            .filter(|position| *position < count);
        return match position {
            Some(position) => Ok(tasks.swap_remove(position)),
            None => {
                debug!(%token, count, "resolve: ordinal out of range");
                Err(ReferenceError::OutOfRange {
                    reference: token.to_string(),
                    count,
                }
                .into())
            }
        };
    }

    let id = TaskId::parse(token).map_err(|_| ReferenceError::MalformedReference(token.to_string()))?;
    repo.get_task(owner, &id).await?.ok_or_else(|| {
        ReferenceError::NotFound {
            reference: token.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Origin;
    use crate::state::{StateManager, TurnScope};
    use chrono::{Duration, Utc};

    async fn seeded(owner: &str, texts: &[&str]) -> (StateManager, Vec<Task>) {
        let manager = StateManager::spawn_in_memory().unwrap();
        let start = Utc::now() - Duration::hours(1);
        let mut tasks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let task = Task::new(owner, *text, Origin::Chat, start + Duration::seconds(i as i64));
            manager.create_task(task.clone()).await.unwrap();
            tasks.push(task);
        }
        (manager, tasks)
    }

    #[tokio::test]
    async fn test_ordinal_picks_by_creation_order() {
        let (manager, tasks) = seeded("alice", &["A", "B", "C"]).await;
        let task = resolve(&manager, "alice", "2").await.unwrap();
        assert_eq!(task.id, tasks[1].id);
        assert_eq!(task.text, "B");

        let task = resolve(&manager, "alice", " 03 ").await.unwrap();
        assert_eq!(task.text, "C");
    }

    #[tokio::test]
    async fn test_ordinal_out_of_range() {
        let (manager, _) = seeded("alice", &["A", "B"]).await;

        for token in ["0", "3", "99999999999999999999999"] {
            let err = resolve(&manager, "alice", token).await.unwrap_err();
            assert!(
                matches!(err, ToolError::Reference(ReferenceError::OutOfRange { count: 2, .. })),
                "token {token}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_identifier_lookup() {
        let (manager, tasks) = seeded("alice", &["A"]).await;
        let task = resolve(&manager, "alice", tasks[0].id.as_str()).await.unwrap();
        assert_eq!(task.text, "A");

        let missing = TaskId::generate();
        let err = resolve(&manager, "alice", missing.as_str()).await.unwrap_err();
        assert!(matches!(err, ToolError::Reference(ReferenceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_malformed_references() {
        let (manager, _) = seeded("alice", &["A"]).await;
        for token in ["", "  ", "milk", "-1", "1.5", "task-xyz"] {
            let err = resolve(&manager, "alice", token).await.unwrap_err();
            assert!(
                matches!(err, ToolError::Reference(ReferenceError::MalformedReference(_))),
                "token {token:?}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_foreign_task_is_not_found() {
        let (manager, tasks) = seeded("alice", &["A"]).await;
        let err = resolve(&manager, "bob", tasks[0].id.as_str()).await.unwrap_err();
        assert!(matches!(err, ToolError::Reference(ReferenceError::NotFound { .. })));

        let err = resolve(&manager, "bob", "1").await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Reference(ReferenceError::OutOfRange { count: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_snapshot_sees_staged_writes() {
        let (manager, tasks) = seeded("alice", &["A", "B", "C"]).await;
        let scope = TurnScope::new(manager);
        scope.delete_task("alice", &tasks[0].id).await.unwrap();

        let task = resolve(&scope, "alice", "1").await.unwrap();
        assert_eq!(task.text, "B");
    }
}
