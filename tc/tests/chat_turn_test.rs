//! Integration tests for chat turns
//!
//! These drive `ChatSession` end to end with a scripted planner standing in
//! for the language model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use taskchat::chat::{ChatSession, REFERENCE_HEADER, TIMEOUT_REPLY, TurnError, TurnRequest, TurnResponse};
use taskchat::config::Config;
use taskchat::domain::{MessageRole, Recurrence, Task};
use taskchat::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Role, ToolCall};
use taskchat::notify::{NotificationKind, Notifier};
use taskchat::prompts::PromptLoader;
use taskchat::state::StateManager;
use tempfile::TempDir;

// =============================================================================
// Scripted planner
// =============================================================================

type Step = Box<dyn Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync>;

/// Answers each call with the next scripted step and records every request
#[derive(Default)]
struct ScriptedPlanner {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedPlanner {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn then(&self, step: impl Fn(&CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync + 'static) {
        self.steps.lock().unwrap().push_back(Box::new(step));
    }

    /// Queue a reply made of tool calls
    fn calls(&self, calls: Vec<(&str, Value)>) {
        let calls: Vec<ToolCall> = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, input))| ToolCall::new(format!("call_{}", i), name, input))
            .collect();
        self.then(move |_| Ok(CompletionResponse::calls(calls.clone())));
    }

    fn text(&self, text: &str) {
        let text = text.to_string();
        self.then(move |_| Ok(CompletionResponse::text(text.clone())));
    }

    fn last_request(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().expect("planner was never called")
    }
}

#[async_trait]
impl LlmClient for ScriptedPlanner {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let step = self.steps.lock().unwrap().pop_front();
        let response = match step {
            Some(step) => step(&request),
            None => Err(LlmError::InvalidResponse("script exhausted".to_string())),
        };
        self.requests.lock().unwrap().push(request);
        response
    }
}

struct Harness {
    session: Arc<ChatSession>,
    planner: Arc<ScriptedPlanner>,
    state: StateManager,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with(ScriptedPlanner::new(), Config::default())
    }

    fn with(planner: ScriptedPlanner, config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let state = StateManager::spawn(dir.path()).expect("Failed to open store");
        let planner = Arc::new(planner);
        let session = ChatSession::new(state.clone(), planner.clone(), Arc::new(Notifier::default()), &config)
            .with_prompts(PromptLoader::embedded_only());
        Self {
            session: Arc::new(session),
            planner,
            state,
            _dir: dir,
        }
    }

    async fn say(&self, owner: &str, conversation: Option<&TurnResponse>, message: &str) -> TurnResponse {
        let conversation = conversation.map(|c| c.conversation_id.to_string());
        self.session
            .process_turn(owner, TurnRequest::new(conversation, message))
            .await
            .expect("turn failed")
    }

    async fn tasks(&self, owner: &str) -> Vec<Task> {
        self.state.list_tasks(owner).await.unwrap()
    }
}

fn ids_in_reference(request: &CompletionRequest) -> Vec<String> {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::System && m.content.starts_with(REFERENCE_HEADER))
        .flat_map(|m| m.content.lines().skip(1))
        .filter_map(|line| line.split_once(" ID: ").map(|(_, id)| id.to_string()))
        .collect()
}

// =============================================================================
// Ownership and ordinals
// =============================================================================

#[tokio::test]
async fn test_owners_never_see_each_others_tasks() {
    let h = Harness::new();
    h.planner.calls(vec![("add_task", json!({"text": "alice's secret"}))]);
    h.planner.calls(vec![("list_tasks", json!({}))]);
    h.planner.calls(vec![("complete_task", json!({"task_id": "1"}))]);

    h.say("alice", None, "add alice's secret").await;
    let listing = h.say("bob", None, "show my tasks").await;
    let completion = h.say("bob", None, "complete task 1").await;

    assert_eq!(listing.message, "You have no tasks yet.");
    assert!(!completion.tool_calls[0].result.success);
    assert_eq!(
        completion.tool_calls[0].result.error.as_deref(),
        Some("Task position 1 not found (you have 0 tasks)")
    );
    assert!(!h.tasks("alice").await[0].completed);
}

#[tokio::test]
async fn test_second_of_three_completes_b() {
    let h = Harness::new();
    for text in ["A", "B", "C"] {
        h.planner.calls(vec![("add_task", json!({"text": text}))]);
    }
    h.planner.calls(vec![("complete_task", json!({"task_id": "2"}))]);

    let first = h.say("alice", None, "add A").await;
    h.say("alice", Some(&first), "add B").await;
    h.say("alice", Some(&first), "add C").await;
    let response = h.say("alice", Some(&first), "complete task 2").await;

    assert_eq!(response.message, "Task 'B' marked as complete");
    let done: Vec<bool> = h.tasks("alice").await.iter().map(|t| t.completed).collect();
    assert_eq!(done, vec![false, true, false]);
}

#[tokio::test]
async fn test_failed_call_does_not_stop_later_calls() {
    let h = Harness::new();
    h.planner.calls(vec![
        ("complete_task", json!({"task_id": "9"})),
        ("add_task", json!({"text": "still added"})),
        ("fly_to_moon", json!({})),
    ]);

    let response = h.say("alice", None, "do things").await;

    let outcomes: Vec<bool> = response.tool_calls.iter().map(|c| c.result.success).collect();
    assert_eq!(outcomes, vec![false, true, false]);
    assert!(response.message.starts_with("Sorry, I couldn't complete that task: Task position 9 not found"));
    assert!(response.message.contains("I've added 'still added' to your tasks."));
    assert!(response.message.ends_with("Sorry, I couldn't do that: Unknown tool: fly_to_moon."));
    assert_eq!(h.tasks("alice").await.len(), 1);
}

// =============================================================================
// Reference ledger
// =============================================================================

#[tokio::test]
async fn test_listing_ids_round_trip_through_next_turn() {
    let h = Harness::new();
    h.planner.calls(vec![
        ("add_task", json!({"text": "milk"})),
        ("add_task", json!({"text": "eggs"})),
    ]);
    h.planner.calls(vec![("list_tasks", json!({}))]);
    h.planner.text("Sure.");
    // The planner deletes "task 2" by the ID the reference entry gives it
    h.planner.then(|request| {
        let ids = ids_in_reference(request);
        Ok(CompletionResponse::calls(vec![ToolCall::new(
            "call_0",
            "delete_task",
            json!({"task_id": ids[1]}),
        )]))
    });

    let first = h.say("alice", None, "add milk and eggs").await;
    let listing = h.say("alice", Some(&first), "what do I have?").await;
    h.say("alice", Some(&first), "thanks").await;

    let listed: Vec<String> = listing.tool_calls[0].result.get("tasks").unwrap().as_array().unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids_in_reference(&h.planner.last_request()), listed);

    let response = h.say("alice", Some(&first), "delete the second one").await;

    assert_eq!(response.message, "Task 'eggs' has been deleted");
    let remaining: Vec<String> = h.tasks("alice").await.into_iter().map(|t| t.text).collect();
    assert_eq!(remaining, vec!["milk"]);
}

#[tokio::test]
async fn test_reference_entry_is_not_persisted() {
    let h = Harness::new();
    h.planner.calls(vec![("list_tasks", json!({}))]);

    let response = h.say("alice", None, "list").await;
    let history = h.session.history("alice", response.conversation_id.as_str()).await.unwrap();

    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|m| !m.content.contains(REFERENCE_HEADER)));
    assert_eq!(history[1].tool_calls[0].function, "list_tasks");
}

// =============================================================================
// Tool behaviour through full turns
// =============================================================================

#[tokio::test]
async fn test_weekly_recurrence_spawns_next_week() {
    let h = Harness::new();
    h.planner.calls(vec![(
        "add_task",
        json!({"text": "water plants", "due_date": "2026-01-01", "recurrence": "weekly", "tags": ["home"]}),
    )]);
    h.planner.calls(vec![("complete_task", json!({"task_id": "1"}))]);
    h.planner.calls(vec![("complete_task", json!({"task_id": "1"}))]);

    let first = h.say("alice", None, "water plants weekly from jan 1").await;
    let response = h.say("alice", Some(&first), "done with task 1").await;

    assert_eq!(response.message, "Task 'water plants' marked as complete and rescheduled for 2026-01-08");
    let tasks = h.tasks("alice").await;
    assert_eq!(tasks.len(), 2);
    let next = &tasks[1];
    assert!(!next.completed);
    assert_eq!(next.recurrence, Recurrence::Weekly);
    assert_eq!(next.due_at.unwrap().format("%Y-%m-%d").to_string(), "2026-01-08");
    assert!(next.tags.contains("home"));

    // Re-completing the original is a no-op
    let again = h.say("alice", Some(&first), "done with task 1").await;
    assert_eq!(again.tool_calls[0].result.get("already_completed"), Some(&json!(true)));
    assert_eq!(h.tasks("alice").await.len(), 2);
}

#[tokio::test]
async fn test_tags_are_idempotent() {
    let h = Harness::new();
    h.planner.calls(vec![
        ("add_task", json!({"text": "report", "tags": ["work"]})),
        ("add_tags", json!({"task_id": "1", "tags": ["work", "urgent"]})),
        ("add_tags", json!({"task_id": 1, "tags": "urgent"})),
    ]);

    h.say("alice", None, "tag the report").await;

    let tags: Vec<String> = h.tasks("alice").await[0].tags.iter().cloned().collect();
    assert_eq!(tags, vec!["urgent", "work"]);
}

#[tokio::test]
async fn test_unparseable_due_date_is_dropped() {
    let h = Harness::new();
    h.planner.calls(vec![("add_task", json!({"text": "someday", "due_date": "when pigs fly"}))]);

    let response = h.say("alice", None, "someday").await;

    assert!(response.tool_calls[0].result.success);
    assert!(h.tasks("alice").await[0].due_at.is_none());
}

#[tokio::test]
async fn test_upcoming_excludes_completed_undated_and_distant() {
    let h = Harness::new();
    h.planner.calls(vec![
        ("add_task", json!({"text": "soon", "due_date": "tomorrow"})),
        ("add_task", json!({"text": "late", "due_date": "yesterday"})),
        ("add_task", json!({"text": "far", "due_date": "in 30 days"})),
        ("add_task", json!({"text": "undated"})),
        ("add_task", json!({"text": "finished", "due_date": "tomorrow"})),
        ("complete_task", json!({"task_id": "5"})),
        ("get_upcoming_tasks", json!({})),
    ]);

    let response = h.say("alice", None, "what's coming up?").await;

    let upcoming = response.tool_calls.last().unwrap();
    let texts: Vec<&str> = upcoming.result.get("tasks").unwrap().as_array().unwrap()
        .iter()
        .map(|t| t["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["late", "soon"]);
    assert!(response.message.contains("late - Due:"));
    assert!(response.message.contains("⚠️ OVERDUE"));
}

#[tokio::test]
async fn test_search_ignores_case() {
    let h = Harness::new();
    h.planner.calls(vec![
        ("add_task", json!({"text": "Buy MILK"})),
        ("add_task", json!({"text": "call bank"})),
        ("search_tasks", json!({"query": "milk"})),
    ]);

    let response = h.say("alice", None, "find milk").await;

    assert_eq!(response.tool_calls[2].result.get("count"), Some(&json!(1)));
    assert!(response.message.contains("Found 1 task(s) matching 'milk'"));
}

// =============================================================================
// Session guarantees
// =============================================================================

#[tokio::test]
async fn test_planner_failure_commits_nothing() {
    let h = Harness::new();
    h.planner.calls(vec![("add_task", json!({"text": "kept"}))]);
    h.planner
        .then(|_| Err(LlmError::InvalidResponse("boom".to_string())));

    let first = h.say("alice", None, "add kept").await;
    let err = h
        .session
        .process_turn("alice", TurnRequest::new(Some(first.conversation_id.to_string()), "again"))
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Planner(_)));
    let history = h.session.history("alice", first.conversation_id.as_str()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(h.tasks("alice").await.len(), 1);
}

#[tokio::test]
async fn test_planner_timeout_gives_clarification() {
    let mut config = Config::default();
    config.chat.planner_timeout_ms = 20;
    let h = Harness::with(ScriptedPlanner::with_delay(Duration::from_millis(300)), config);
    h.planner.calls(vec![("add_task", json!({"text": "never"}))]);

    let response = h.say("alice", None, "add never").await;

    assert_eq!(response.message, TIMEOUT_REPLY);
    assert!(response.tool_calls.is_empty());
    assert!(h.tasks("alice").await.is_empty());
}

#[tokio::test]
async fn test_turns_on_one_conversation_are_serialized() {
    let h = Harness::with(ScriptedPlanner::with_delay(Duration::from_millis(50)), Config::default());
    h.planner.text("first");
    h.planner.calls(vec![("add_task", json!({"text": "a"}))]);
    h.planner.calls(vec![("add_task", json!({"text": "b"}))]);

    let start = h.say("alice", None, "hi").await;
    let id = Some(start.conversation_id.to_string());

    let (one, two) = tokio::join!(
        h.session.process_turn("alice", TurnRequest::new(id.clone(), "add a")),
        h.session.process_turn("alice", TurnRequest::new(id.clone(), "add b")),
    );
    one.unwrap();
    two.unwrap();

    let history = h.session.history("alice", start.conversation_id.as_str()).await.unwrap();
    let roles: Vec<MessageRole> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
        ]
    );
    assert!(history.windows(2).all(|w| w[0].created_at < w[1].created_at));
    assert_eq!(h.tasks("alice").await.len(), 2);
}

#[tokio::test]
async fn test_committed_changes_fan_out_to_subscribers() {
    let h = Harness::new();
    let mut first = h.session.notifier().subscribe("alice");
    let mut second = h.session.notifier().subscribe("alice");
    let mut bob = h.session.notifier().subscribe("bob");
    h.planner.calls(vec![
        ("add_task", json!({"text": "milk"})),
        ("delete_task", json!({"task_id": "1"})),
    ]);

    h.say("alice", None, "add then remove milk").await;

    for rx in [&mut first, &mut second] {
        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::TaskCreated);
        assert_eq!(rx.recv().await.unwrap().kind, NotificationKind::TaskDeleted);
    }
    assert!(bob.try_recv().is_err());
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();
    let planner = Arc::new(ScriptedPlanner::new());
    planner.calls(vec![("add_task", json!({"text": "persist me"}))]);

    let conversation = {
        let state = StateManager::spawn(dir.path()).unwrap();
        let session = ChatSession::new(state.clone(), planner.clone(), Arc::new(Notifier::default()), &Config::default())
            .with_prompts(PromptLoader::embedded_only());
        let response = session.process_turn("alice", TurnRequest::new(None, "add it")).await.unwrap();
        state.shutdown().await.unwrap();
        response.conversation_id
    };

    let state = StateManager::spawn(dir.path()).unwrap();
    let history = taskchat::chat::history(&state, "alice", conversation.as_str()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].tool_calls[0].function, "add_task");
    assert_eq!(state.list_tasks("alice").await.unwrap()[0].text, "persist me");
}
