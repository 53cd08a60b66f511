//! Upcoming tasks tool

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError, ToolName, ToolResult};

use super::render::{date_part, priority_marker, task_json, tasks_of, text_of};

const DEFAULT_DAYS: i64 = 7;

/// Incomplete tasks due within the next `days` days, soonest first
///
/// Overdue tasks are included and flagged.
pub struct GetUpcomingTasksTool;

fn days_arg(input: &Value) -> Result<i64, ToolError> {
    let days = match input.get("days") {
        None | Some(Value::Null) => return Ok(DEFAULT_DAYS),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match days {
        Some(days) if days >= 0 => Ok(days),
        _ => Err(ToolError::validation("days must be a non-negative whole number")),
    }
}

#[async_trait]
impl Tool for GetUpcomingTasksTool {
    fn name(&self) -> ToolName {
        ToolName::GetUpcomingTasks
    }

    fn description(&self) -> &'static str {
        "Get tasks that are due soon or overdue"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "days": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Number of days to look ahead (default: 7)"
                }
            },
            "required": []
        })
    }

    fn failure_phrase(&self) -> &'static str {
        "get upcoming tasks"
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!(?input, "GetUpcomingTasksTool::execute: called");
        let days = days_arg(input)?;
        let horizon = Duration::try_days(days)
            .and_then(|span| ctx.now.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut tasks: Vec<_> = ctx
            .tasks
            .list_tasks(&ctx.owner)
            .await?
            .into_iter()
            .filter(|t| !t.completed && t.due_at.is_some_and(|due| due <= horizon))
            .collect();
        tasks.sort_by_key(|t| t.due_at);

        debug!(days, count = tasks.len(), "GetUpcomingTasksTool::execute: collected");
        let listed: Vec<Value> = tasks.iter().map(|t| task_json(t, ctx.now)).collect();
        Ok(json!({
            "days": days,
            "count": listed.len(),
            "tasks": listed,
        }))
    }

    fn narrate(&self, result: &ToolResult) -> String {
        let tasks = tasks_of(result);
        if tasks.is_empty() {
            let days = result.get("days").and_then(Value::as_i64).unwrap_or(DEFAULT_DAYS);
            return format!("You have no tasks due in the next {} days. ", days);
        }

        let mut fragment = format!("You have {} task(s) due soon:\n", tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            let due = date_part(&task["due_date"]).unwrap_or("No date");
            let mut line = format!("{}. {} {} - Due: {}", i + 1, priority_marker(task), text_of(task), due);
            if task["overdue"].as_bool().unwrap_or(false) {
                line.push_str(" ⚠️ OVERDUE");
            }
            fragment.push_str(&line);
            fragment.push('\n');
        }
        fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use crate::tools::builtin::testing::{context, now, run, seed};

    #[tokio::test]
    async fn test_upcoming_exclusions_and_overdue() {
        let (manager, ctx) = context();
        let tasks = seed(&manager, &["yesterday", "done", "undated", "in three days", "next month"]).await;

        let mut yesterday = tasks[0].clone();
        yesterday.due_at = Some(now() - Duration::days(1));
        manager.update_task(yesterday).await.unwrap();

        let mut done = tasks[1].clone();
        done.due_at = Some(now() + Duration::days(1));
        done.completed = true;
        manager.update_task(done).await.unwrap();

        let mut soon = tasks[3].clone();
        soon.due_at = Some(now() + Duration::days(3));
        soon.priority = Priority::High;
        manager.update_task(soon).await.unwrap();

        let mut later = tasks[4].clone();
        later.due_at = Some(now() + Duration::days(30));
        manager.update_task(later).await.unwrap();

        let (result, narrative) = run(&GetUpcomingTasksTool, json!({"days": 7}), &ctx).await;

        let listed: Vec<&str> = tasks_of(&result).iter().map(text_of).collect();
        assert_eq!(listed, vec!["yesterday", "in three days"]);
        assert_eq!(tasks_of(&result)[0]["overdue"], json!(true));
        assert_eq!(tasks_of(&result)[1]["overdue"], json!(false));
        assert_eq!(
            narrative,
            "You have 2 task(s) due soon:\n1. 🟡 yesterday - Due: 2026-01-06 ⚠️ OVERDUE\n2. 🔴 in three days - Due: 2026-01-10\n"
        );
    }

    #[tokio::test]
    async fn test_default_window_and_empty_narrative() {
        let (manager, ctx) = context();
        let tasks = seed(&manager, &["far"]).await;
        let mut far = tasks[0].clone();
        far.due_at = Some(now() + Duration::days(8));
        manager.update_task(far).await.unwrap();

        let (result, narrative) = run(&GetUpcomingTasksTool, json!({}), &ctx).await;
        assert_eq!(result.get("count"), Some(&json!(0)));
        assert_eq!(narrative, "You have no tasks due in the next 7 days. ");

        let (result, _) = run(&GetUpcomingTasksTool, json!({"days": "10"}), &ctx).await;
        assert_eq!(result.get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_days_validation() {
        assert_eq!(days_arg(&json!({})).unwrap(), 7);
        assert_eq!(days_arg(&json!({"days": 0})).unwrap(), 0);
        assert!(days_arg(&json!({"days": -1})).is_err());
        assert!(days_arg(&json!({"days": 1.5})).is_err());
        assert!(days_arg(&json!({"days": true})).is_err());
    }

    #[tokio::test]
    async fn test_huge_window_does_not_overflow() {
        let (manager, ctx) = context();
        let tasks = seed(&manager, &["someday"]).await;
        let mut task = tasks[0].clone();
        task.due_at = Some(now() + Duration::days(3650));
        manager.update_task(task).await.unwrap();

        let (result, _) = run(&GetUpcomingTasksTool, json!({"days": i64::MAX}), &ctx).await;
        assert_eq!(result.get("count"), Some(&json!(1)));
    }
}
