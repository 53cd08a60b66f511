//! Tool catalog
//!
//! The closed set of operations the planner may call. Each name maps to its
//! handler through an exhaustive match, so adding a name without a handler
//! does not compile.

use super::Tool;
use super::ToolError;
use super::builtin::{
    AddTagsTool, AddTaskTool, CompleteTaskTool, DeleteTaskTool, GetUpcomingTasksTool, ListTasksTool, SearchTasksTool,
    SetDueDateTool, SetPriorityTool, SetRecurrenceTool, UpdateTaskTool,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    AddTask,
    ListTasks,
    CompleteTask,
    DeleteTask,
    UpdateTask,
    SetPriority,
    AddTags,
    SearchTasks,
    SetDueDate,
    SetRecurrence,
    GetUpcomingTasks,
}

impl ToolName {
    /// Catalog order, which is also the order schemas are shown to the planner
    pub const ALL: [ToolName; 11] = [
        ToolName::AddTask,
        ToolName::ListTasks,
        ToolName::CompleteTask,
        ToolName::DeleteTask,
        ToolName::UpdateTask,
        ToolName::SetPriority,
        ToolName::AddTags,
        ToolName::SearchTasks,
        ToolName::SetDueDate,
        ToolName::SetRecurrence,
        ToolName::GetUpcomingTasks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddTask => "add_task",
            Self::ListTasks => "list_tasks",
            Self::CompleteTask => "complete_task",
            Self::DeleteTask => "delete_task",
            Self::UpdateTask => "update_task",
            Self::SetPriority => "set_priority",
            Self::AddTags => "add_tags",
            Self::SearchTasks => "search_tasks",
            Self::SetDueDate => "set_due_date",
            Self::SetRecurrence => "set_recurrence",
            Self::GetUpcomingTasks => "get_upcoming_tasks",
        }
    }

    /// Handler serving this name
    pub fn handler(&self) -> Box<dyn Tool> {
        match self {
            Self::AddTask => Box::new(AddTaskTool),
            Self::ListTasks => Box::new(ListTasksTool),
            Self::CompleteTask => Box::new(CompleteTaskTool),
            Self::DeleteTask => Box::new(DeleteTaskTool),
            Self::UpdateTask => Box::new(UpdateTaskTool),
            Self::SetPriority => Box::new(SetPriorityTool),
            Self::AddTags => Box::new(AddTagsTool),
            Self::SearchTasks => Box::new(SearchTasksTool),
            Self::SetDueDate => Box::new(SetDueDateTool),
            Self::SetRecurrence => Box::new(SetRecurrenceTool),
            Self::GetUpcomingTasks => Box::new(GetUpcomingTasksTool),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
        }
        assert!(matches!("fly".parse::<ToolName>(), Err(ToolError::UnknownTool(_))));
    }

    #[test]
    fn test_handlers_match_names() {
        for name in ToolName::ALL {
            let handler = name.handler();
            assert_eq!(handler.name(), name);
            assert_eq!(handler.input_schema()["type"], "object");
            assert!(!handler.failure_phrase().is_empty());
        }
    }
}
