//! Built-in task tools

mod add_tags;
mod add_task;
mod complete_task;
mod delete_task;
mod get_upcoming_tasks;
mod list_tasks;
mod render;
mod search_tasks;
mod set_due_date;
mod set_priority;
mod set_recurrence;
mod update_task;

pub use add_tags::AddTagsTool;
pub use add_task::AddTaskTool;
pub use complete_task::CompleteTaskTool;
pub use delete_task::DeleteTaskTool;
pub use get_upcoming_tasks::GetUpcomingTasksTool;
pub use list_tasks::ListTasksTool;
pub use search_tasks::SearchTasksTool;
pub use set_due_date::SetDueDateTool;
pub use set_priority::SetPriorityTool;
pub use set_recurrence::SetRecurrenceTool;
pub use update_task::UpdateTaskTool;
