use thiserror::Error;

use crate::id::TaskId;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Parent task not found: {0}")]
    ParentNotFound(TaskId),

    /// Assigning the parent would make the task its own ancestor
    #[error("Circular dependency: task {task_id} cannot have {parent_id} as parent")]
    ParentCycle { task_id: TaskId, parent_id: TaskId },

    #[error("Cannot delete task {0}: it has children")]
    HasChildren(TaskId),

    #[error("Task header must not be empty")]
    EmptyHeader,

    #[error("Import rejected: {0}")]
    InvalidImport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CascadeError>;
