use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::id::TaskId;

/// Task status token.
///
/// Three tokens drive propagation and form the lattice
/// `IN PROGRESS < DONE < COMPLETE`. Any other token is carried verbatim
/// and never triggers a cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    InProgress,
    Done,
    Complete,
    Other(String),
}

impl TaskStatus {
    pub const IN_PROGRESS: &'static str = "IN PROGRESS";
    pub const DONE: &'static str = "DONE";
    pub const COMPLETE: &'static str = "COMPLETE";

    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => Self::IN_PROGRESS,
            Self::Done => Self::DONE,
            Self::Complete => Self::COMPLETE,
            Self::Other(token) => token,
        }
    }

    /// DONE or COMPLETE: the statuses that let a parent auto-complete.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Done | Self::Complete)
    }
}

impl From<&str> for TaskStatus {
    fn from(token: &str) -> Self {
        match token {
            Self::IN_PROGRESS => Self::InProgress,
            Self::DONE => Self::Done,
            Self::COMPLETE => Self::Complete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(token: String) -> Self {
        match token.as_str() {
            Self::IN_PROGRESS => Self::InProgress,
            Self::DONE => Self::Done,
            Self::COMPLETE => Self::Complete,
            _ => Self::Other(token),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(token) => token,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(TaskStatus::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub parent_id: Option<TaskId>,
    pub header: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A status the caller must write for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: TaskId,
    pub status: TaskStatus,
}

impl StatusUpdate {
    pub fn new(id: TaskId, status: TaskStatus) -> Self {
        Self { id, status }
    }
}

/// Direct-children status tally for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCounts {
    pub total: usize,
    pub done: usize,
    pub complete: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub header: String,
    pub task_type: Option<String>,
    pub reviewer: Option<String>,
    pub target: Option<String>,
    pub limit: Option<String>,
    pub status: Option<TaskStatus>,
    pub parent_id: Option<TaskId>,
}

/// Partial update. `parent_id: Some(None)` detaches the task to a root.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub header: Option<String>,
    pub task_type: Option<String>,
    pub reviewer: Option<String>,
    pub target: Option<String>,
    pub limit: Option<String>,
    pub parent_id: Option<Option<TaskId>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListTasksFilter {
    pub parent_id: Option<TaskId>,
    pub roots_only: bool,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTree {
    pub task: Task,
    pub counts: DependencyCounts,
    pub children: Vec<TaskTree>,
}
