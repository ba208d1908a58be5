use clap::{Args, Subcommand};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::core::TaskService;
use crate::error::Result;
use crate::id::TaskId;
use crate::types::{
    CreateTaskInput, DependencyCounts, ListTasksFilter, StatusUpdate, Task, TaskStatus, TaskTree,
    UpdateTaskInput,
};

/// Parse TaskId from CLI string (positive integer)
fn parse_task_id(s: &str) -> std::result::Result<TaskId, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Status tokens are taken verbatim; quote `"IN PROGRESS"` in the shell.
fn parse_status(s: &str) -> std::result::Result<TaskStatus, String> {
    if s.trim().is_empty() {
        return Err("status must not be empty".to_string());
    }
    Ok(TaskStatus::from(s))
}

#[derive(Subcommand, Clone)]
pub enum TaskCommand {
    Create(CreateArgs),
    Get {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    List(ListArgs),
    Update(UpdateArgs),
    /// Set a status and apply the resulting cascade
    Status(StatusArgs),
    /// Reassign a task's parent (or detach it with --root)
    Move(MoveArgs),
    Delete {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    Tree(TreeArgs),
    Ancestors {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    Descendants {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    /// Ids that can never become this task's parent (itself and its descendants)
    InvalidParents {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    Children {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    Counts {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },
    /// Report whether a parent assignment would create a cycle
    CheckParent(CheckParentArgs),
}

#[derive(Args, Clone)]
pub struct CreateArgs {
    #[arg(short = 'H', long)]
    pub header: String,

    #[arg(long = "type")]
    pub task_type: Option<String>,

    #[arg(long)]
    pub reviewer: Option<String>,

    #[arg(long)]
    pub target: Option<String>,

    #[arg(long)]
    pub limit: Option<String>,

    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    #[arg(long, value_parser = parse_task_id)]
    pub parent: Option<TaskId>,
}

#[derive(Args, Clone)]
pub struct ListArgs {
    #[arg(long, value_parser = parse_task_id, conflicts_with = "roots")]
    pub parent: Option<TaskId>,

    /// Only tasks without a parent
    #[arg(long)]
    pub roots: bool,

    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,
}

#[derive(Args, Clone)]
pub struct UpdateArgs {
    #[arg(value_parser = parse_task_id)]
    pub id: TaskId,

    #[arg(short = 'H', long)]
    pub header: Option<String>,

    #[arg(long = "type")]
    pub task_type: Option<String>,

    #[arg(long)]
    pub reviewer: Option<String>,

    #[arg(long)]
    pub target: Option<String>,

    #[arg(long)]
    pub limit: Option<String>,
}

#[derive(Args, Clone)]
pub struct StatusArgs {
    #[arg(value_parser = parse_task_id)]
    pub id: TaskId,

    #[arg(value_parser = parse_status)]
    pub status: TaskStatus,
}

#[derive(Args, Clone)]
#[command(group = clap::ArgGroup::new("destination").required(true).multiple(false))]
pub struct MoveArgs {
    #[arg(value_parser = parse_task_id)]
    pub id: TaskId,

    #[arg(long, value_parser = parse_task_id, group = "destination")]
    pub parent: Option<TaskId>,

    /// Detach the task and make it a root
    #[arg(long, group = "destination")]
    pub root: bool,
}

#[derive(Args, Clone)]
pub struct TreeArgs {
    #[arg(value_parser = parse_task_id)]
    pub id: Option<TaskId>,
}

#[derive(Args, Clone)]
pub struct CheckParentArgs {
    /// Task to move; omit to check for a task not created yet
    #[arg(long, value_parser = parse_task_id)]
    pub task: Option<TaskId>,

    #[arg(value_parser = parse_task_id)]
    pub parent: TaskId,
}

pub enum TaskResult {
    One(Task),
    Many(Vec<Task>),
    Deleted,
    Updates(Vec<StatusUpdate>),
    Ids(Vec<TaskId>),
    Counts(CountsResult),
    Trees(Vec<TaskTree>),
    CycleCheck(CycleCheckResult),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsResult {
    #[serde(flatten)]
    pub counts: DependencyCounts,
    pub all_complete: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleCheckResult {
    pub task_id: Option<TaskId>,
    pub parent_id: TaskId,
    pub would_create_cycle: bool,
}

pub fn handle(conn: &Connection, cmd: TaskCommand) -> Result<TaskResult> {
    let svc = TaskService::new(conn);

    match cmd {
        TaskCommand::Create(args) => {
            let input = CreateTaskInput {
                header: args.header,
                task_type: args.task_type,
                reviewer: args.reviewer,
                target: args.target,
                limit: args.limit,
                status: args.status,
                parent_id: args.parent,
            };
            Ok(TaskResult::One(svc.create(&input)?))
        }

        TaskCommand::Get { id } => Ok(TaskResult::One(svc.get(id)?)),

        TaskCommand::List(args) => {
            let filter = ListTasksFilter {
                parent_id: args.parent,
                roots_only: args.roots,
                status: args.status,
            };
            Ok(TaskResult::Many(svc.list(&filter)?))
        }

        TaskCommand::Update(args) => {
            let input = UpdateTaskInput {
                header: args.header,
                task_type: args.task_type,
                reviewer: args.reviewer,
                target: args.target,
                limit: args.limit,
                parent_id: None,
            };
            Ok(TaskResult::One(svc.update(args.id, &input)?))
        }

        TaskCommand::Status(args) => Ok(TaskResult::Updates(svc.set_status(args.id, args.status)?)),

        TaskCommand::Move(args) => {
            let parent = if args.root { None } else { args.parent };
            let input = UpdateTaskInput {
                parent_id: Some(parent),
                ..Default::default()
            };
            Ok(TaskResult::One(svc.update(args.id, &input)?))
        }

        TaskCommand::Delete { id } => {
            svc.delete(id)?;
            Ok(TaskResult::Deleted)
        }

        TaskCommand::Tree(args) => Ok(TaskResult::Trees(svc.tree(args.id)?)),

        TaskCommand::Ancestors { id } => Ok(TaskResult::Ids(svc.ancestors(id)?)),

        TaskCommand::Descendants { id } => Ok(TaskResult::Ids(svc.descendants(id)?)),

        TaskCommand::InvalidParents { id } => Ok(TaskResult::Ids(svc.invalid_parents(id)?)),

        TaskCommand::Children { id } => Ok(TaskResult::Many(svc.children(id)?)),

        TaskCommand::Counts { id } => Ok(TaskResult::Counts(CountsResult {
            counts: svc.counts(id)?,
            all_complete: svc.all_complete(id)?,
        })),

        TaskCommand::CheckParent(args) => Ok(TaskResult::CycleCheck(CycleCheckResult {
            task_id: args.task,
            parent_id: args.parent,
            would_create_cycle: svc.would_create_cycle(args.task, args.parent)?,
        })),
    }
}

impl TaskResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(match self {
            TaskResult::One(t) => serde_json::to_string_pretty(t)?,
            TaskResult::Many(ts) => serde_json::to_string_pretty(ts)?,
            TaskResult::Deleted => serde_json::json!({ "deleted": true }).to_string(),
            TaskResult::Updates(updates) => serde_json::to_string_pretty(updates)?,
            TaskResult::Ids(ids) => serde_json::to_string_pretty(ids)?,
            TaskResult::Counts(counts) => serde_json::to_string_pretty(counts)?,
            TaskResult::Trees(trees) => serde_json::to_string_pretty(trees)?,
            TaskResult::CycleCheck(check) => serde_json::to_string_pretty(check)?,
        })
    }
}
