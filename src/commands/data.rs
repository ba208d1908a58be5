use clap::Subcommand;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::cycle::would_create_cycle;
use crate::core::walk::ancestors_of;
use crate::core::TreeIndex;
use crate::db::task_repo;
use crate::error::{CascadeError, Result};
use crate::id::TaskId;
use crate::types::Task;

const EXPORT_VERSION: &str = "1.0.0";

#[derive(Subcommand, Clone)]
pub enum DataCommand {
    /// Export all tasks to JSON file
    Export {
        /// Output file path (default: cascade-export.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import tasks from JSON file, keeping their ids
    Import {
        /// Input file path
        file: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub version: String,
    pub exported_at: String,
    pub tasks: Vec<Task>,
}

pub enum DataResult {
    Exported { path: String, tasks: usize },
    Imported { tasks: usize },
}

impl DataResult {
    pub fn to_json(&self) -> Result<String> {
        let value = match self {
            DataResult::Exported { path, tasks } => serde_json::json!({
                "exported": true,
                "path": path,
                "tasks": tasks,
            }),
            DataResult::Imported { tasks } => serde_json::json!({
                "imported": true,
                "tasks": tasks,
            }),
        };
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

pub fn handle(conn: &Connection, cmd: DataCommand) -> Result<DataResult> {
    match cmd {
        DataCommand::Export { output } => export_data(conn, output),
        DataCommand::Import { file, clear } => import_data(conn, &file, clear),
    }
}

pub(crate) fn export_data(conn: &Connection, output: Option<PathBuf>) -> Result<DataResult> {
    let output_path = output.unwrap_or_else(|| PathBuf::from("cascade-export.json"));
    let tasks = task_repo::all_tasks(conn)?;

    let export = ExportData {
        version: EXPORT_VERSION.to_string(),
        exported_at: chrono::Utc::now().to_rfc3339(),
        tasks,
    };

    let json = serde_json::to_string_pretty(&export)?;
    fs::write(&output_path, json)?;
    info!(path = %output_path.display(), tasks = export.tasks.len(), "exported tasks");

    Ok(DataResult::Exported {
        path: output_path.display().to_string(),
        tasks: export.tasks.len(),
    })
}

/// Store as it would look after the import: existing rows, with imported
/// rows replacing same-id entries and the rest appended.
fn merged_snapshot(existing: Vec<Task>, imported: &[Task]) -> Vec<Task> {
    let incoming: HashMap<TaskId, &Task> = imported.iter().map(|t| (t.id, t)).collect();
    let mut merged: Vec<Task> = existing
        .into_iter()
        .map(|t| match incoming.get(&t.id) {
            Some(replacement) => (*replacement).clone(),
            None => t,
        })
        .collect();
    let present: HashSet<TaskId> = merged.iter().map(|t| t.id).collect();
    merged.extend(imported.iter().filter(|t| !present.contains(&t.id)).cloned());
    merged
}

/// Reject files with duplicate ids, empty headers, missing parents, or
/// parent links that close a cycle once merged with the current store.
fn validate_import(imported: &[Task], merged: &[Task]) -> Result<()> {
    let mut ids = HashSet::new();
    for task in imported {
        if !ids.insert(task.id) {
            return Err(CascadeError::InvalidImport(format!("duplicate task id {}", task.id)));
        }
        if task.header.trim().is_empty() {
            return Err(CascadeError::InvalidImport(format!("task {} has an empty header", task.id)));
        }
    }

    let index = TreeIndex::new(merged);
    for task in imported {
        let Some(parent_id) = task.parent_id else {
            continue;
        };
        if !index.exists(parent_id) {
            return Err(CascadeError::InvalidImport(format!(
                "task {} references missing parent {}",
                task.id, parent_id
            )));
        }
        if would_create_cycle(&index, task.id, parent_id) {
            return Err(CascadeError::InvalidImport(format!(
                "task {} is part of a parent cycle",
                task.id
            )));
        }
    }
    Ok(())
}

pub(crate) fn import_data(conn: &Connection, file: &Path, clear: bool) -> Result<DataResult> {
    let json = fs::read_to_string(file)?;
    let import: ExportData = serde_json::from_str(&json)?;

    let existing = if clear {
        Vec::new()
    } else {
        task_repo::all_tasks(conn)?
    };
    let merged = merged_snapshot(existing, &import.tasks);
    validate_import(&import.tasks, &merged)?;

    // Parents before children so foreign keys hold at every insert
    let index = TreeIndex::new(&merged);
    let mut ordered: Vec<&Task> = import.tasks.iter().collect();
    ordered.sort_by_key(|t| (ancestors_of(&index, t.id).len(), t.id));

    // Savepoint so a failing row leaves the database untouched
    conn.execute("SAVEPOINT import_data", [])?;

    let result = (|| -> Result<DataResult> {
        if clear {
            conn.execute("DELETE FROM tasks", [])?;
        }

        for task in &ordered {
            conn.execute(
                r#"
                INSERT INTO tasks
                (id, parent_id, header, type, reviewer, target, "limit", status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    parent_id = excluded.parent_id,
                    header = excluded.header,
                    type = excluded.type,
                    reviewer = excluded.reviewer,
                    target = excluded.target,
                    "limit" = excluded."limit",
                    status = excluded.status,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at
                "#,
                rusqlite::params![
                    task.id,
                    task.parent_id,
                    task.header,
                    task.task_type,
                    task.reviewer,
                    task.target,
                    task.limit,
                    task.status,
                    task.created_at.to_rfc3339(),
                    task.updated_at.to_rfc3339(),
                ],
            )?;
        }

        Ok(DataResult::Imported {
            tasks: ordered.len(),
        })
    })();

    match result {
        Ok(data) => {
            conn.execute("RELEASE SAVEPOINT import_data", [])?;
            info!(tasks = ordered.len(), clear, "imported tasks");
            Ok(data)
        }
        Err(e) => {
            conn.execute("ROLLBACK TO SAVEPOINT import_data", [])?;
            conn.execute("RELEASE SAVEPOINT import_data", [])?;
            Err(e)
        }
    }
}
