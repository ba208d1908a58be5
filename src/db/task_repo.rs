use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{CascadeError, Result};
use crate::id::TaskId;
use crate::types::{CreateTaskInput, ListTasksFilter, StatusUpdate, Task, TaskStatus, UpdateTaskInput};

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn parse_timestamp(row: &Row, column: &str) -> DateTime<Utc> {
    row.get::<_, String>(column)
        .ok()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(now)
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        parent_id: row.get("parent_id")?,
        header: row.get("header")?,
        task_type: row.get("type")?,
        reviewer: row.get("reviewer")?,
        target: row.get("target")?,
        limit: row.get("limit")?,
        status: row.get("status")?,
        created_at: parse_timestamp(row, "created_at"),
        updated_at: parse_timestamp(row, "updated_at"),
    })
}

pub fn create_task(conn: &Connection, input: &CreateTaskInput) -> Result<Task> {
    let now_str = now().to_rfc3339();
    let status = input.status.clone().unwrap_or_default();

    conn.execute(
        r#"
        INSERT INTO tasks (parent_id, header, type, reviewer, target, "limit", status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            input.parent_id,
            input.header,
            input.task_type,
            input.reviewer,
            input.target,
            input.limit,
            status,
            now_str,
            now_str,
        ],
    )?;

    let id = TaskId::new(conn.last_insert_rowid());
    get_task(conn, id)?.ok_or(CascadeError::TaskNotFound(id))
}

pub fn get_task(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    let task = conn
        .query_row("SELECT * FROM tasks WHERE id = ?1", params![id], row_to_task)
        .optional()?;
    Ok(task)
}

/// Full snapshot, ascending by id.
pub fn all_tasks(conn: &Connection) -> Result<Vec<Task>> {
    list_tasks(conn, &ListTasksFilter::default())
}

pub fn list_tasks(conn: &Connection, filter: &ListTasksFilter) -> Result<Vec<Task>> {
    let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(parent_id) = filter.parent_id {
        sql.push_str(" AND parent_id = ?");
        params_vec.push(Box::new(parent_id));
    } else if filter.roots_only {
        sql.push_str(" AND parent_id IS NULL");
    }

    if let Some(ref status) = filter.status {
        sql.push_str(" AND status = ?");
        params_vec.push(Box::new(status.clone()));
    }

    sql.push_str(" ORDER BY id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let tasks = stmt
        .query_map(params_refs.as_slice(), row_to_task)?
        .collect::<rusqlite::Result<Vec<Task>>>()?;
    Ok(tasks)
}

pub fn update_task(conn: &Connection, id: TaskId, input: &UpdateTaskInput) -> Result<Task> {
    let now_str = now().to_rfc3339();

    let mut updates = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now_str)];
    let mut param_idx = 2;

    updates.push("updated_at = ?1".to_string());

    let columns: [(&str, &Option<String>); 5] = [
        ("header", &input.header),
        ("type", &input.task_type),
        ("reviewer", &input.reviewer),
        ("target", &input.target),
        ("\"limit\"", &input.limit),
    ];
    for (column, value) in columns {
        if let Some(value) = value {
            updates.push(format!("{} = ?{}", column, param_idx));
            params_vec.push(Box::new(value.clone()));
            param_idx += 1;
        }
    }

    if let Some(parent_id) = input.parent_id {
        updates.push(format!("parent_id = ?{}", param_idx));
        params_vec.push(Box::new(parent_id));
        param_idx += 1;
    }

    params_vec.push(Box::new(id));

    let sql = format!(
        "UPDATE tasks SET {} WHERE id = ?{}",
        updates.join(", "),
        param_idx
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, params_refs.as_slice())?;

    get_task(conn, id)?.ok_or(CascadeError::TaskNotFound(id))
}

pub fn set_status(conn: &Connection, id: TaskId, status: &TaskStatus) -> Result<()> {
    let now_str = now().to_rfc3339();
    conn.execute(
        "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, now_str, id],
    )?;
    Ok(())
}

/// Write a batch of status intents in one transaction.
pub fn apply_status_updates(conn: &Connection, updates: &[StatusUpdate]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for update in updates {
        set_status(&tx, update.id, &update.status)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn delete_task(conn: &Connection, id: TaskId) -> Result<()> {
    conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn task_exists(conn: &Connection, id: TaskId) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn has_children(conn: &Connection, id: TaskId) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE parent_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Id the next inserted task will receive. Used as the placeholder id
/// for cycle checks before the row exists.
pub fn next_task_id(conn: &Connection) -> Result<TaskId> {
    let next: i64 = conn.query_row(
        r#"
        SELECT MAX(
            COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'tasks'), 0),
            COALESCE((SELECT MAX(id) FROM tasks), 0)
        ) + 1
        "#,
        [],
        |row| row.get(0),
    )?;
    Ok(TaskId::new(next))
}
