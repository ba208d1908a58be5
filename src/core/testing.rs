//! Snapshot builders for engine unit tests.

use chrono::{TimeZone, Utc};

use crate::id::TaskId;
use crate::types::{Task, TaskStatus};

pub(crate) fn tid(raw: i64) -> TaskId {
    TaskId::new(raw)
}

pub(crate) fn task(id: i64, parent: Option<i64>, status: TaskStatus) -> Task {
    let at = Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap();
    Task {
        id: tid(id),
        parent_id: parent.map(tid),
        header: format!("Task {id}"),
        task_type: None,
        reviewer: None,
        target: None,
        limit: None,
        status,
        created_at: at,
        updated_at: at,
    }
}
