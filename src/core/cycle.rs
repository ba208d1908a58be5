use std::collections::HashSet;

use tracing::trace;

use super::tree::TreeIndex;
use crate::id::TaskId;
use crate::types::Task;

/// Would making `parent_id` the parent of `task_id` close a cycle?
///
/// `None` for either id means there is nothing to check. For a task that
/// is not persisted yet the caller passes its placeholder id.
pub fn would_create_circular_dependency(
    tasks: &[Task],
    task_id: Option<TaskId>,
    parent_id: Option<TaskId>,
) -> bool {
    let (Some(task_id), Some(parent_id)) = (task_id, parent_id) else {
        return false;
    };
    let index = TreeIndex::new(tasks);
    would_create_cycle(&index, task_id, parent_id)
}

pub(crate) fn would_create_cycle(index: &TreeIndex<'_>, task_id: TaskId, parent_id: TaskId) -> bool {
    if task_id == parent_id {
        return true;
    }

    let mut visited = HashSet::new();
    let mut current = Some(parent_id);
    while let Some(cid) = current {
        if cid == task_id {
            return true;
        }
        // A loop that does not pass through task_id already existed
        if !visited.insert(cid) {
            trace!(task = %task_id, at = %cid, "pre-existing cycle in ancestor chain");
            return false;
        }
        current = index.parent_of(cid);
    }
    false
}
