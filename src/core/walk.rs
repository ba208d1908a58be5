//! Ancestor and descendant traversal.

use std::collections::HashSet;

use super::tree::TreeIndex;
use crate::id::TaskId;
use crate::types::Task;

/// Ancestor ids of `task_id`, nearest first, ending at the root.
///
/// Empty for roots and for ids not in the snapshot.
pub fn get_task_ancestors(tasks: &[Task], task_id: TaskId) -> Vec<TaskId> {
    ancestors_of(&TreeIndex::new(tasks), task_id)
}

/// Descendant ids of `task_id` in pre-order.
pub fn get_task_descendants(tasks: &[Task], task_id: TaskId) -> Vec<TaskId> {
    descendants_of(&TreeIndex::new(tasks), task_id)
}

/// Ids that must never be offered as a new parent for `task_id`:
/// the task itself followed by its descendants in pre-order.
pub fn get_invalid_parent_ids(tasks: &[Task], task_id: TaskId) -> Vec<TaskId> {
    let index = TreeIndex::new(tasks);
    let mut ids = vec![task_id];
    ids.extend(descendants_of(&index, task_id));
    ids
}

pub(crate) fn ancestors_of(index: &TreeIndex<'_>, task_id: TaskId) -> Vec<TaskId> {
    let mut ancestors = Vec::new();
    let mut seen = HashSet::from([task_id]);
    let mut current = index.parent_of(task_id);
    while let Some(cid) = current {
        if !seen.insert(cid) {
            break;
        }
        ancestors.push(cid);
        current = index.parent_of(cid);
    }
    ancestors
}

pub(crate) fn descendants_of(index: &TreeIndex<'_>, task_id: TaskId) -> Vec<TaskId> {
    let mut out = Vec::new();
    let mut seen = HashSet::from([task_id]);
    collect_descendants(index, task_id, &mut seen, &mut out);
    out
}

fn collect_descendants(
    index: &TreeIndex<'_>,
    id: TaskId,
    seen: &mut HashSet<TaskId>,
    out: &mut Vec<TaskId>,
) {
    for child in index.children_of(id) {
        if !seen.insert(child.id) {
            continue;
        }
        out.push(child.id);
        collect_descendants(index, child.id, seen, out);
    }
}
