use super::tree::TreeIndex;
use crate::id::TaskId;
use crate::types::{DependencyCounts, Task, TaskStatus};

/// Direct children of `task_id`, in snapshot order.
pub fn get_task_children(tasks: &[Task], task_id: TaskId) -> Vec<Task> {
    TreeIndex::new(tasks)
        .children_of(task_id)
        .iter()
        .map(|t| (*t).clone())
        .collect()
}

pub fn get_dependency_counts(tasks: &[Task], task_id: TaskId) -> DependencyCounts {
    counts_of(&TreeIndex::new(tasks), task_id)
}

/// True only when the task has children and every one is COMPLETE.
pub fn are_all_dependencies_complete(tasks: &[Task], task_id: TaskId) -> bool {
    let counts = get_dependency_counts(tasks, task_id);
    counts.total > 0 && counts.complete == counts.total
}

pub(crate) fn counts_of(index: &TreeIndex<'_>, task_id: TaskId) -> DependencyCounts {
    index
        .children_of(task_id)
        .iter()
        .fold(DependencyCounts::default(), |mut acc, child| {
            acc.total += 1;
            match child.status {
                TaskStatus::Done => acc.done += 1,
                TaskStatus::Complete => acc.complete += 1,
                _ => {}
            }
            acc
        })
}
