//! Status propagation across the parent/child tree.
//!
//! A status change on one task can cascade in two directions:
//!
//! - **Upward to COMPLETE**: once every child of a parent is DONE or
//!   COMPLETE, those DONE children and the parent itself become COMPLETE,
//!   and the check repeats one level higher.
//! - **Reversion to DONE**: a child going back to IN PROGRESS knocks a
//!   COMPLETE parent down to DONE, and so on up the chain until a parent
//!   that is not COMPLETE is reached. Nothing is ever forced below DONE.
//!
//! The result is a list of update intents, at most one per task id, in
//! discovery order. Nothing here writes to storage.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use super::tree::TreeIndex;
use crate::id::TaskId;
use crate::types::{StatusUpdate, Task, TaskStatus};

/// Compute every status update implied by setting `task_id` to `new_status`.
///
/// The first entry is always the changed task itself, possibly upgraded
/// from DONE to COMPLETE when all of its children are already COMPLETE.
pub fn propagate_status_change(
    tasks: &[Task],
    task_id: TaskId,
    new_status: TaskStatus,
) -> Vec<StatusUpdate> {
    let index = TreeIndex::new(tasks);
    let mut run = Propagation::new(&index);

    let mut status = new_status;
    run.queue(task_id, status.clone());

    if status == TaskStatus::Done && run.all_children_complete(task_id) {
        trace!(task = %task_id, "all children COMPLETE, upgrading DONE");
        status = TaskStatus::Complete;
        run.queue(task_id, TaskStatus::Complete);
    }

    if let Some(parent_id) = index.parent_of(task_id) {
        match status {
            TaskStatus::Done | TaskStatus::Complete => run.complete_upward(parent_id),
            TaskStatus::InProgress => run.revert_upward(parent_id),
            TaskStatus::Other(_) => {}
        }
    }

    let updates = run.finish();
    debug!(task = %task_id, updates = updates.len(), "status propagation computed");
    updates
}

/// Run only the upward-COMPLETE check, starting at `parent_id`.
///
/// Used after a child leaves or is removed from `parent_id`: the
/// remaining children may now all be finished.
pub fn recheck_parent_completion(tasks: &[Task], parent_id: TaskId) -> Vec<StatusUpdate> {
    let index = TreeIndex::new(tasks);
    let mut run = Propagation::new(&index);
    run.complete_upward(parent_id);
    run.finish()
}

/// Copy of `tasks` with `updates` applied to their statuses.
pub fn apply_updates(tasks: &[Task], updates: &[StatusUpdate]) -> Vec<Task> {
    let wanted: HashMap<TaskId, &TaskStatus> =
        updates.iter().map(|u| (u.id, &u.status)).collect();
    tasks
        .iter()
        .map(|t| {
            let mut t = t.clone();
            if let Some(status) = wanted.get(&t.id) {
                t.status = (*status).clone();
            }
            t
        })
        .collect()
}

/// Accumulator for one propagation pass.
struct Propagation<'i, 'a> {
    index: &'i TreeIndex<'a>,
    updates: Vec<StatusUpdate>,
    // id -> position in `updates`
    positions: HashMap<TaskId, usize>,
}

impl<'i, 'a> Propagation<'i, 'a> {
    fn new(index: &'i TreeIndex<'a>) -> Self {
        Self {
            index,
            updates: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Queued status if any, else the stored one.
    fn effective_status(&self, id: TaskId) -> Option<&TaskStatus> {
        match self.positions.get(&id) {
            Some(&pos) => Some(&self.updates[pos].status),
            None => self.index.get(id).map(|t| &t.status),
        }
    }

    /// Merge into the existing entry for `id`, or append.
    fn queue(&mut self, id: TaskId, status: TaskStatus) {
        match self.positions.get(&id) {
            Some(&pos) => self.updates[pos].status = status,
            None => {
                self.positions.insert(id, self.updates.len());
                self.updates.push(StatusUpdate::new(id, status));
            }
        }
    }

    fn all_children_complete(&self, id: TaskId) -> bool {
        let children = self.index.children_of(id);
        !children.is_empty()
            && children
                .iter()
                .all(|c| self.effective_status(c.id) == Some(&TaskStatus::Complete))
    }

    fn complete_upward(&mut self, start: TaskId) {
        let index = self.index;
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(parent_id) = current {
            if !visited.insert(parent_id) || !index.exists(parent_id) {
                break;
            }
            let children = index.children_of(parent_id);
            if children.is_empty() {
                break;
            }
            let all_finished = children
                .iter()
                .all(|c| self.effective_status(c.id).is_some_and(TaskStatus::is_finished));
            if !all_finished {
                trace!(parent = %parent_id, "not every child finished, stopping");
                break;
            }

            for child in children {
                if self.effective_status(child.id) == Some(&TaskStatus::Done) {
                    self.queue(child.id, TaskStatus::Complete);
                }
            }
            self.queue(parent_id, TaskStatus::Complete);
            trace!(parent = %parent_id, "parent promoted to COMPLETE");

            current = index.parent_of(parent_id);
        }
    }

    fn revert_upward(&mut self, start: TaskId) {
        let index = self.index;
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                break;
            }
            if self.effective_status(parent_id) != Some(&TaskStatus::Complete) {
                break;
            }
            self.queue(parent_id, TaskStatus::Done);
            trace!(parent = %parent_id, "parent reverted to DONE");

            current = index.parent_of(parent_id);
        }
    }

    fn finish(self) -> Vec<StatusUpdate> {
        self.updates
    }
}
