use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::core::counts::counts_of;
use crate::core::{
    are_all_dependencies_complete, get_dependency_counts, get_invalid_parent_ids,
    get_task_ancestors, get_task_children, get_task_descendants, propagate_status_change,
    recheck_parent_completion, would_create_circular_dependency, TreeIndex,
};
use crate::db::task_repo;
use crate::error::{CascadeError, Result};
use crate::id::TaskId;
use crate::types::{
    CreateTaskInput, DependencyCounts, ListTasksFilter, StatusUpdate, Task, TaskStatus, TaskTree,
    UpdateTaskInput,
};

/// Persistence-side caller of the engine.
///
/// Every operation reads a fresh snapshot, asks the engine what to do, and
/// writes the resulting status intents back in a single transaction.
pub struct TaskService<'a> {
    conn: &'a Connection,
}

impl<'a> TaskService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, input: &CreateTaskInput) -> Result<Task> {
        if input.header.trim().is_empty() {
            return Err(CascadeError::EmptyHeader);
        }

        if let Some(parent_id) = input.parent_id {
            if !task_repo::task_exists(self.conn, parent_id)? {
                return Err(CascadeError::ParentNotFound(parent_id));
            }
            let placeholder = task_repo::next_task_id(self.conn)?;
            let tasks = self.snapshot()?;
            if would_create_circular_dependency(&tasks, Some(placeholder), Some(parent_id)) {
                return Err(CascadeError::ParentCycle {
                    task_id: placeholder,
                    parent_id,
                });
            }
        }

        let task = task_repo::create_task(self.conn, input)?;
        info!(task = %task.id, parent = ?task.parent_id, "task created");

        // A new child can revert or complete its parent
        if task.parent_id.is_some() {
            self.propagate_and_apply(task.id, task.status.clone())?;
        }

        self.get(task.id)
    }

    pub fn get(&self, id: TaskId) -> Result<Task> {
        task_repo::get_task(self.conn, id)?.ok_or(CascadeError::TaskNotFound(id))
    }

    pub fn list(&self, filter: &ListTasksFilter) -> Result<Vec<Task>> {
        task_repo::list_tasks(self.conn, filter)
    }

    pub fn update(&self, id: TaskId, input: &UpdateTaskInput) -> Result<Task> {
        let current = self.get(id)?;

        if input.header.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(CascadeError::EmptyHeader);
        }

        let new_parent = input.parent_id.filter(|p| *p != current.parent_id);
        if let Some(Some(parent_id)) = new_parent {
            if !task_repo::task_exists(self.conn, parent_id)? {
                return Err(CascadeError::ParentNotFound(parent_id));
            }
            let tasks = self.snapshot()?;
            if would_create_circular_dependency(&tasks, Some(id), Some(parent_id)) {
                return Err(CascadeError::ParentCycle {
                    task_id: id,
                    parent_id,
                });
            }
        }

        let task = task_repo::update_task(self.conn, id, input)?;

        if let Some(to) = new_parent {
            info!(task = %id, from = ?current.parent_id, to = ?to, "task re-parented");
            self.settle_after_reparent(&task, current.parent_id)?;
        }

        self.get(id)
    }

    /// Re-run propagation on both chains touched by a move.
    ///
    /// Old chain first, then the new one against a re-fetched snapshot.
    /// The two passes do not commute when the chains share an ancestor.
    /// An old parent left with no children keeps its status, COMPLETE
    /// included; nothing completes or reverts a childless task.
    fn settle_after_reparent(&self, moved: &Task, old_parent: Option<TaskId>) -> Result<()> {
        if let Some(old_parent_id) = old_parent {
            let tasks = self.snapshot()?;
            let updates = recheck_parent_completion(&tasks, old_parent_id);
            task_repo::apply_status_updates(self.conn, &updates)?;
            debug!(parent = %old_parent_id, updates = updates.len(), "old parent chain settled");
        }

        if moved.parent_id.is_some() {
            let moved = self.get(moved.id)?;
            self.propagate_and_apply(moved.id, moved.status)?;
        }
        Ok(())
    }

    /// Set a status and apply the full cascade. Returns what was written.
    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> Result<Vec<StatusUpdate>> {
        self.get(id)?;
        let updates = self.propagate_and_apply(id, status)?;
        info!(task = %id, cascade = updates.len() - 1, "status changed");
        Ok(updates)
    }

    fn propagate_and_apply(&self, id: TaskId, status: TaskStatus) -> Result<Vec<StatusUpdate>> {
        let tasks = self.snapshot()?;
        let updates = propagate_status_change(&tasks, id, status);
        task_repo::apply_status_updates(self.conn, &updates)?;
        debug!(task = %id, updates = updates.len(), "status cascade applied");
        Ok(updates)
    }

    /// Delete a leaf and recheck its former parent's completion.
    ///
    /// Removing the only child leaves the parent's status as it was.
    pub fn delete(&self, id: TaskId) -> Result<()> {
        let task = self.get(id)?;
        if task_repo::has_children(self.conn, id)? {
            return Err(CascadeError::HasChildren(id));
        }

        task_repo::delete_task(self.conn, id)?;
        info!(task = %id, "task deleted");

        if let Some(parent_id) = task.parent_id {
            let tasks = self.snapshot()?;
            let updates = recheck_parent_completion(&tasks, parent_id);
            task_repo::apply_status_updates(self.conn, &updates)?;
        }
        Ok(())
    }

    pub fn ancestors(&self, id: TaskId) -> Result<Vec<TaskId>> {
        self.get(id)?;
        Ok(get_task_ancestors(&self.snapshot()?, id))
    }

    pub fn descendants(&self, id: TaskId) -> Result<Vec<TaskId>> {
        self.get(id)?;
        Ok(get_task_descendants(&self.snapshot()?, id))
    }

    pub fn invalid_parents(&self, id: TaskId) -> Result<Vec<TaskId>> {
        self.get(id)?;
        Ok(get_invalid_parent_ids(&self.snapshot()?, id))
    }

    pub fn children(&self, id: TaskId) -> Result<Vec<Task>> {
        self.get(id)?;
        Ok(get_task_children(&self.snapshot()?, id))
    }

    pub fn counts(&self, id: TaskId) -> Result<DependencyCounts> {
        self.get(id)?;
        Ok(get_dependency_counts(&self.snapshot()?, id))
    }

    pub fn all_complete(&self, id: TaskId) -> Result<bool> {
        self.get(id)?;
        Ok(are_all_dependencies_complete(&self.snapshot()?, id))
    }

    /// Whether `parent_id` may become the parent of `id` (or of a new task
    /// when `id` is `None`).
    pub fn would_create_cycle(&self, id: Option<TaskId>, parent_id: TaskId) -> Result<bool> {
        let id = match id {
            Some(id) => id,
            None => task_repo::next_task_id(self.conn)?,
        };
        Ok(would_create_circular_dependency(
            &self.snapshot()?,
            Some(id),
            Some(parent_id),
        ))
    }

    /// Nested view rooted at `root`, or one tree per root task.
    pub fn tree(&self, root: Option<TaskId>) -> Result<Vec<TaskTree>> {
        let tasks = self.snapshot()?;
        let index = TreeIndex::new(&tasks);
        let roots: Vec<&Task> = match root {
            Some(id) => vec![index.get(id).ok_or(CascadeError::TaskNotFound(id))?],
            None => tasks.iter().filter(|t| t.parent_id.is_none()).collect(),
        };

        let mut seen = HashSet::new();
        Ok(roots
            .into_iter()
            .map(|t| build_tree(&index, t, &mut seen))
            .collect())
    }

    fn snapshot(&self) -> Result<Vec<Task>> {
        task_repo::all_tasks(self.conn)
    }
}

fn build_tree(index: &TreeIndex<'_>, task: &Task, seen: &mut HashSet<TaskId>) -> TaskTree {
    seen.insert(task.id);
    let mut children = Vec::new();
    for child in index.children_of(task.id) {
        if !seen.contains(&child.id) {
            children.push(build_tree(index, child, seen));
        }
    }
    TaskTree {
        task: task.clone(),
        counts: counts_of(index, task.id),
        children,
    }
}
