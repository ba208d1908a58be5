//! Read-only id index over a task snapshot.

use std::collections::HashMap;

use crate::id::TaskId;
use crate::types::Task;

/// Id lookup and parent/child queries over one snapshot.
///
/// Built once per top-level engine call in O(n). Children keep the
/// relative order they have in the input slice.
pub struct TreeIndex<'a> {
    by_id: HashMap<TaskId, &'a Task>,
    children: HashMap<TaskId, Vec<&'a Task>>,
}

impl<'a> TreeIndex<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let mut by_id = HashMap::with_capacity(tasks.len());
        let mut children: HashMap<TaskId, Vec<&'a Task>> = HashMap::new();
        for task in tasks {
            by_id.insert(task.id, task);
            if let Some(parent_id) = task.parent_id {
                children.entry(parent_id).or_default().push(task);
            }
        }
        Self { by_id, children }
    }

    pub fn get(&self, id: TaskId) -> Option<&'a Task> {
        self.by_id.get(&id).copied()
    }

    pub fn exists(&self, id: TaskId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn children_of(&self, id: TaskId) -> &[&'a Task] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parent of `id`; `None` for roots and for ids not in the snapshot.
    pub fn parent_of(&self, id: TaskId) -> Option<TaskId> {
        self.get(id).and_then(|t| t.parent_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
