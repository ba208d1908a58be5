//! Hierarchy integrity and status propagation.
//!
//! Everything except [`task_service`] is pure: each call takes a full task
//! snapshot, builds a [`TreeIndex`] once, and returns ids, counts, or
//! status update intents without touching storage.

pub mod counts;
pub mod cycle;
pub mod propagate;
pub mod task_service;
pub mod tree;
pub mod walk;

#[cfg(test)]
pub(crate) mod testing;

pub use counts::{are_all_dependencies_complete, get_dependency_counts, get_task_children};
pub use cycle::would_create_circular_dependency;
pub use propagate::{apply_updates, propagate_status_change, recheck_parent_completion};
pub use task_service::TaskService;
pub use tree::TreeIndex;
pub use walk::{get_invalid_parent_ids, get_task_ancestors, get_task_descendants};
