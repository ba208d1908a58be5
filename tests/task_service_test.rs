//! Unit tests for TaskService against an in-memory database.
//!
//! Tests cover:
//! - CRUD operations and validation
//! - Parent assignment and cycle rejection
//! - Status cascades written back to storage
//! - Re-parenting passes on the old and new parent chains
//! - Delete guards

use cascade::core::TaskService;
use cascade::db::schema;
use cascade::error::CascadeError;
use cascade::id::TaskId;
use cascade::types::{CreateTaskInput, ListTasksFilter, StatusUpdate, Task, TaskStatus, UpdateTaskInput};
use rusqlite::Connection;

fn setup_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    schema::init_schema(&conn).unwrap();
    conn
}

fn create(service: &TaskService, header: &str, parent: Option<TaskId>) -> Task {
    service
        .create(&CreateTaskInput {
            header: header.to_string(),
            parent_id: parent,
            ..Default::default()
        })
        .unwrap()
}

fn status_of(service: &TaskService, id: TaskId) -> TaskStatus {
    service.get(id).unwrap().status
}

fn move_to(service: &TaskService, id: TaskId, parent: Option<TaskId>) -> Result<Task, CascadeError> {
    service.update(
        id,
        &UpdateTaskInput {
            parent_id: Some(parent),
            ..Default::default()
        },
    )
}

// ==================== CRUD Operations ====================

#[test]
fn test_create_root_task() {
    let conn = setup_db();
    let service = TaskService::new(&conn);

    let task = service
        .create(&CreateTaskInput {
            header: "Release 2.0".to_string(),
            task_type: Some("epic".to_string()),
            reviewer: Some("ops".to_string()),
            target: Some("2024-Q3".to_string()),
            limit: Some("5d".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(task.header, "Release 2.0");
    assert_eq!(task.parent_id, None);
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.task_type.as_deref(), Some("epic"));
    assert_eq!(task.limit.as_deref(), Some("5d"));
}

#[test]
fn test_create_rejects_empty_header() {
    let conn = setup_db();
    let service = TaskService::new(&conn);

    let result = service.create(&CreateTaskInput {
        header: "   ".to_string(),
        ..Default::default()
    });
    assert!(matches!(result, Err(CascadeError::EmptyHeader)));
}

#[test]
fn test_create_with_missing_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);

    let result = service.create(&CreateTaskInput {
        header: "Orphan".to_string(),
        parent_id: Some(TaskId::new(99)),
        ..Default::default()
    });
    assert!(matches!(result, Err(CascadeError::ParentNotFound(id)) if id == TaskId::new(99)));
}

#[test]
fn test_get_missing_task() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    assert!(matches!(
        service.get(TaskId::new(1)),
        Err(CascadeError::TaskNotFound(_))
    ));
}

#[test]
fn test_list_filters() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let a = create(&service, "A", Some(root.id));
    create(&service, "B", Some(root.id));
    create(&service, "Other", None);
    service.set_status(a.id, TaskStatus::Done).unwrap();

    let roots = service
        .list(&ListTasksFilter {
            roots_only: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(roots.len(), 2);

    let children = service
        .list(&ListTasksFilter {
            parent_id: Some(root.id),
            ..Default::default()
        })
        .unwrap();
    let headers: Vec<&str> = children.iter().map(|t| t.header.as_str()).collect();
    assert_eq!(headers, vec!["A", "B"]);

    let done = service
        .list(&ListTasksFilter {
            status: Some(TaskStatus::Done),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, a.id);
}

#[test]
fn test_update_attributes_keeps_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let child = create(&service, "Child", Some(root.id));

    let updated = service
        .update(
            child.id,
            &UpdateTaskInput {
                header: Some("Renamed".to_string()),
                reviewer: Some("qa".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.header, "Renamed");
    assert_eq!(updated.reviewer.as_deref(), Some("qa"));
    assert_eq!(updated.parent_id, Some(root.id));
    assert!(updated.updated_at >= child.updated_at);
}

// ==================== Parent Assignment ====================

#[test]
fn test_reparent_rejects_self() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let task = create(&service, "Solo", None);

    let result = move_to(&service, task.id, Some(task.id));
    assert!(matches!(result, Err(CascadeError::ParentCycle { .. })));
}

#[test]
fn test_reparent_rejects_descendant() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let a = create(&service, "A", None);
    let b = create(&service, "B", Some(a.id));
    let c = create(&service, "C", Some(b.id));

    let result = move_to(&service, a.id, Some(c.id));
    assert!(matches!(
        result,
        Err(CascadeError::ParentCycle { task_id, parent_id }) if task_id == a.id && parent_id == c.id
    ));
    assert_eq!(service.get(a.id).unwrap().parent_id, None);
}

#[test]
fn test_reparent_to_missing_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let a = create(&service, "A", None);

    let result = move_to(&service, a.id, Some(TaskId::new(500)));
    assert!(matches!(result, Err(CascadeError::ParentNotFound(_))));
}

#[test]
fn test_detach_to_root() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let a = create(&service, "A", None);
    let b = create(&service, "B", Some(a.id));

    let moved = move_to(&service, b.id, None).unwrap();
    assert_eq!(moved.parent_id, None);
    assert!(service.ancestors(b.id).unwrap().is_empty());
}

#[test]
fn test_invalid_parents_match_cycle_check() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let a = create(&service, "A", None);
    let b = create(&service, "B", Some(a.id));
    let c = create(&service, "C", Some(b.id));
    let d = create(&service, "D", None);

    let invalid = service.invalid_parents(b.id).unwrap();
    assert_eq!(invalid, vec![b.id, c.id]);
    for candidate in [a.id, b.id, c.id, d.id] {
        assert_eq!(
            service.would_create_cycle(Some(b.id), candidate).unwrap(),
            invalid.contains(&candidate)
        );
    }
}

// ==================== Status Cascade ====================

#[test]
fn test_done_with_unfinished_sibling_writes_only_seed() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let a = create(&service, "A", Some(root.id));
    create(&service, "B", Some(root.id));

    let updates = service.set_status(a.id, TaskStatus::Done).unwrap();
    assert_eq!(updates, vec![StatusUpdate::new(a.id, TaskStatus::Done)]);
    assert_eq!(status_of(&service, root.id), TaskStatus::InProgress);
}

#[test]
fn test_last_child_finishing_completes_the_chain() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let mid = create(&service, "Mid", Some(root.id));
    let a = create(&service, "A", Some(mid.id));
    let b = create(&service, "B", Some(mid.id));

    service.set_status(a.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, mid.id), TaskStatus::InProgress);

    let updates = service.set_status(b.id, TaskStatus::Done).unwrap();
    assert_eq!(
        updates,
        vec![
            StatusUpdate::new(b.id, TaskStatus::Complete),
            StatusUpdate::new(mid.id, TaskStatus::Complete),
            StatusUpdate::new(root.id, TaskStatus::Complete),
        ]
    );
    for id in [root.id, mid.id, a.id, b.id] {
        assert_eq!(status_of(&service, id), TaskStatus::Complete);
    }
    assert!(service.all_complete(root.id).unwrap());
}

#[test]
fn test_reopening_child_reverts_ancestors_to_done() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let mid = create(&service, "Mid", Some(root.id));
    let leaf = create(&service, "Leaf", Some(mid.id));
    service.set_status(leaf.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, root.id), TaskStatus::Complete);

    let updates = service.set_status(leaf.id, TaskStatus::InProgress).unwrap();
    assert_eq!(
        updates,
        vec![
            StatusUpdate::new(leaf.id, TaskStatus::InProgress),
            StatusUpdate::new(mid.id, TaskStatus::Done),
            StatusUpdate::new(root.id, TaskStatus::Done),
        ]
    );
    assert_eq!(status_of(&service, mid.id), TaskStatus::Done);
}

#[test]
fn test_set_status_on_missing_task() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let result = service.set_status(TaskId::new(3), TaskStatus::Done);
    assert!(matches!(result, Err(CascadeError::TaskNotFound(_))));
}

#[test]
fn test_custom_status_passes_through() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let a = create(&service, "A", Some(root.id));
    let b = create(&service, "B", Some(root.id));
    service.set_status(a.id, TaskStatus::Complete).unwrap();

    let review = TaskStatus::Other("IN REVIEW".to_string());
    let updates = service.set_status(b.id, review.clone()).unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(status_of(&service, b.id), review);
    assert_eq!(status_of(&service, root.id), TaskStatus::InProgress);
}

#[test]
fn test_new_in_progress_child_reverts_complete_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let a = create(&service, "A", Some(root.id));
    service.set_status(a.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, root.id), TaskStatus::Complete);

    create(&service, "B", Some(root.id));
    assert_eq!(status_of(&service, root.id), TaskStatus::Done);
}

// ==================== Re-parenting ====================

#[test]
fn test_moving_blocker_away_completes_old_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let old_parent = create(&service, "Old", None);
    let finished = create(&service, "Finished", Some(old_parent.id));
    let straggler = create(&service, "Straggler", Some(old_parent.id));
    let elsewhere = create(&service, "Elsewhere", None);
    service.set_status(finished.id, TaskStatus::Done).unwrap();
    assert_eq!(status_of(&service, old_parent.id), TaskStatus::InProgress);

    move_to(&service, straggler.id, Some(elsewhere.id)).unwrap();

    assert_eq!(status_of(&service, finished.id), TaskStatus::Complete);
    assert_eq!(status_of(&service, old_parent.id), TaskStatus::Complete);
    assert_eq!(status_of(&service, elsewhere.id), TaskStatus::InProgress);
}

#[test]
fn test_moving_unfinished_task_under_complete_parent_reverts_it() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let target = create(&service, "Target", None);
    let done_child = create(&service, "Done child", Some(target.id));
    service.set_status(done_child.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, target.id), TaskStatus::Complete);

    let wip = create(&service, "WIP", None);
    move_to(&service, wip.id, Some(target.id)).unwrap();

    assert_eq!(status_of(&service, target.id), TaskStatus::Done);
    assert_eq!(status_of(&service, done_child.id), TaskStatus::Complete);
}

#[test]
fn test_moving_complete_task_completes_new_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let target = create(&service, "Target", None);
    let mover = create(&service, "Mover", None);
    let sub = create(&service, "Sub", Some(mover.id));
    service.set_status(sub.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, mover.id), TaskStatus::Complete);

    move_to(&service, mover.id, Some(target.id)).unwrap();
    assert_eq!(status_of(&service, target.id), TaskStatus::Complete);
}

#[test]
fn test_move_between_siblings_settles_old_chain_before_new() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    // R
    // ├─ A: a1 COMPLETE, x IN PROGRESS
    // └─ B: b1 COMPLETE
    let r = create(&service, "R", None);
    let a = create(&service, "A", Some(r.id));
    let a1 = create(&service, "a1", Some(a.id));
    let x = create(&service, "x", Some(a.id));
    let b = create(&service, "B", Some(r.id));
    let b1 = create(&service, "b1", Some(b.id));
    service.set_status(a1.id, TaskStatus::Complete).unwrap();
    service.set_status(b1.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, a.id), TaskStatus::InProgress);
    assert_eq!(status_of(&service, b.id), TaskStatus::Complete);
    assert_eq!(status_of(&service, r.id), TaskStatus::InProgress);

    move_to(&service, x.id, Some(b.id)).unwrap();

    // Old chain completes A and R; the new chain then reverts B and R
    assert_eq!(status_of(&service, a.id), TaskStatus::Complete);
    assert_eq!(status_of(&service, b.id), TaskStatus::Done);
    assert_eq!(status_of(&service, r.id), TaskStatus::Done);
    assert_eq!(status_of(&service, x.id), TaskStatus::InProgress);
    assert_eq!(status_of(&service, b1.id), TaskStatus::Complete);
}

#[test]
fn test_moving_only_child_away_leaves_complete_parent_complete() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let parent = create(&service, "Parent", None);
    let only = create(&service, "Only", Some(parent.id));
    service.set_status(only.id, TaskStatus::Complete).unwrap();
    assert_eq!(status_of(&service, parent.id), TaskStatus::Complete);

    move_to(&service, only.id, None).unwrap();

    assert_eq!(status_of(&service, parent.id), TaskStatus::Complete);
    assert!(service.children(parent.id).unwrap().is_empty());
}

// ==================== Delete ====================

#[test]
fn test_delete_with_children_fails() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    create(&service, "Child", Some(root.id));

    let result = service.delete(root.id);
    assert!(matches!(result, Err(CascadeError::HasChildren(id)) if id == root.id));
    assert!(service.get(root.id).is_ok());
}

#[test]
fn test_deleting_last_unfinished_child_completes_parent() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let a = create(&service, "A", Some(root.id));
    let b = create(&service, "B", Some(root.id));
    service.set_status(a.id, TaskStatus::Complete).unwrap();

    service.delete(b.id).unwrap();

    assert!(matches!(service.get(b.id), Err(CascadeError::TaskNotFound(_))));
    assert_eq!(status_of(&service, root.id), TaskStatus::Complete);
}

#[test]
fn test_deleting_only_child_leaves_complete_parent_complete() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let parent = create(&service, "Parent", None);
    let only = create(&service, "Only", Some(parent.id));
    service.set_status(only.id, TaskStatus::Complete).unwrap();

    service.delete(only.id).unwrap();

    assert_eq!(status_of(&service, parent.id), TaskStatus::Complete);
    assert_eq!(service.counts(parent.id).unwrap().total, 0);
}

#[test]
fn test_delete_missing_task() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    assert!(matches!(
        service.delete(TaskId::new(8)),
        Err(CascadeError::TaskNotFound(_))
    ));
}

// ==================== Queries ====================

#[test]
fn test_tree_queries() {
    let conn = setup_db();
    let service = TaskService::new(&conn);
    let root = create(&service, "Root", None);
    let a = create(&service, "A", Some(root.id));
    let a1 = create(&service, "A1", Some(a.id));
    let b = create(&service, "B", Some(root.id));
    service.set_status(a1.id, TaskStatus::Done).unwrap();

    assert_eq!(service.ancestors(a1.id).unwrap(), vec![a.id, root.id]);
    assert_eq!(service.descendants(root.id).unwrap(), vec![a.id, a1.id, b.id]);
    assert_eq!(service.children(root.id).unwrap().len(), 2);

    // a1 DONE as the only child of a cascades a1 and a to COMPLETE
    let counts = service.counts(root.id).unwrap();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.complete, 1);
    assert!(!service.all_complete(root.id).unwrap());
    assert!(service.all_complete(a.id).unwrap());
}
