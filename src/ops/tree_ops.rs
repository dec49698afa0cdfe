//! Pure, total operations over a task forest.
//!
//! Nothing here mutates its input: each operation returns a new forest with
//! the path from the root to the changed node rebuilt. Operations aimed at an
//! id that is not in the tree return the tree unchanged.

use crate::model::task::{TaskId, TaskNode};

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a task by id anywhere in the forest.
pub fn find<'a>(tree: &'a [TaskNode], id: &TaskId) -> Option<&'a TaskNode> {
    for task in tree {
        if task.id == *id {
            return Some(task);
        }
        if let Some(t) = find(&task.subtasks, id) {
            return Some(t);
        }
    }
    None
}

pub fn contains(tree: &[TaskNode], id: &TaskId) -> bool {
    find(tree, id).is_some()
}

/// Ids from the root down to (excluding) `id`. `Some(vec![])` for a root.
pub fn ancestors(tree: &[TaskNode], id: &TaskId) -> Option<Vec<TaskId>> {
    for task in tree {
        if task.id == *id {
            return Some(Vec::new());
        }
        if let Some(mut chain) = ancestors(&task.subtasks, id) {
            chain.insert(0, task.id.clone());
            return Some(chain);
        }
    }
    None
}

/// The node directly above `id`, if `id` is not a root.
pub fn parent_of<'a>(tree: &'a [TaskNode], id: &TaskId) -> Option<&'a TaskNode> {
    let chain = ancestors(tree, id)?;
    let parent_id = chain.last()?;
    find(tree, parent_id)
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// Replace the node `target` with `new_node`.
pub fn replace(tree: &[TaskNode], target: &TaskId, new_node: TaskNode) -> Vec<TaskNode> {
    update(tree, target, |_| new_node.clone())
}

/// Replace the node `target` with `f(node)`.
pub fn update<F>(tree: &[TaskNode], target: &TaskId, f: F) -> Vec<TaskNode>
where
    F: Fn(&TaskNode) -> TaskNode,
{
    update_list(tree, target, &f)
}

fn update_list(
    tasks: &[TaskNode],
    target: &TaskId,
    f: &dyn Fn(&TaskNode) -> TaskNode,
) -> Vec<TaskNode> {
    tasks
        .iter()
        .map(|task| {
            if task.id == *target {
                f(task)
            } else if task.subtasks.is_empty() {
                task.clone()
            } else {
                TaskNode {
                    subtasks: update_list(&task.subtasks, target, f),
                    ..task.clone()
                }
            }
        })
        .collect()
}

/// Append `child` to `parent`'s subtasks, linking it to the parent.
pub fn insert_subtask(parent: &TaskNode, child: TaskNode) -> TaskNode {
    let mut next = parent.clone();
    next.subtasks.push(child.with_parent(Some(parent.id.clone())));
    next
}

/// Drop the direct subtask `child_id` (and everything below it).
pub fn remove_subtask(parent: &TaskNode, child_id: &TaskId) -> TaskNode {
    let mut next = parent.clone();
    next.subtasks.retain(|s| s.id != *child_id);
    next
}

/// Append `child` under `parent`, or as a new root when `parent` is `None`.
/// An unknown parent leaves the tree unchanged.
pub fn insert_into(tree: &[TaskNode], parent: Option<&TaskId>, child: TaskNode) -> Vec<TaskNode> {
    match parent {
        None => {
            let mut next = tree.to_vec();
            next.push(child.with_parent(None));
            next
        }
        Some(pid) => update(tree, pid, |p| insert_subtask(p, child.clone())),
    }
}

/// Remove the node `id` with its subtree, wherever it sits.
pub fn remove_from(tree: &[TaskNode], id: &TaskId) -> Vec<TaskNode> {
    tree.iter()
        .filter(|t| t.id != *id)
        .map(|t| {
            if t.subtasks.is_empty() {
                t.clone()
            } else {
                TaskNode {
                    subtasks: remove_from(&t.subtasks, id),
                    ..t.clone()
                }
            }
        })
        .collect()
}

/// Swap the id of a node (provisional -> confirmed), relinking its direct
/// subtasks to the new id.
pub fn rename(tree: &[TaskNode], from: &TaskId, to: &TaskId) -> Vec<TaskNode> {
    update(tree, from, |node| {
        let mut next = node.clone();
        next.id = to.clone();
        for sub in &mut next.subtasks {
            sub.parent_id = Some(to.clone());
        }
        next
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
