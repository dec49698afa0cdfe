use serde::Serialize;

use crate::model::task::{TaskId, TaskNode};
use crate::ops::tree_ops;

/// Outcome of a completion toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Toggle {
    /// Incomplete -> complete
    Completed,
    /// Complete -> incomplete (never gated)
    Reopened,
    /// Completion refused; the node is unchanged
    Blocked { open: Vec<TaskId> },
}

impl Toggle {
    pub fn changed(&self) -> bool {
        !matches!(self, Toggle::Blocked { .. })
    }
}

/// Direct-subtask progress, e.g. `1/2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Whether `node` may be marked complete: every subtask, direct and
/// transitive, is already complete. Leaves always qualify.
pub fn can_complete(node: &TaskNode) -> bool {
    node.subtasks
        .iter()
        .all(|sub| sub.completed && can_complete(sub))
}

/// Incomplete subtasks anywhere below `node`, pre-order
pub fn open_subtasks(node: &TaskNode) -> Vec<TaskId> {
    let mut open = Vec::new();
    collect_open(&node.subtasks, &mut open);
    open
}

fn collect_open(tasks: &[TaskNode], out: &mut Vec<TaskId>) {
    for task in tasks {
        if !task.completed {
            out.push(task.id.clone());
        }
        collect_open(&task.subtasks, out);
    }
}

pub fn progress(node: &TaskNode) -> Progress {
    Progress {
        done: node.subtasks.iter().filter(|s| s.completed).count(),
        total: node.subtasks.len(),
    }
}

/// Pure toggle: returns the new node and what happened. A blocked toggle
/// returns an unchanged copy.
pub fn apply_toggle(node: &TaskNode) -> (TaskNode, Toggle) {
    let mut next = node.clone();
    let outcome = toggle_completion(&mut next);
    (next, outcome)
}

/// Flip `completed` on `node`, refusing incomplete -> complete while any
/// subtask is still open. Reopening has no precondition and does not touch
/// the subtasks.
pub fn toggle_completion(node: &mut TaskNode) -> Toggle {
    if node.completed {
        node.completed = false;
        return Toggle::Reopened;
    }
    if !can_complete(node) {
        return Toggle::Blocked {
            open: open_subtasks(node),
        };
    }
    node.completed = true;
    Toggle::Completed
}

/// Toggle the node `id` inside `tree`. An unknown id leaves the tree as it
/// was and yields `None`.
pub fn toggle_in_tree(tree: &[TaskNode], id: &TaskId) -> (Vec<TaskNode>, Option<Toggle>) {
    let Some(target) = tree_ops::find(tree, id) else {
        return (tree.to_vec(), None);
    };
    let (next, outcome) = apply_toggle(target);
    if !outcome.changed() {
        return (tree.to_vec(), Some(outcome));
    }
    (tree_ops::replace(tree, id, next), Some(outcome))
}
