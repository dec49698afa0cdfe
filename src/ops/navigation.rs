use std::slice;

use chrono::NaiveDate;

use crate::model::task::{TaskId, TaskNode};
use crate::ops::deadline::Bound;
use crate::ops::tree_ops;

/// Error type for navigation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    #[error("{child} is not a subtask of {current}")]
    NotASubtask { child: TaskId, current: TaskId },
}

/// Drill-down position inside one task's subtree.
///
/// Owns the task being edited and the chain of ids from it to the node
/// currently shown. Only direct subtasks can be opened, so the chain is
/// always a valid ancestor path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavStack {
    root: TaskNode,
    /// The cap on `root`'s own deadline (from its place in the project)
    outer: (NaiveDate, Bound),
    path: Vec<TaskId>,
}

impl NavStack {
    pub fn new(root: TaskNode, outer_limit: NaiveDate, outer_bound: Bound) -> Self {
        NavStack {
            root,
            outer: (outer_limit, outer_bound),
            path: Vec::new(),
        }
    }

    pub fn root(&self) -> &TaskNode {
        &self.root
    }

    /// Number of levels below the root
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn path(&self) -> &[TaskId] {
        &self.path
    }

    pub fn current(&self) -> &TaskNode {
        self.node_at(self.path.len())
    }

    /// The node one level up, `None` at the root
    pub fn parent(&self) -> Option<&TaskNode> {
        if self.path.is_empty() {
            return None;
        }
        Some(self.node_at(self.path.len() - 1))
    }

    /// Walk `levels` steps of the path from the root.
    fn node_at(&self, levels: usize) -> &TaskNode {
        let mut node = &self.root;
        for id in &self.path[..levels] {
            match node.subtasks.iter().find(|s| s.id == *id) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    /// Descend into a direct subtask of the current node.
    pub fn open(&mut self, child: &TaskId) -> Result<(), NavError> {
        let current = self.current();
        if !current.subtasks.iter().any(|s| s.id == *child) {
            return Err(NavError::NotASubtask {
                child: child.clone(),
                current: current.id.clone(),
            });
        }
        self.path.push(child.clone());
        Ok(())
    }

    /// Go up one level. Returns false at the root.
    pub fn back(&mut self) -> bool {
        self.path.pop().is_some()
    }

    /// Latest deadline the current node may have.
    pub fn bound(&self) -> (NaiveDate, Bound) {
        match self.parent() {
            Some(parent) => (parent.deadline, Bound::Parent(parent.id.clone())),
            None => self.outer.clone(),
        }
    }

    /// Swap in a new version of the current node. Its id is kept so the
    /// path stays valid.
    pub fn replace_current(&mut self, mut node: TaskNode) {
        let current_id = self.current().id.clone();
        node.id = current_id.clone();
        let rebuilt = tree_ops::replace(slice::from_ref(&self.root), &current_id, node);
        if let Some(root) = rebuilt.into_iter().next() {
            self.root = root;
        }
    }

    /// The root task with every nested edit folded in.
    pub fn into_root(self) -> TaskNode {
        self.root
    }
}
