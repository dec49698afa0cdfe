use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::project::Project;
use crate::model::task::{TaskId, TaskNode};
use crate::ops::tree_ops;

/// What caps a task's deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "task", rename_all = "snake_case")]
pub enum Bound {
    /// The enclosing task's deadline
    Parent(TaskId),
    /// The project deadline (root tasks)
    Project,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Parent(id) => write!(f, "parent task {}", id),
            Bound::Project => write!(f, "project"),
        }
    }
}

/// Error type for deadline validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineError {
    #[error("deadline {candidate} is after the {bound} deadline {limit}")]
    ExceedsBound {
        candidate: NaiveDate,
        limit: NaiveDate,
        bound: Bound,
    },
    #[error("parent task not found: {0}")]
    UnknownParent(TaskId),
}

/// Accept `candidate` iff it is on or before `limit`. Dates compare by day.
pub fn validate_deadline(
    candidate: NaiveDate,
    limit: NaiveDate,
    bound: Bound,
) -> Result<(), DeadlineError> {
    if candidate > limit {
        return Err(DeadlineError::ExceedsBound {
            candidate,
            limit,
            bound,
        });
    }
    Ok(())
}

/// The latest deadline a task placed under `parent` may have: the parent's
/// own deadline, or the project deadline for a root task.
pub fn bound_for(
    tree: &[TaskNode],
    project: &Project,
    parent: Option<&TaskId>,
) -> Result<(NaiveDate, Bound), DeadlineError> {
    match parent {
        None => Ok((project.deadline, Bound::Project)),
        Some(id) => tree_ops::find(tree, id)
            .map(|p| (p.deadline, Bound::Parent(id.clone())))
            .ok_or_else(|| DeadlineError::UnknownParent(id.clone())),
    }
}

/// Validate a deadline for a task that is (or will be) placed under `parent`.
pub fn validate_placement(
    tree: &[TaskNode],
    project: &Project,
    parent: Option<&TaskId>,
    candidate: NaiveDate,
) -> Result<(), DeadlineError> {
    let (limit, bound) = bound_for(tree, project, parent)?;
    validate_deadline(candidate, limit, bound)
}
