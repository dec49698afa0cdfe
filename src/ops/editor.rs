//! Editing session for one task and its subtasks.
//!
//! The editor works on a private copy of the task; nothing reaches the
//! project snapshot until the caller hands `finish()` to the board.

use chrono::NaiveDate;

use crate::model::project::Project;
use crate::model::task::{StudentId, TaskId, TaskNode};
use crate::ops::completion::{self, Toggle};
use crate::ops::deadline::{self, Bound, DeadlineError};
use crate::ops::navigation::{NavError, NavStack};
use crate::ops::tree_ops;

/// Error type for edit validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("{0} is not a participant of this project")]
    NotParticipant(StudentId),
    #[error(transparent)]
    Deadline(#[from] DeadlineError),
    #[error("finish all subtasks first ({} still open)", .open.len())]
    Blocked { open: Vec<TaskId> },
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error("subtask not found: {0}")]
    SubtaskNotFound(TaskId),
}

/// Input for a subtask added from the editor
#[derive(Debug, Clone)]
pub struct NewSubtask {
    pub title: String,
    pub description: Option<String>,
    pub responsible_id: StudentId,
    pub deadline: NaiveDate,
}

/// Check the fields every new or edited task must satisfy.
pub fn validate_fields(
    project: &Project,
    title: &str,
    responsible: &StudentId,
) -> Result<(), EditError> {
    if title.trim().is_empty() {
        return Err(EditError::EmptyTitle);
    }
    if !project.is_participant(responsible) {
        return Err(EditError::NotParticipant(responsible.clone()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TaskEditor {
    nav: NavStack,
    project: Project,
}

impl TaskEditor {
    /// Start editing `task`. `tree` is the project tree the task lives in,
    /// used to find the cap on its own deadline.
    pub fn open(task: TaskNode, tree: &[TaskNode], project: &Project) -> Self {
        let (limit, bound) = match tree_ops::parent_of(tree, &task.id) {
            Some(parent) => (parent.deadline, Bound::Parent(parent.id.clone())),
            None => (project.deadline, Bound::Project),
        };
        TaskEditor {
            nav: NavStack::new(task, limit, bound),
            project: project.clone(),
        }
    }

    pub fn current(&self) -> &TaskNode {
        self.nav.current()
    }

    pub fn navigation(&self) -> &NavStack {
        &self.nav
    }

    /// Latest deadline the current task may take
    pub fn max_deadline(&self) -> NaiveDate {
        self.nav.bound().0
    }

    /// Whether the completion control should be enabled for the current task
    pub fn can_toggle(&self) -> bool {
        let current = self.current();
        current.completed || completion::can_complete(current)
    }

    fn edit(&mut self, f: impl FnOnce(&mut TaskNode)) {
        let mut next = self.current().clone();
        f(&mut next);
        self.nav.replace_current(next);
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), EditError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EditError::EmptyTitle);
        }
        self.edit(|t| t.title = title.to_string());
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) {
        let description = Some(description.to_string()).filter(|d| !d.trim().is_empty());
        self.edit(|t| t.description = description);
    }

    pub fn set_responsible(&mut self, responsible: StudentId) -> Result<(), EditError> {
        if !self.project.is_participant(&responsible) {
            return Err(EditError::NotParticipant(responsible));
        }
        self.edit(|t| t.responsible_id = responsible);
        Ok(())
    }

    /// Change the current task's deadline. Existing subtasks are not
    /// re-validated against the new date.
    pub fn set_deadline(&mut self, date: NaiveDate) -> Result<(), EditError> {
        let (limit, bound) = self.nav.bound();
        deadline::validate_deadline(date, limit, bound)?;
        self.edit(|t| t.deadline = date);
        Ok(())
    }

    /// Toggle the current task through the completion gate.
    pub fn toggle_completed(&mut self) -> Result<Toggle, EditError> {
        let (next, outcome) = completion::apply_toggle(self.current());
        if let Toggle::Blocked { open } = &outcome {
            return Err(EditError::Blocked { open: open.clone() });
        }
        self.nav.replace_current(next);
        Ok(outcome)
    }

    /// Append a provisional subtask to the current task. Returns its id.
    pub fn add_subtask(&mut self, sub: NewSubtask) -> Result<TaskId, EditError> {
        validate_fields(&self.project, &sub.title, &sub.responsible_id)?;
        let current = self.current();
        deadline::validate_deadline(
            sub.deadline,
            current.deadline,
            Bound::Parent(current.id.clone()),
        )?;

        let id = TaskId::provisional();
        let mut node = TaskNode::new(
            id.clone(),
            sub.title.trim(),
            sub.responsible_id,
            sub.deadline,
        );
        node.description = sub.description.filter(|d| !d.trim().is_empty());
        let next = tree_ops::insert_subtask(current, node);
        self.nav.replace_current(next);
        Ok(id)
    }

    pub fn remove_subtask(&mut self, id: &TaskId) -> Result<(), EditError> {
        if !self.current().subtasks.iter().any(|s| s.id == *id) {
            return Err(EditError::SubtaskNotFound(id.clone()));
        }
        let next = tree_ops::remove_subtask(self.current(), id);
        self.nav.replace_current(next);
        Ok(())
    }

    /// Toggle a direct subtask of the current task through the gate.
    pub fn toggle_subtask(&mut self, id: &TaskId) -> Result<Toggle, EditError> {
        let sub = self
            .current()
            .subtasks
            .iter()
            .find(|s| s.id == *id)
            .ok_or_else(|| EditError::SubtaskNotFound(id.clone()))?;
        let (next_sub, outcome) = completion::apply_toggle(sub);
        if let Toggle::Blocked { open } = &outcome {
            return Err(EditError::Blocked { open: open.clone() });
        }
        let next = tree_ops::update(slice_of(self.current()), id, |_| next_sub.clone());
        if let Some(next) = next.into_iter().next() {
            self.nav.replace_current(next);
        }
        Ok(outcome)
    }

    pub fn open_subtask(&mut self, id: &TaskId) -> Result<(), EditError> {
        self.nav.open(id)?;
        Ok(())
    }

    /// Return to the parent task. False when already at the edited task.
    pub fn back(&mut self) -> bool {
        self.nav.back()
    }

    /// The edited task with every nested change applied.
    pub fn finish(self) -> TaskNode {
        self.nav.into_root()
    }
}

fn slice_of(node: &TaskNode) -> &[TaskNode] {
    std::slice::from_ref(node)
}
