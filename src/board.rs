//! A loaded project and its task tree, kept in sync with the backend.
//!
//! The board owns the one snapshot the UI renders from. Every mutation is
//! validated, applied to the snapshot immediately, then mirrored to the
//! backend. When the backend refuses a mirrored change the board reloads
//! the authoritative task list rather than trying to undo locally.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{info, warn};

use crate::io::backend::{Backend, BackendError};
use crate::model::config::ConsistencyPolicy;
use crate::model::directory::StudentDirectory;
use crate::model::project::Project;
use crate::model::record::{InviteRequest, MemberRequest, TaskPatch, TaskRecord};
use crate::model::task::{StudentId, TaskId, TaskNode};
use crate::ops::check::{self, CheckResult};
use crate::ops::completion::{self, Toggle};
use crate::ops::deadline;
use crate::ops::editor::{self, EditError};
use crate::ops::hierarchy;
use crate::ops::tree_ops;

/// Error type for board operations
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] EditError),
    #[error("cannot complete {id}: {} subtask(s) still open", .open.len())]
    Blocked { id: TaskId, open: Vec<TaskId> },
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
    #[error("not a member of this project: {0}")]
    NotAMember(StudentId),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl BoardError {
    /// The session was rejected and the user has to sign in again
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BoardError::Backend(e) if e.is_unauthorized())
    }
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// A task to create from scratch
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub responsible_id: StudentId,
    pub deadline: NaiveDate,
    /// `None` creates a top-level task
    pub parent: Option<TaskId>,
}

/// What happened to the provisional subtasks of a saved task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// `(provisional, confirmed)` id pairs
    pub created: Vec<(TaskId, TaskId)>,
    /// Provisional subtasks the backend did not accept; they stay in the
    /// snapshot under their placeholder id until the next reload
    pub failed: Vec<TaskId>,
    /// Subtasks removed during the edit and deleted on the backend
    pub deleted: Vec<TaskId>,
    /// Removed subtasks the backend failed to delete
    pub failed_deletes: Vec<TaskId>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.failed_deletes.is_empty()
    }
}

pub struct ProjectBoard<B: Backend> {
    backend: B,
    project: Project,
    tasks: Vec<TaskNode>,
    directory: StudentDirectory,
    policy: ConsistencyPolicy,
}

impl<B: Backend> ProjectBoard<B> {
    /// Fetch the project, its tasks, and the names of its participants.
    pub async fn load(
        backend: B,
        project_id: &str,
        policy: ConsistencyPolicy,
    ) -> Result<Self, BoardError> {
        let project = Project::from_record(backend.get_project(project_id).await?);
        let records = backend.get_project_tasks(project_id).await?;
        let tasks = hierarchy::build_tree(records);
        let participants: Vec<StudentId> = project.participants().into_iter().cloned().collect();
        let directory = StudentDirectory::resolve(&backend, participants).await;
        info!(
            project = %project.id,
            tasks = hierarchy::count(&tasks),
            "loaded project"
        );
        Ok(ProjectBoard {
            backend,
            project,
            tasks,
            directory,
            policy,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    pub fn directory(&self) -> &StudentDirectory {
        &self.directory
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> ConsistencyPolicy {
        self.policy
    }

    pub fn find(&self, id: &TaskId) -> Option<&TaskNode> {
        tree_ops::find(&self.tasks, id)
    }

    /// Whole-tree consistency report for the current snapshot
    pub fn check(&self) -> CheckResult {
        check::check_tree(&self.tasks, &self.project)
    }

    /// Replace the snapshot with the backend's current task list.
    pub async fn reload(&mut self) -> Result<(), BoardError> {
        let records = self.backend.get_project_tasks(&self.project.id).await?;
        self.tasks = hierarchy::build_tree(records);
        info!(project = %self.project.id, "reloaded tasks");
        Ok(())
    }

    /// Compensating reload after a failed write. A failing reload leaves
    /// the (possibly stale) snapshot in place.
    async fn recover(&mut self, cause: &BackendError) {
        warn!(error = %cause, "backend rejected change, reloading tasks");
        if let Err(e) = self.reload().await {
            warn!(error = %e, "failed to reload tasks after failed update");
        }
    }

    fn commit(&mut self, tasks: Vec<TaskNode>) {
        self.tasks = tasks;
        if self.policy == ConsistencyPolicy::Eager {
            let result = self.check();
            for error in &result.errors {
                warn!(?error, "task tree inconsistency");
            }
        }
    }

    /// Copy the backend's view of a task into the snapshot, keeping the
    /// node's position and subtasks.
    fn reconcile(&mut self, id: &TaskId, record: TaskRecord) {
        let tasks = tree_ops::update(&self.tasks, id, |node| {
            let mut confirmed = TaskNode::from_record(record.clone());
            confirmed.parent_id = node.parent_id.clone();
            confirmed.subtasks = node.subtasks.clone();
            for sub in &mut confirmed.subtasks {
                sub.parent_id = Some(confirmed.id.clone());
            }
            confirmed
        });
        self.tasks = tasks;
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Create a task. It shows up at once under a provisional id, which is
    /// swapped for the backend's id on success; on failure it is discarded.
    pub async fn create_task(&mut self, draft: TaskDraft) -> Result<TaskId, BoardError> {
        editor::validate_fields(&self.project, &draft.title, &draft.responsible_id)?;
        deadline::validate_placement(
            &self.tasks,
            &self.project,
            draft.parent.as_ref(),
            draft.deadline,
        )
        .map_err(EditError::from)?;

        let provisional = TaskId::provisional();
        let mut node = TaskNode::new(
            provisional.clone(),
            draft.title.trim(),
            draft.responsible_id,
            draft.deadline,
        );
        node.description = draft.description.filter(|d| !d.trim().is_empty());
        let node = node.with_parent(draft.parent.clone());
        let request = node.to_new_record(&self.project.id);
        let tasks = tree_ops::insert_into(&self.tasks, draft.parent.as_ref(), node);
        self.commit(tasks);

        match self.backend.create_task(&request).await {
            Ok(created) => {
                let id = created.id.clone();
                self.tasks = tree_ops::rename(&self.tasks, &provisional, &id);
                self.reconcile(&id, created);
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "failed to create task, discarding provisional entry");
                self.tasks = tree_ops::remove_from(&self.tasks, &provisional);
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Toggle completion of `id` through the completion gate, then persist
    /// the task with a full update.
    pub async fn toggle(&mut self, id: &TaskId) -> Result<Toggle, BoardError> {
        let (tasks, outcome) = completion::toggle_in_tree(&self.tasks, id);
        let outcome = outcome.ok_or_else(|| BoardError::NotFound(id.clone()))?;
        if let Toggle::Blocked { open } = &outcome {
            return Err(BoardError::Blocked {
                id: id.clone(),
                open: open.clone(),
            });
        }
        self.commit(tasks);

        let Some(record) = self.find(id).map(|t| t.to_record(&self.project.id)) else {
            return Err(BoardError::NotFound(id.clone()));
        };
        match self.backend.update_task(id, &record).await {
            Ok(updated) => {
                self.reconcile(id, updated);
                Ok(outcome)
            }
            Err(e) => {
                self.recover(&e).await;
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Edit
    // -----------------------------------------------------------------------

    /// Save a task edited with [`crate::ops::editor::TaskEditor`].
    ///
    /// Existing subtasks changed in the editor are patched first, children
    /// before parents, then the task itself. A failure in any of those
    /// reloads and returns the error, so a parent is never stored as done
    /// over a subtask the backend still has open. Provisional subtasks are
    /// then created one by one and subtasks removed in the editor are
    /// deleted; individual failures there are logged and reported without
    /// aborting the rest.
    ///
    /// Deadlines are only checked where they changed, so a tree that went
    /// out of bounds elsewhere can still be saved.
    pub async fn save_task(&mut self, edited: TaskNode) -> Result<SaveReport, BoardError> {
        let existing = self
            .find(&edited.id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(edited.id.clone()))?;

        editor::validate_fields(&self.project, &edited.title, &edited.responsible_id)?;
        let parent = tree_ops::parent_of(&self.tasks, &edited.id).map(|p| p.id.clone());
        if edited.deadline != existing.deadline {
            deadline::validate_placement(
                &self.tasks,
                &self.project,
                parent.as_ref(),
                edited.deadline,
            )
            .map_err(EditError::from)?;
        }
        check_completion(&edited, &existing)?;

        let changed = changed_subtasks(&existing, &edited);
        for (node, node_parent) in &changed {
            self.validate_subtask_edit(&existing, &edited, node, node_parent)?;
        }

        let mut edited = edited.with_parent(parent.clone());
        edited.title = edited.title.trim().to_string();
        let id = edited.id.clone();
        let tasks = tree_ops::replace(&self.tasks, &id, edited.clone());
        self.commit(tasks);

        for (node, node_parent) in &changed {
            let patch = self.patch_for(node, Some(node_parent.clone()));
            match self.backend.patch_task(&node.id, &patch).await {
                Ok(updated) => self.reconcile(&node.id, updated),
                Err(e) => {
                    warn!(subtask = %node.id, error = %e, "failed to save subtask");
                    self.recover(&e).await;
                    return Err(e.into());
                }
            }
        }

        let patch = self.patch_for(&edited, parent);
        match self.backend.patch_task(&id, &patch).await {
            Ok(updated) => self.reconcile(&id, updated),
            Err(e) => {
                self.recover(&e).await;
                return Err(e.into());
            }
        }

        let mut report = SaveReport::default();
        self.create_pending_subtasks(&edited, &mut report).await;
        self.delete_removed_subtasks(&existing, &edited, &mut report)
            .await;
        if !report.is_complete() {
            warn!(
                task = %id,
                failed = report.failed.len(),
                failed_deletes = report.failed_deletes.len(),
                "task saved with some subtask changes not persisted"
            );
        }
        Ok(report)
    }

    /// Check one changed subtask against the same rules as the edited task.
    /// Its deadline bound is its parent in the edited tree.
    fn validate_subtask_edit(
        &self,
        existing: &TaskNode,
        edited: &TaskNode,
        node: &TaskNode,
        parent: &TaskId,
    ) -> Result<(), BoardError> {
        editor::validate_fields(&self.project, &node.title, &node.responsible_id)?;
        let Some(before) = tree_ops::find(&existing.subtasks, &node.id) else {
            return Ok(());
        };
        if node.deadline != before.deadline {
            deadline::validate_placement(
                std::slice::from_ref(edited),
                &self.project,
                Some(parent),
                node.deadline,
            )
            .map_err(EditError::from)?;
        }
        check_completion(node, before)
    }

    /// Full patch of a task's own fields
    fn patch_for(&self, node: &TaskNode, parent: Option<TaskId>) -> TaskPatch {
        TaskPatch {
            name: Some(node.title.trim().to_string()),
            result: Some(node.description.clone().unwrap_or_default()),
            deadline: Some(node.deadline),
            is_completed: Some(node.completed),
            project_id: Some(self.project.id.clone()),
            responsible_student_id: Some(node.responsible_id.clone()),
            prerequisites: Some(node.prerequisites.clone()),
            dependent_task_id: Some(parent),
        }
    }

    async fn create_pending_subtasks(&mut self, edited: &TaskNode, report: &mut SaveReport) {
        let mut pending = Vec::new();
        collect_provisional(&edited.subtasks, &edited.id, &mut pending);

        let mut confirmed: HashMap<TaskId, TaskId> = HashMap::new();
        for (node, parent) in pending {
            let parent = confirmed.get(&parent).cloned().unwrap_or(parent);
            if parent.is_provisional() {
                // parent was never created, so this one cannot be either
                report.failed.push(node.id.clone());
                continue;
            }
            let request = node
                .clone()
                .with_parent(Some(parent))
                .to_new_record(&self.project.id);
            match self.backend.create_task(&request).await {
                Ok(created) => {
                    let new_id = created.id.clone();
                    self.tasks = tree_ops::rename(&self.tasks, &node.id, &new_id);
                    self.reconcile(&new_id, created);
                    confirmed.insert(node.id.clone(), new_id.clone());
                    report.created.push((node.id.clone(), new_id));
                }
                Err(e) => {
                    warn!(subtask = %node.id, error = %e, "failed to create subtask");
                    report.failed.push(node.id.clone());
                }
            }
        }
    }

    async fn delete_removed_subtasks(
        &mut self,
        existing: &TaskNode,
        edited: &TaskNode,
        report: &mut SaveReport,
    ) {
        let kept: HashSet<TaskId> = edited.subtree_ids().into_iter().collect();
        let mut removed: Vec<TaskId> = existing
            .subtree_ids()
            .into_iter()
            .filter(|id| !kept.contains(id) && !id.is_provisional())
            .collect();
        // children before parents
        removed.reverse();
        for id in removed {
            match self.backend.delete_task(&id).await {
                Ok(()) => report.deleted.push(id),
                Err(e) => {
                    warn!(subtask = %id, error = %e, "failed to delete removed subtask");
                    report.failed_deletes.push(id);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove a task and its subtree. Backend deletes run children first;
    /// the first failure reloads and is returned.
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<(), BoardError> {
        let node = self
            .find(id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(id.clone()))?;
        let tasks = tree_ops::remove_from(&self.tasks, id);
        self.commit(tasks);

        let mut ids = node.subtree_ids();
        ids.reverse();
        for target in ids.iter().filter(|t| !t.is_provisional()) {
            if let Err(e) = self.backend.delete_task(target).await {
                self.recover(&e).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Invite a student to the project by email. Returns the invited id.
    pub async fn invite(&mut self, email: &str) -> Result<StudentId, BoardError> {
        let email = email.trim();
        if !EMAIL.is_match(email) {
            return Err(BoardError::InvalidEmail(email.to_string()));
        }
        let student = self.backend.get_student_by_email(email).await?;
        let invite = InviteRequest {
            email: email.to_string(),
            project_id: self.project.id.clone(),
            student_id: student.id.clone(),
        };
        self.backend.invite_student(&invite).await?;
        let name = student.display_name();
        if !name.is_empty() {
            self.directory.insert(student.id.clone(), name);
        }
        info!(project = %self.project.id, student = %student.id, "invitation sent");
        Ok(student.id)
    }

    /// Remove a member from the project. The member list changes at once;
    /// if the backend refuses, the project is fetched again to restore it.
    pub async fn remove_member(&mut self, student: &StudentId) -> Result<(), BoardError> {
        if !self.project.member_ids.contains(student) {
            return Err(BoardError::NotAMember(student.clone()));
        }
        self.project.member_ids.retain(|m| m != student);

        let request = MemberRequest {
            project_id: self.project.id.clone(),
            student_id: student.clone(),
        };
        if let Err(e) = self.backend.remove_member(&request).await {
            warn!(error = %e, "backend rejected member removal, reloading members");
            match self.backend.get_project(&self.project.id).await {
                Ok(record) => self.project.member_ids = record.members,
                Err(reload) => warn!(error = %reload, "failed to reload members"),
            }
            return Err(e.into());
        }
        info!(project = %self.project.id, student = %student, "member removed");
        Ok(())
    }
}

/// A task newly marked done must pass the completion gate.
fn check_completion(node: &TaskNode, before: &TaskNode) -> Result<(), BoardError> {
    if node.completed && !before.completed && !completion::can_complete(node) {
        return Err(BoardError::Blocked {
            id: node.id.clone(),
            open: completion::open_subtasks(node),
        });
    }
    Ok(())
}

/// Whether the fields stored for a task differ, ignoring its subtasks
fn fields_differ(a: &TaskNode, b: &TaskNode) -> bool {
    a.title.trim() != b.title.trim()
        || a.description != b.description
        || a.responsible_id != b.responsible_id
        || a.deadline != b.deadline
        || a.completed != b.completed
        || a.prerequisites != b.prerequisites
}

/// Confirmed subtasks of `edited` whose fields differ from `existing`, with
/// their parent ids. Post-order, so children come before their parents.
fn changed_subtasks(existing: &TaskNode, edited: &TaskNode) -> Vec<(TaskNode, TaskId)> {
    fn walk(
        existing: &TaskNode,
        tasks: &[TaskNode],
        parent: &TaskId,
        out: &mut Vec<(TaskNode, TaskId)>,
    ) {
        for task in tasks {
            walk(existing, &task.subtasks, &task.id, out);
            if task.id.is_provisional() {
                continue;
            }
            if let Some(before) = tree_ops::find(&existing.subtasks, &task.id)
                && fields_differ(before, task)
            {
                out.push((task.clone(), parent.clone()));
            }
        }
    }
    let mut out = Vec::new();
    walk(existing, &edited.subtasks, &edited.id, &mut out);
    out
}

/// Provisional nodes below `parent` with their parent ids, pre-order so a
/// parent is always visited before its children.
fn collect_provisional(tasks: &[TaskNode], parent: &TaskId, out: &mut Vec<(TaskNode, TaskId)>) {
    for task in tasks {
        if task.id.is_provisional() {
            let mut flat = task.clone();
            flat.subtasks = Vec::new();
            out.push((flat, parent.clone()));
        }
        collect_provisional(&task.subtasks, &task.id, out);
    }
}
