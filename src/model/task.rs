use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::record::{NewTaskRecord, TaskRecord};

/// Prefix used for ids generated on the client before the backend confirms a task
pub const PROVISIONAL_PREFIX: &str = "temp_";

static PROVISIONAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque task identifier as issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    /// Generate a placeholder id (`temp_<millis>_<seq>`) for a task the
    /// backend has not confirmed yet.
    pub fn provisional() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = PROVISIONAL_SEQ.fetch_add(1, Ordering::Relaxed);
        TaskId(format!("{}{}_{}", PROVISIONAL_PREFIX, millis, seq))
    }

    /// Whether this id was issued by [`TaskId::provisional`]. Ids from the
    /// backend are opaque and never provisional, digits-only ones included.
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

/// Opaque student identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        StudentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(s: &str) -> Self {
        StudentId(s.to_string())
    }
}

/// A task together with the subtasks it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub title: String,
    /// Free text; the backend calls this field `result`
    pub description: Option<String>,
    /// Assigned participant (owner or member of the project)
    pub responsible_id: StudentId,
    pub deadline: NaiveDate,
    pub completed: bool,
    /// Passed through to the backend unchanged
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<TaskId>,
    /// Enclosing task; `None` for top-level tasks
    pub parent_id: Option<TaskId>,
    /// Subtasks (recursive), in insertion order
    #[serde(default)]
    pub subtasks: Vec<TaskNode>,
}

impl TaskNode {
    /// Create an incomplete task without subtasks
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        responsible_id: StudentId,
        deadline: NaiveDate,
    ) -> Self {
        TaskNode {
            id,
            title: title.into(),
            description: None,
            responsible_id,
            deadline,
            completed: false,
            prerequisites: Vec::new(),
            parent_id: None,
            subtasks: Vec::new(),
        }
    }

    /// Convert a flat backend record; subtasks are attached by the hierarchy builder.
    pub fn from_record(record: TaskRecord) -> Self {
        let description = Some(record.result).filter(|r| !r.is_empty());
        TaskNode {
            id: record.id,
            title: record.name,
            description,
            responsible_id: record.responsible_student_id,
            deadline: record.deadline,
            completed: record.is_completed,
            prerequisites: record.prerequisites,
            parent_id: record.dependent_task_id,
            subtasks: Vec::new(),
        }
    }

    /// Full record for a PUT, subtasks excluded
    pub fn to_record(&self, project_id: &str) -> TaskRecord {
        TaskRecord {
            id: self.id.clone(),
            name: self.title.clone(),
            result: self.description.clone().unwrap_or_default(),
            deadline: self.deadline,
            is_completed: self.completed,
            project_id: project_id.to_string(),
            responsible_student_id: self.responsible_id.clone(),
            prerequisites: self.prerequisites.clone(),
            dependent_task_id: self.parent_id.clone(),
        }
    }

    /// Creation request for this node (the id is assigned by the backend)
    pub fn to_new_record(&self, project_id: &str) -> NewTaskRecord {
        NewTaskRecord {
            name: self.title.clone(),
            result: self.description.clone().unwrap_or_default(),
            deadline: self.deadline,
            project_id: project_id.to_string(),
            responsible_student_id: self.responsible_id.clone(),
            dependent_task_id: self.parent_id.clone(),
        }
    }

    pub fn with_parent(mut self, parent_id: Option<TaskId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = Some(description).filter(|d| !d.is_empty());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// Ids of this node and every node below it, pre-order
    pub fn subtree_ids(&self) -> Vec<TaskId> {
        let mut ids = Vec::new();
        collect_ids(self, &mut ids);
        ids
    }
}

fn collect_ids(node: &TaskNode, out: &mut Vec<TaskId>) {
    out.push(node.id.clone());
    for sub in &node.subtasks {
        collect_ids(sub, out);
    }
}
