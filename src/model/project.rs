use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::ProjectRecord;
use super::task::StudentId;

/// The project that owns a task tree (read-only context for the core)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub subject_name: String,
    /// Upper bound for every root task's deadline
    pub deadline: NaiveDate,
    pub owner_id: StudentId,
    /// Invited members (the owner is not necessarily listed here)
    pub member_ids: Vec<StudentId>,
}

impl Project {
    pub fn new(id: impl Into<String>, deadline: NaiveDate, owner_id: StudentId) -> Self {
        Project {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            subject_name: String::new(),
            deadline,
            owner_id,
            member_ids: Vec::new(),
        }
    }

    pub fn from_record(record: ProjectRecord) -> Self {
        Project {
            id: record.id,
            name: record.name,
            description: record.description,
            subject_name: record.subject_name,
            deadline: record.deadline,
            owner_id: record.creator_id,
            member_ids: record.members,
        }
    }

    /// Owner first, then members in order, without duplicates
    pub fn participants(&self) -> Vec<&StudentId> {
        let mut out = vec![&self.owner_id];
        for member in &self.member_ids {
            if !out.contains(&member) {
                out.push(member);
            }
        }
        out
    }

    /// Whether `id` may be assigned as responsible for a task
    pub fn is_participant(&self, id: &StudentId) -> bool {
        self.owner_id == *id || self.member_ids.contains(id)
    }
}
