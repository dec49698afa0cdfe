//! Wire records exchanged with the backend.
//!
//! Field names follow the backend's camelCase JSON. Dates travel as
//! `YYYY-MM-DD`; a full ISO date-time is also accepted and truncated to its
//! date part, since deadlines have day granularity.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::task::{StudentId, TaskId};

/// A task as stored by the backend (flat, parent referenced by id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    #[serde(with = "date_format")]
    pub deadline: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,
    pub responsible_student_id: StudentId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prerequisites: Vec<TaskId>,
    #[serde(default)]
    pub dependent_task_id: Option<TaskId>,
}

impl TaskRecord {
    /// Parent reference (`dependentTaskId`)
    pub fn parent(&self) -> Option<&TaskId> {
        self.dependent_task_id.as_ref()
    }
}

/// Body of a task creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRecord {
    pub name: String,
    pub result: String,
    #[serde(with = "date_format")]
    pub deadline: NaiveDate,
    pub project_id: String,
    pub responsible_student_id: StudentId,
    pub dependent_task_id: Option<TaskId>,
}

/// Partial task update; absent fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_date_format"
    )]
    pub deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_student_id: Option<StudentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<Vec<TaskId>>,
    /// `Some(None)` clears the parent link, `None` leaves it alone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_task_id: Option<Option<TaskId>>,
}

/// A project as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(with = "date_format")]
    pub deadline: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<TaskId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<StudentId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject_name: String,
    pub creator_id: StudentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_task_ids: Vec<TaskId>,
}

impl StudentRecord {
    /// "First Last", trimmed; empty when both names are blank
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub email: String,
    pub project_id: String,
    pub student_id: StudentId,
}

/// Body of a request removing a member from a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub project_id: String,
    pub student_id: StudentId,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse the date part of `YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ss[...]`.
pub fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_wire_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
    }
}

pub mod opt_date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => super::date_format::serialize(d, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => super::parse_wire_date(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw))),
            None => Ok(None),
        }
    }
}
