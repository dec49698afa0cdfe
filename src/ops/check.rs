use chrono::NaiveDate;
use serde::Serialize;

use crate::model::project::Project;
use crate::model::task::{StudentId, TaskId, TaskNode};
use crate::ops::completion;

/// Structured result from `sb check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// An inconsistency in the stored tree (something that should be fixed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// A subtask is due after its parent
    #[serde(rename = "deadline_after_parent")]
    DeadlineAfterParent {
        task_id: TaskId,
        deadline: NaiveDate,
        parent_id: TaskId,
        parent_deadline: NaiveDate,
    },
    /// A root task is due after the project
    #[serde(rename = "deadline_after_project")]
    DeadlineAfterProject {
        task_id: TaskId,
        deadline: NaiveDate,
        project_deadline: NaiveDate,
    },
    /// A task is marked done while some subtask below it is open
    #[serde(rename = "completed_with_open_subtasks")]
    CompletedWithOpenSubtasks { task_id: TaskId, open: Vec<TaskId> },
}

/// A non-critical finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Responsible student is neither the owner nor a member
    #[serde(rename = "responsible_not_participant")]
    ResponsibleNotParticipant {
        task_id: TaskId,
        responsible_id: StudentId,
    },
    /// Task still carries a client-side placeholder id
    #[serde(rename = "provisional_id")]
    ProvisionalId { task_id: TaskId },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a task tree against its project.
///
/// Read-only. Checks performed:
/// 1. Root deadlines are on or before the project deadline
/// 2. Subtask deadlines are on or before their parent's
/// 3. No completed task has an open subtask
/// 4. Warnings for non-participant assignees and provisional ids
pub fn check_tree(tree: &[TaskNode], project: &Project) -> CheckResult {
    let mut result = CheckResult::default();
    for task in tree {
        if task.deadline > project.deadline {
            result.errors.push(CheckError::DeadlineAfterProject {
                task_id: task.id.clone(),
                deadline: task.deadline,
                project_deadline: project.deadline,
            });
        }
        check_task(task, project, &mut result);
    }
    result.valid = result.errors.is_empty();
    result
}

fn check_task(task: &TaskNode, project: &Project, result: &mut CheckResult) {
    if task.completed && !completion::can_complete(task) {
        result.errors.push(CheckError::CompletedWithOpenSubtasks {
            task_id: task.id.clone(),
            open: completion::open_subtasks(task),
        });
    }

    if !project.is_participant(&task.responsible_id) {
        result.warnings.push(CheckWarning::ResponsibleNotParticipant {
            task_id: task.id.clone(),
            responsible_id: task.responsible_id.clone(),
        });
    }

    if task.id.is_provisional() {
        result.warnings.push(CheckWarning::ProvisionalId {
            task_id: task.id.clone(),
        });
    }

    for sub in &task.subtasks {
        if sub.deadline > task.deadline {
            result.errors.push(CheckError::DeadlineAfterParent {
                task_id: sub.id.clone(),
                deadline: sub.deadline,
                parent_id: task.id.clone(),
                parent_deadline: task.deadline,
            });
        }
        check_task(sub, project, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn project() -> Project {
        let mut p = Project::new("p1", date("2025-12-31"), "owner".into());
        p.member_ids.push("m1".into());
        p
    }

    fn task(id: &str, deadline: &str) -> TaskNode {
        TaskNode::new(id.into(), id, "owner".into(), date(deadline))
    }

    #[test]
    fn consistent_tree_is_valid() {
        let mut root = task("r", "2025-12-01");
        root.subtasks.push(task("a", "2025-11-30").with_parent(Some("r".into())));
        let result = check_tree(&[root], &project());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn shortened_parent_deadline_is_reported() {
        let mut root = task("r", "2025-11-01");
        root.subtasks.push(task("a", "2025-11-30"));
        let result = check_tree(&[root], &project());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![CheckError::DeadlineAfterParent {
                task_id: "a".into(),
                deadline: date("2025-11-30"),
                parent_id: "r".into(),
                parent_deadline: date("2025-11-01"),
            }]
        );
    }

    #[test]
    fn root_after_project_is_reported() {
        let result = check_tree(&[task("r", "2026-02-01")], &project());
        assert!(matches!(
            result.errors[0],
            CheckError::DeadlineAfterProject { .. }
        ));
    }

    #[test]
    fn reopened_child_under_done_parent_is_reported() {
        let mut root = task("r", "2025-12-01");
        root.completed = true;
        root.subtasks.push(task("a", "2025-11-01"));
        let result = check_tree(&[root], &project());
        assert_eq!(
            result.errors,
            vec![CheckError::CompletedWithOpenSubtasks {
                task_id: "r".into(),
                open: vec!["a".into()],
            }]
        );
    }

    #[test]
    fn warnings_for_outsider_and_provisional() {
        let mut t = task("temp_1", "2025-12-01");
        t.responsible_id = "stranger".into();
        let result = check_tree(&[t], &project());
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn serializes_with_type_tags() {
        let result = check_tree(&[task("r", "2026-02-01")], &project());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errors"][0]["type"], "deadline_after_project");
        assert_eq!(json["errors"][0]["deadline"], "2026-02-01");
    }
}
