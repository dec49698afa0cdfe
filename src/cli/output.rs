use chrono::NaiveDate;
use serde::Serialize;

use crate::model::directory::StudentDirectory;
use crate::model::project::Project;
use crate::model::task::{StudentId, TaskId, TaskNode};
use crate::ops::check::{CheckError, CheckResult, CheckWarning};
use crate::ops::completion::{self, Progress};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub responsible_id: StudentId,
    pub responsible: String,
    pub deadline: NaiveDate,
    pub completed: bool,
    /// Whether the completion gate would accept marking this task done
    pub can_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct TreeJson {
    pub project_id: String,
    pub project: String,
    pub deadline: NaiveDate,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct ShowJson {
    /// Root-first, without subtasks
    pub ancestors: Vec<TaskJson>,
    pub task: TaskJson,
    pub max_deadline: NaiveDate,
}

#[derive(Serialize)]
pub struct ProjectJson {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub deadline: NaiveDate,
    /// "owner" or "member"
    pub role: &'static str,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// The student's role in `project`, `None` when not a participant
pub fn project_role(project: &Project, student: &StudentId) -> Option<&'static str> {
    if project.owner_id == *student {
        Some("owner")
    } else if project.member_ids.contains(student) {
        Some("member")
    } else {
        None
    }
}

pub fn project_to_json(project: &Project, role: &'static str) -> ProjectJson {
    ProjectJson {
        id: project.id.clone(),
        name: project.name.clone(),
        subject: project.subject_name.clone(),
        deadline: project.deadline,
        role,
    }
}

pub fn task_to_json(task: &TaskNode, dir: &StudentDirectory) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        responsible_id: task.responsible_id.clone(),
        responsible: dir.display_name(&task.responsible_id),
        deadline: task.deadline,
        completed: task.completed,
        can_complete: completion::can_complete(task),
        progress: task.has_subtasks().then(|| completion::progress(task)),
        subtasks: task
            .subtasks
            .iter()
            .map(|s| task_to_json(s, dir))
            .collect(),
    }
}

/// JSON for a task without its subtasks (ancestor listings)
pub fn task_summary_json(task: &TaskNode, dir: &StudentDirectory) -> TaskJson {
    TaskJson {
        subtasks: Vec::new(),
        ..task_to_json(task, dir)
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_char(task: &TaskNode) -> char {
    if task.completed { 'x' } else { ' ' }
}

/// Format a single task as a one-line summary
pub fn format_task_line(task: &TaskNode, dir: &StudentDirectory) -> String {
    let badge = if task.has_subtasks() {
        let p = completion::progress(task);
        format!(" {}/{}", p.done, p.total)
    } else {
        String::new()
    };
    let blocked = if !task.completed && !completion::can_complete(task) {
        " !"
    } else {
        ""
    };
    format!(
        "[{}] {} {} @{} due:{}{}{}",
        check_char(task),
        task.id,
        task.title,
        dir.display_name(&task.responsible_id),
        task.deadline,
        badge,
        blocked
    )
}

/// Format a task with its subtasks, indented
pub fn format_task_tree(task: &TaskNode, dir: &StudentDirectory, indent: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let prefix = "  ".repeat(indent);
    lines.push(format!("{}{}", prefix, format_task_line(task, dir)));

    for sub in &task.subtasks {
        lines.extend(format_task_tree(sub, dir, indent + 1));
    }
    lines
}

/// Format a whole forest under a project header
pub fn format_tree(
    project_name: &str,
    deadline: NaiveDate,
    tasks: &[TaskNode],
    dir: &StudentDirectory,
) -> Vec<String> {
    let mut lines = vec![format!("== {} (due {}) ==", project_name, deadline)];
    if tasks.is_empty() {
        lines.push("(no tasks)".to_string());
    }
    for task in tasks {
        lines.extend(format_task_tree(task, dir, 0));
    }
    lines
}

/// Format detailed task view
pub fn format_task_detail(
    task: &TaskNode,
    ancestors: &[&TaskNode],
    max_deadline: NaiveDate,
    dir: &StudentDirectory,
) -> Vec<String> {
    let mut lines = Vec::new();

    if !ancestors.is_empty() {
        let path: Vec<&str> = ancestors.iter().map(|a| a.title.as_str()).collect();
        lines.push(format!("in: {}", path.join(" > ")));
    }
    lines.push(format!("[{}] {} {}", check_char(task), task.id, task.title));
    lines.push(format!(
        "responsible: {}",
        dir.display_name(&task.responsible_id)
    ));
    lines.push(format!("deadline: {} (latest {})", task.deadline, max_deadline));

    if let Some(description) = &task.description {
        lines.push("description:".to_string());
        for line in description.lines() {
            lines.push(format!("  {}", line));
        }
    }

    if task.has_subtasks() {
        let p = completion::progress(task);
        lines.push(String::new());
        lines.push(format!("subtasks ({}/{} done):", p.done, p.total));
        for sub in &task.subtasks {
            lines.push(format!("  {}", format_task_line(sub, dir)));
        }
    }

    lines
}

/// Format a project listing line: `id name (due date) [role]`
pub fn format_project_line(project: &Project, role: &str) -> String {
    let mut line = format!("{} {} (due {}) [{}]", project.id, project.name, project.deadline, role);
    if !project.subject_name.is_empty() {
        line.push_str(&format!(" {}", project.subject_name));
    }
    line
}

/// Format a consistency check report
pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(match err {
                CheckError::DeadlineAfterParent {
                    task_id,
                    deadline,
                    parent_id,
                    parent_deadline,
                } => format!(
                    "  {} is due {} after its parent {} ({})",
                    task_id, deadline, parent_id, parent_deadline
                ),
                CheckError::DeadlineAfterProject {
                    task_id,
                    deadline,
                    project_deadline,
                } => format!(
                    "  {} is due {} after the project ({})",
                    task_id, deadline, project_deadline
                ),
                CheckError::CompletedWithOpenSubtasks { task_id, open } => {
                    let open: Vec<String> = open.iter().map(|id| id.to_string()).collect();
                    format!(
                        "  {} is done but has open subtasks: {}",
                        task_id,
                        open.join(", ")
                    )
                }
            });
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warn in &result.warnings {
            lines.push(match warn {
                CheckWarning::ResponsibleNotParticipant {
                    task_id,
                    responsible_id,
                } => format!(
                    "  {} is assigned to {}, who is not in the project",
                    task_id, responsible_id
                ),
                CheckWarning::ProvisionalId { task_id } => {
                    format!("  {} has not been confirmed by the server", task_id)
                }
            });
        }
    }
    if result.valid {
        lines.push("✓ task tree is consistent".to_string());
    } else {
        lines.push("✗ task tree has errors".to_string());
    }
    lines
}
