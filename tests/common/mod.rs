//! In-memory backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use studyboard::io::backend::{Backend, BackendError};
use studyboard::model::record::{
    InviteRequest, MemberRequest, NewTaskRecord, ProjectRecord, StudentRecord, TaskPatch, TaskRecord,
};
use studyboard::model::task::{StudentId, TaskId};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn student(id: &str, first: &str, last: &str, email: &str) -> StudentRecord {
    StudentRecord {
        id: id.into(),
        first_name: first.into(),
        last_name: last.into(),
        email: email.into(),
        project_id: None,
        project_task_ids: Vec::new(),
    }
}

pub fn record(id: &str, name: &str, deadline: &str, parent: Option<&str>) -> TaskRecord {
    TaskRecord {
        id: id.into(),
        name: name.into(),
        result: String::new(),
        deadline: date(deadline),
        is_completed: false,
        project_id: "p-1".into(),
        responsible_student_id: "s-owner".into(),
        prerequisites: Vec::new(),
        dependent_task_id: parent.map(TaskId::from),
    }
}

/// Which backend operation a failure is injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetProject,
    GetTasks,
    Create,
    Update,
    Patch,
    Delete,
    GetStudent,
    Invite,
    Members,
}

struct State {
    project: ProjectRecord,
    tasks: Vec<TaskRecord>,
    students: Vec<StudentRecord>,
    invites: Vec<InviteRequest>,
    next_id: u64,
    failing: HashSet<Op>,
    /// Creation requests with these names are refused
    failing_names: HashSet<String>,
    calls: Vec<String>,
}

pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    /// Project `p-1` due 2025-12-31, owned by `s-owner` with member `s-member`.
    pub fn new() -> Self {
        let project = ProjectRecord {
            id: "p-1".into(),
            name: "Thesis".into(),
            description: String::new(),
            deadline: date("2025-12-31"),
            tasks: Vec::new(),
            members: vec!["s-member".into()],
            subject_name: "Computer Science".into(),
            creator_id: "s-owner".into(),
        };
        let state = State {
            project,
            students: vec![
                student("s-owner", "Ada", "Lovelace", "ada@example.org"),
                student("s-member", "Alan", "Turing", "alan@example.org"),
                student("s-new", "Grace", "Hopper", "grace@example.org"),
            ],
            next_id: 100,
            tasks: Vec::new(),
            invites: Vec::new(),
            failing: HashSet::new(),
            failing_names: HashSet::new(),
            calls: Vec::new(),
        };
        FakeBackend {
            state: Mutex::new(state),
        }
    }

    pub fn with_tasks(self, tasks: Vec<TaskRecord>) -> Self {
        self.state.lock().unwrap().tasks = tasks;
        self
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    pub fn fail_create_named(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_names
            .insert(name.to_string());
    }

    /// Server-side edit that bypasses the board (another client)
    pub fn set_completed(&self, id: &str, completed: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(t) = state.tasks.iter_mut().find(|t| t.id.as_str() == id) {
            t.is_completed = completed;
        }
    }

    /// Server-side deadline change that bypasses the board
    pub fn set_deadline(&self, id: &str, deadline: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(t) = state.tasks.iter_mut().find(|t| t.id.as_str() == id) {
            t.deadline = date(deadline);
        }
    }

    pub fn members(&self) -> Vec<StudentId> {
        self.state.lock().unwrap().project.members.clone()
    }

    pub fn task(&self, id: &str) -> Option<TaskRecord> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t.id.as_str() == id)
            .cloned()
    }

    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.state.lock().unwrap().tasks.clone()
    }

    pub fn invites(&self) -> Vec<InviteRequest> {
        self.state.lock().unwrap().invites.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, op: Op, call: String) -> Result<std::sync::MutexGuard<'_, State>, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("{:?} failed", op),
            });
        }
        Ok(state)
    }
}

fn not_found(what: &str) -> BackendError {
    BackendError::Status {
        status: 404,
        message: format!("{} not found", what),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_project(&self, project_id: &str) -> Result<ProjectRecord, BackendError> {
        let state = self.enter(Op::GetProject, format!("GET project {}", project_id))?;
        if project_id != state.project.id {
            return Err(not_found(project_id));
        }
        Ok(state.project.clone())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, BackendError> {
        let state = self.enter(Op::GetProject, "GET projects".to_string())?;
        Ok(vec![state.project.clone()])
    }

    async fn get_project_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>, BackendError> {
        let state = self.enter(Op::GetTasks, format!("GET tasks {}", project_id))?;
        Ok(state.tasks.clone())
    }

    async fn create_task(&self, task: &NewTaskRecord) -> Result<TaskRecord, BackendError> {
        let mut state = self.enter(Op::Create, format!("POST {}", task.name))?;
        if state.failing_names.contains(&task.name) {
            return Err(BackendError::Other(format!("refused {}", task.name)));
        }
        state.next_id += 1;
        let created = TaskRecord {
            id: TaskId::new(format!("task-{}", state.next_id)),
            name: task.name.clone(),
            result: task.result.clone(),
            deadline: task.deadline,
            is_completed: false,
            project_id: task.project_id.clone(),
            responsible_student_id: task.responsible_student_id.clone(),
            prerequisites: Vec::new(),
            dependent_task_id: task.dependent_task_id.clone(),
        };
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: &TaskId, task: &TaskRecord) -> Result<TaskRecord, BackendError> {
        let mut state = self.enter(Op::Update, format!("PUT {}", id))?;
        let slot = state
            .tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| not_found(id.as_str()))?;
        *slot = task.clone();
        Ok(task.clone())
    }

    async fn patch_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<TaskRecord, BackendError> {
        let mut state = self.enter(Op::Patch, format!("PATCH {}", id))?;
        let slot = state
            .tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| not_found(id.as_str()))?;
        if let Some(name) = &patch.name {
            slot.name = name.clone();
        }
        if let Some(result) = &patch.result {
            slot.result = result.clone();
        }
        if let Some(deadline) = patch.deadline {
            slot.deadline = deadline;
        }
        if let Some(done) = patch.is_completed {
            slot.is_completed = done;
        }
        if let Some(responsible) = &patch.responsible_student_id {
            slot.responsible_student_id = responsible.clone();
        }
        if let Some(parent) = &patch.dependent_task_id {
            slot.dependent_task_id = parent.clone();
        }
        Ok(slot.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError> {
        let mut state = self.enter(Op::Delete, format!("DELETE {}", id))?;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != *id);
        if state.tasks.len() == before {
            return Err(not_found(id.as_str()));
        }
        Ok(())
    }

    async fn get_student_by_id(&self, id: &StudentId) -> Result<StudentRecord, BackendError> {
        let state = self.enter(Op::GetStudent, format!("GET student {}", id))?;
        state
            .students
            .iter()
            .find(|s| s.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id.as_str()))
    }

    async fn get_student_by_email(&self, email: &str) -> Result<StudentRecord, BackendError> {
        let state = self.enter(Op::GetStudent, format!("GET student {}", email))?;
        state
            .students
            .iter()
            .find(|s| s.email == email)
            .cloned()
            .ok_or_else(|| not_found(email))
    }

    async fn get_current_student(&self) -> Result<StudentRecord, BackendError> {
        let state = self.enter(Op::GetStudent, "GET student me".to_string())?;
        state
            .students
            .first()
            .cloned()
            .ok_or_else(|| not_found("me"))
    }

    async fn invite_student(&self, invite: &InviteRequest) -> Result<(), BackendError> {
        let mut state = self.enter(Op::Invite, format!("POST invite {}", invite.email))?;
        state.invites.push(invite.clone());
        Ok(())
    }

    async fn accept_invite(
        &self,
        student: &StudentId,
        project_id: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.enter(Op::Members, format!("GET accept {} {}", student, project_id))?;
        if project_id != state.project.id {
            return Err(not_found(project_id));
        }
        if !state.project.members.contains(student) {
            state.project.members.push(student.clone());
        }
        Ok(())
    }

    async fn remove_member(&self, request: &MemberRequest) -> Result<(), BackendError> {
        let mut state = self.enter(
            Op::Members,
            format!("DELETE member {}", request.student_id),
        )?;
        state.project.members.retain(|m| *m != request.student_id);
        Ok(())
    }
}
