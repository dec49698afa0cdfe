use async_trait::async_trait;

use crate::model::record::{
    InviteRequest, MemberRequest, NewTaskRecord, ProjectRecord, StudentRecord, TaskPatch,
    TaskRecord,
};
use crate::model::task::{StudentId, TaskId};

/// Error type for backend calls
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Session missing or expired; the user has to sign in again
    #[error("not authenticated (HTTP 401), please sign in again")]
    Unauthorized,
    #[error("API error: {status} {message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    #[error("empty response from {0}")]
    EmptyBody(String),
    /// Returned by in-process backends (tests, offline stubs)
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }
}

/// The persistence service the board reads from and mirrors mutations to.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_project(&self, project_id: &str) -> Result<ProjectRecord, BackendError>;

    /// Every project visible to the signed-in student
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, BackendError>;

    /// Flat list of every task of the project
    async fn get_project_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>, BackendError>;

    /// Create a task; the returned record carries the assigned id
    async fn create_task(&self, task: &NewTaskRecord) -> Result<TaskRecord, BackendError>;

    /// Replace a task (PUT)
    async fn update_task(&self, id: &TaskId, task: &TaskRecord)
    -> Result<TaskRecord, BackendError>;

    /// Partially update a task (PATCH)
    async fn patch_task(&self, id: &TaskId, patch: &TaskPatch)
    -> Result<TaskRecord, BackendError>;

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError>;

    async fn get_student_by_id(&self, id: &StudentId) -> Result<StudentRecord, BackendError>;

    async fn get_student_by_email(&self, email: &str) -> Result<StudentRecord, BackendError>;

    async fn get_current_student(&self) -> Result<StudentRecord, BackendError>;

    async fn invite_student(&self, invite: &InviteRequest) -> Result<(), BackendError>;

    /// Join `project_id` as `student` after being invited
    async fn accept_invite(&self, student: &StudentId, project_id: &str)
    -> Result<(), BackendError>;

    async fn remove_member(&self, request: &MemberRequest) -> Result<(), BackendError>;
}
