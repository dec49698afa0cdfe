//! Backend implementation over the project service's JSON HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::io::backend::{Backend, BackendError};
use crate::model::config::BackendConfig;
use crate::model::record::{
    InviteRequest, MemberRequest, NewTaskRecord, ProjectRecord, StudentRecord, TaskPatch,
    TaskRecord,
};
use crate::model::task::{StudentId, TaskId};

/// PATCH body: the id travels next to the changed fields
#[derive(Serialize)]
struct PatchBody<'a> {
    id: &'a TaskId,
    #[serde(flatten)]
    patch: &'a TaskPatch,
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    session_cookie: Option<String>,
    bearer_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.base_url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("studyboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpBackend {
            client,
            base_url,
            session_cookie: config.session_cookie.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the body text, or `None` for 204 / empty bodies.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<String>, BackendError> {
        debug!("HTTP {} {}", method, url);
        let mut request = self.client.request(method, url.clone());
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie);
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                text
            };
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    async fn fetch<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let endpoint = url.path().to_string();
        let text = self
            .send(method, url, body)
            .await?
            .ok_or_else(|| BackendError::EmptyBody(endpoint.clone()))?;
        serde_json::from_str(&text).map_err(|source| BackendError::Decode { endpoint, source })
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(), BackendError> {
        self.send(method, url, body).await?;
        Ok(())
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl Backend for HttpBackend {
    async fn get_project(&self, project_id: &str) -> Result<ProjectRecord, BackendError> {
        let url = self.endpoint(&["api", "projects", project_id])?;
        self.fetch(Method::GET, url, NO_BODY).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, BackendError> {
        let url = self.endpoint(&["api", "projects", "all"])?;
        self.fetch(Method::GET, url, NO_BODY).await
    }

    async fn get_project_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>, BackendError> {
        let url = self.endpoint(&["api", "project-tasks", project_id])?;
        self.fetch(Method::GET, url, NO_BODY).await
    }

    async fn create_task(&self, task: &NewTaskRecord) -> Result<TaskRecord, BackendError> {
        let url = self.endpoint(&["api", "projects", "task"])?;
        self.fetch(Method::POST, url, Some(task)).await
    }

    async fn update_task(
        &self,
        id: &TaskId,
        task: &TaskRecord,
    ) -> Result<TaskRecord, BackendError> {
        let url = self.endpoint(&["api", "project-tasks", id.as_str()])?;
        self.fetch(Method::PUT, url, Some(task)).await
    }

    async fn patch_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<TaskRecord, BackendError> {
        let url = self.endpoint(&["api", "project-tasks"])?;
        let body = PatchBody { id, patch };
        self.fetch(Method::PATCH, url, Some(&body)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "project-tasks", id.as_str()])?;
        self.execute(Method::DELETE, url, NO_BODY).await
    }

    async fn get_student_by_id(&self, id: &StudentId) -> Result<StudentRecord, BackendError> {
        let url = self.endpoint(&["api", "students", "get", id.as_str()])?;
        self.fetch(Method::GET, url, NO_BODY).await
    }

    async fn get_student_by_email(&self, email: &str) -> Result<StudentRecord, BackendError> {
        let url = self.endpoint(&["api", "students", "get", "email", email])?;
        self.fetch(Method::GET, url, NO_BODY).await
    }

    async fn get_current_student(&self) -> Result<StudentRecord, BackendError> {
        let url = self.endpoint(&["api", "students", "me"])?;
        self.fetch(Method::GET, url, NO_BODY).await
    }

    async fn invite_student(&self, invite: &InviteRequest) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "students", "invite"])?;
        self.execute(Method::POST, url, Some(invite)).await
    }

    async fn accept_invite(
        &self,
        student: &StudentId,
        project_id: &str,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&[
            "api",
            "students",
            "accept-invite",
            student.as_str(),
            project_id,
        ])?;
        self.execute(Method::GET, url, NO_BODY).await
    }

    async fn remove_member(&self, request: &MemberRequest) -> Result<(), BackendError> {
        let url = self.endpoint(&["api", "projects", "members"])?;
        self.execute(Method::DELETE, url, Some(request)).await
    }
}
