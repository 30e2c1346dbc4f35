//! Client for the task backend's JSON endpoints.

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::markup::sanitize_line;
use crate::task::{
    normalize_projects, normalize_records, records_from_values, Project, ProjectRecord, Task,
    TaskRecord,
};
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

pub const TASKS_PATH: &str = "/api/tasks/";
pub const PROJECTS_PATH: &str = "/api/projects/";
pub const MESSAGE_PATH: &str = "/api/message/";
pub const FORCE_REFRESH_PATH: &str = "/api/tasks/update/?force=true";
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub fn task_path(id: i64) -> String {
    format!("/api/task/{id}/")
}

pub fn integrate_path(id: i64) -> String {
    format!("/planfix/task/{id}/integrate/")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    tasks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ProjectListResponse {
    #[serde(default)]
    projects: Vec<ProjectRecord>,
}

#[derive(Debug, Deserialize)]
struct IntegrateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    conversation_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Everything the client needs from the backend. The interactive app and the CLI
/// both go through this trait so tests can swap in an in-memory fake.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> ApiResult<Vec<Task>>;
    async fn get_task(&self, id: i64) -> ApiResult<Task>;
    async fn list_projects(&self) -> ApiResult<Vec<Project>>;
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatReply>;
    /// Links a task to a new conversation and returns the conversation id.
    async fn integrate_task(&self, id: i64) -> ApiResult<String>;
    async fn force_refresh(&self) -> ApiResult<Value>;
}

#[derive(Clone)]
pub struct HttpTaskApi {
    base_url: String,
    csrf_token: Option<String>,
    client: Client,
}

impl HttpTaskApi {
    pub fn new(config: &AppConfig) -> ApiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(cookie) = &config.cookie {
            let value = header::HeaderValue::from_str(cookie).map_err(|error| {
                ApiError::Configuration(format!("cookie is not a valid header value: {error}"))
            })?;
            headers.insert(header::COOKIE, value);
        }

        // No request timeout: slow backends are shown as loading, never aborted.
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ApiError::Configuration(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self {
            base_url: config.base_url.clone(),
            csrf_token: config.effective_csrf_token(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    fn request(&self, method: Method, path: &str, with_csrf: bool) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, self.endpoint(path));
        if with_csrf {
            if let Some(token) = &self.csrf_token {
                request = request.header(CSRF_HEADER, token);
            }
        }
        request
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> ApiResult<T> {
        let response = request.send().await.map_err(|source| {
            error!(path, error = %source, "request failed");
            ApiError::Request {
                path: path.to_owned(),
                source,
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Request {
            path: path.to_owned(),
            source,
        })?;

        if !status.is_success() {
            error!(path, status = status.as_u16(), "request rejected");
            return Err(ApiError::Status {
                path: path.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            path: path.to_owned(),
            source,
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> ApiResult<Vec<Task>> {
        let response: TaskListResponse = self
            .request_json(TASKS_PATH, self.request(Method::GET, TASKS_PATH, false))
            .await?;
        let received = response.tasks.len();
        let tasks = normalize_records(records_from_values(response.tasks));
        info!(received, kept = tasks.len(), "fetched task list");
        Ok(tasks)
    }

    async fn get_task(&self, id: i64) -> ApiResult<Task> {
        let path = task_path(id);
        let mut record: TaskRecord = self
            .request_json(&path, self.request(Method::GET, &path, false))
            .await?;
        record.id = record.id.or(Some(id));
        debug!(id, "fetched task detail");
        Task::from_record(record)
            .ok_or_else(|| ApiError::Rejected(format!("Task {id} has no usable id")))
    }

    async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        let response: ProjectListResponse = self
            .request_json(PROJECTS_PATH, self.request(Method::GET, PROJECTS_PATH, false))
            .await?;
        let projects = normalize_projects(response.projects);
        info!(count = projects.len(), "fetched project list");
        Ok(projects)
    }

    async fn send_message(&self, chat: &ChatRequest) -> ApiResult<ChatReply> {
        let request = self.request(Method::POST, MESSAGE_PATH, true).json(chat);
        self.request_json(MESSAGE_PATH, request).await
    }

    async fn integrate_task(&self, id: i64) -> ApiResult<String> {
        let path = integrate_path(id);
        let response: IntegrateResponse = self
            .request_json(&path, self.request(Method::POST, &path, true))
            .await?;
        match (response.success, response.conversation_id) {
            (true, Some(conversation_id)) => {
                info!(id, conversation_id = %conversation_id, "task integrated");
                Ok(conversation_id)
            }
            (true, None) => Err(ApiError::Rejected(
                "Server did not return a conversation id".to_owned(),
            )),
            (false, _) => Err(ApiError::Rejected(
                response
                    .error
                    .map(|message| sanitize_line(&message))
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| "Integration failed".to_owned()),
            )),
        }
    }

    async fn force_refresh(&self) -> ApiResult<Value> {
        self.request_json(
            FORCE_REFRESH_PATH,
            self.request(Method::GET, FORCE_REFRESH_PATH, true),
        )
        .await
    }
}

/// Accepts ids sent either as JSON numbers or strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) if !raw.trim().is_empty() => Some(raw.trim().to_owned()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
