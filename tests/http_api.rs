use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tasklink::api::{ChatRequest, HttpTaskApi, TaskApi};
use tasklink::config::AppConfig;
use tasklink::error::ApiError;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct MockState {
    csrf_tokens: Arc<Mutex<Vec<(String, Option<String>)>>>,
    cookies: Arc<Mutex<Vec<Option<String>>>>,
    chat_bodies: Arc<Mutex<Vec<Value>>>,
}

impl MockState {
    fn record(&self, route: &str, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        self.csrf_tokens
            .lock()
            .expect("csrf lock")
            .push((route.to_owned(), header("x-csrftoken")));
        self.cookies.lock().expect("cookie lock").push(header("cookie"));
    }

    fn csrf_for(&self, route: &str) -> Option<String> {
        self.csrf_tokens
            .lock()
            .expect("csrf lock")
            .iter()
            .find(|(seen, _)| seen == route)
            .and_then(|(_, token)| token.clone())
    }
}

async fn list_tasks(State(state): State<MockState>, headers: HeaderMap) -> Json<Value> {
    state.record("tasks", &headers);
    Json(json!({
        "tasks": [
            { "id": 1, "name": "Set up CI", "status": { "id": 2, "name": "В работе" },
              "project": { "id": 4, "name": "Platform" },
              "startDateTime": { "datetime": "2024-05-01T09:00:00Z" } },
            { "name": "record without id" },
            { "id": "2", "name": "Write <b>notes</b>", "status": { "id": 3, "name": "Завершена" } },
            { "id": 3, "name": 12345, "status": "Новая", "project": 9 },
            "not a record",
        ]
    }))
}

async fn task_detail(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.record("detail", &headers);
    if id == 500 {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "name": "Detail",
            "assignees": { "users": [{ "name": "Nina" }] },
            "description": "<p>First &amp; second</p>"
        })),
    )
}

async fn list_projects() -> Json<Value> {
    Json(json!({
        "projects": [
            { "id": 2, "name": "zeta" },
            { "id": 1, "name": "Alpha" },
            { "id": 3 }
        ]
    }))
}

async fn send_message(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record("message", &headers);
    state.chat_bodies.lock().expect("chat lock").push(body.clone());
    Json(json!({
        "message": format!("You said: {}", body["message"].as_str().unwrap_or_default()),
        "conversation_id": 88
    }))
}

async fn integrate(
    State(state): State<MockState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Json<Value> {
    state.record("integrate", &headers);
    if id == 9 {
        return Json(json!({ "success": false, "error": "Task is already\u{7} linked" }));
    }
    Json(json!({ "success": true, "conversation_id": 101 }))
}

async fn force_refresh(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.record("refresh", &headers);
    if query.get("force").map(String::as_str) != Some("true") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "force missing" })));
    }
    (StatusCode::OK, Json(json!({ "status": "updated" })))
}

async fn spawn_mock_server() -> (String, MockState, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/tasks/", get(list_tasks))
        .route("/api/task/{id}/", get(task_detail))
        .route("/api/projects/", get(list_projects))
        .route("/api/message/", post(send_message))
        .route("/planfix/task/{id}/integrate/", post(integrate))
        .route("/api/tasks/update/", get(force_refresh))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run mock server");
    });
    (format!("http://{address}"), state, shutdown_tx, handle)
}

fn client(base_url: String) -> HttpTaskApi {
    HttpTaskApi::new(&AppConfig {
        base_url,
        cookie: Some("sessionid=s1; csrftoken=cookie-token".to_owned()),
        ..AppConfig::default()
    })
    .expect("client")
}

#[tokio::test]
async fn lists_tasks_and_tolerates_odd_records() {
    let (base_url, state, shutdown, handle) = spawn_mock_server().await;
    let api = client(base_url);

    let tasks = api.list_tasks().await.expect("tasks");
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].start.display(), "01.05.2024");
    assert_eq!(tasks[1].id, 2);
    assert!(tasks[1].is_completed());
    assert_eq!(tasks[1].title(), "Write <b>notes</b>");
    assert_eq!(tasks[2].title(), "12345");
    assert_eq!(tasks[2].status_name(), Some("Новая"));
    assert!(tasks[2].project.is_none());

    assert_eq!(state.csrf_for("tasks"), None);
    assert_eq!(
        state.cookies.lock().expect("cookie lock")[0].as_deref(),
        Some("sessionid=s1; csrftoken=cookie-token")
    );

    let _ = shutdown.send(());
    handle.await.expect("server task");
}

#[tokio::test]
async fn detail_failure_surfaces_status_then_succeeds() {
    let (base_url, _state, shutdown, handle) = spawn_mock_server().await;
    let api = client(base_url);

    let error = api.get_task(500).await.expect_err("server error");
    assert!(matches!(error, ApiError::Status { status: 500, .. }));

    let task = api.get_task(7).await.expect("detail");
    assert_eq!(task.id, 7);
    assert_eq!(task.assignees, vec!["Nina"]);
    assert_eq!(task.description.as_deref(), Some("First & second"));

    let _ = shutdown.send(());
    handle.await.expect("server task");
}

#[tokio::test]
async fn projects_are_sorted_and_incomplete_ones_dropped() {
    let (base_url, _state, shutdown, handle) = spawn_mock_server().await;
    let api = client(base_url);

    let projects = api.list_projects().await.expect("projects");
    let names: Vec<&str> = projects.iter().map(|project| project.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "zeta"]);

    let _ = shutdown.send(());
    handle.await.expect("server task");
}

#[tokio::test]
async fn integration_sends_csrf_and_reports_rejections() {
    let (base_url, state, shutdown, handle) = spawn_mock_server().await;
    let api = client(base_url);

    let conversation = api.integrate_task(5).await.expect("integrated");
    assert_eq!(conversation, "101");
    assert_eq!(state.csrf_for("integrate").as_deref(), Some("cookie-token"));

    let error = api.integrate_task(9).await.expect_err("rejected");
    assert_eq!(error.user_message(), "Task is already linked");

    let _ = shutdown.send(());
    handle.await.expect("server task");
}

#[tokio::test]
async fn chat_posts_message_and_conversation() {
    let (base_url, state, shutdown, handle) = spawn_mock_server().await;
    let api = client(base_url);

    let reply = api
        .send_message(&ChatRequest {
            message: "hello".to_owned(),
            conversation_id: Some("12".to_owned()),
        })
        .await
        .expect("reply");
    assert_eq!(reply.message, "You said: hello");
    assert_eq!(reply.conversation_id.as_deref(), Some("88"));

    let bodies = state.chat_bodies.lock().expect("chat lock").clone();
    assert_eq!(bodies, vec![json!({ "message": "hello", "conversation_id": "12" })]);
    assert_eq!(state.csrf_for("message").as_deref(), Some("cookie-token"));

    let _ = shutdown.send(());
    handle.await.expect("server task");
}

#[tokio::test]
async fn force_refresh_uses_query_and_csrf() {
    let (base_url, state, shutdown, handle) = spawn_mock_server().await;
    let api = HttpTaskApi::new(&AppConfig {
        base_url,
        csrf_token: Some("explicit-token".to_owned()),
        ..AppConfig::default()
    })
    .expect("client");

    let response = api.force_refresh().await.expect("refresh");
    assert_eq!(response["status"], "updated");
    assert_eq!(state.csrf_for("refresh").as_deref(), Some("explicit-token"));

    let _ = shutdown.send(());
    handle.await.expect("server task");
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("addr");
    drop(listener);

    let api = client(format!("http://{address}"));
    let error = api.list_tasks().await.expect_err("unreachable");
    assert!(matches!(error, ApiError::Request { .. }));
}
