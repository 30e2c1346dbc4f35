//! Interactive client state and input handling.
//!
//! Network calls run as spawned tasks that report back through an unbounded channel;
//! the draw loop drains that channel and feeds each [`AppEvent`] to [`App::apply`].
//! Nothing here touches the terminal, so the whole flow is testable with a fake API.

use crate::api::{ChatReply, TaskApi};
use crate::chat::ChatSession;
use crate::columns::{Column, ColumnVisibility};
use crate::config::AppConfig;
use crate::error::ApiResult;
use crate::modal::DetailModal;
use crate::notification::Notifier;
use crate::preferences::PreferenceStore;
use crate::task::{Project, Task};
use crate::task_list::{Filters, TaskList};
use crate::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Results of background requests.
#[derive(Debug)]
pub enum AppEvent {
    TasksLoaded {
        request: u64,
        result: ApiResult<Vec<Task>>,
    },
    ProjectsLoaded(ApiResult<Vec<Project>>),
    DetailLoaded {
        request: u64,
        result: ApiResult<Task>,
    },
    Integrated {
        task_id: i64,
        result: ApiResult<String>,
    },
    ChatReplied(ApiResult<ChatReply>),
    CacheRefreshed(ApiResult<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Tasks,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    /// Column visibility panel with the cursor on one column.
    Columns(usize),
}

pub struct App {
    api: Arc<dyn TaskApi>,
    events: UnboundedSender<AppEvent>,
    preferences: PreferenceStore,
    pub tasks: TaskList,
    pub modal: DetailModal,
    pub chat: ChatSession,
    pub notifier: Notifier,
    pub columns: ColumnVisibility,
    pub theme: Theme,
    pub view: View,
    pub mode: InputMode,
    /// Text typed into the search box; applied to the list after the debounce delay.
    pub search_input: String,
    search_deadline: Option<Instant>,
    debounce: Duration,
    detail_requests: u64,
    integrating: HashSet<i64>,
    should_quit: bool,
}

impl App {
    pub fn new(
        api: Arc<dyn TaskApi>,
        preferences: PreferenceStore,
        config: &AppConfig,
    ) -> (Self, UnboundedReceiver<AppEvent>) {
        let (events, receiver) = unbounded_channel();
        let columns = preferences.column_visibility();
        let theme = Theme::resolve(preferences.theme());
        let app = Self {
            api,
            events,
            preferences,
            tasks: TaskList::new(config.page_size),
            modal: DetailModal::Closed,
            chat: ChatSession::default(),
            notifier: Notifier::new(config.notification_ttl()),
            columns,
            theme,
            view: View::Tasks,
            mode: InputMode::Normal,
            search_input: String::new(),
            search_deadline: None,
            debounce: config.search_debounce(),
            detail_requests: 0,
            integrating: HashSet::new(),
            should_quit: false,
        };
        (app, receiver)
    }

    /// Applies filters given on the command line before the first load.
    pub fn seed_filters(&mut self, filters: Filters) {
        self.search_input = filters.search.clone();
        self.tasks.set_status_filter(filters.status);
        self.tasks.set_project_filter(filters.project);
        self.tasks.set_assigner_filter(filters.assigner);
        self.tasks.set_search(&filters.search);
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_integrating(&self, task_id: i64) -> bool {
        self.integrating.contains(&task_id)
    }

    fn spawn<F>(&self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            if events.send(request.await).is_err() {
                debug!("event receiver closed; dropping response");
            }
        });
    }

    pub fn start(&mut self) {
        self.reload();
        self.load_projects();
    }

    pub fn reload(&mut self) {
        let request = self.tasks.begin_fetch();
        let api = Arc::clone(&self.api);
        debug!(request, "reloading task list");
        self.spawn(async move {
            AppEvent::TasksLoaded {
                request,
                result: api.list_tasks().await,
            }
        });
    }

    fn load_projects(&self) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { AppEvent::ProjectsLoaded(api.list_projects().await) });
    }

    pub fn open_detail(&mut self, task_id: i64) {
        self.detail_requests += 1;
        let request = self.detail_requests;
        self.modal.open(task_id, request);
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            AppEvent::DetailLoaded {
                request,
                result: api.get_task(task_id).await,
            }
        });
    }

    /// Starts linking a task to a new conversation. Completed tasks are refused
    /// locally and never reach the server.
    pub fn integrate(&mut self, task_id: i64) {
        if self.integrating.contains(&task_id) {
            return;
        }
        if self.task_is_completed(task_id) {
            self.notifier.error(
                "Cannot integrate",
                format!("Task #{task_id} is completed and cannot be linked to a conversation."),
            );
            return;
        }
        self.integrating.insert(task_id);
        if self.modal.task_id() == Some(task_id) {
            self.modal.set_integrating(true);
        }
        info!(task_id, "integrating task");
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            AppEvent::Integrated {
                task_id,
                result: api.integrate_task(task_id).await,
            }
        });
    }

    fn task_is_completed(&self, task_id: i64) -> bool {
        if let DetailModal::Populated { detail, .. } = &self.modal {
            if detail.id == task_id {
                return detail.completed;
            }
        }
        self.tasks.task(task_id).is_some_and(Task::is_completed)
    }

    pub fn force_refresh(&mut self) {
        self.notifier.info("Refreshing", "Updating task data from the server...");
        let api = Arc::clone(&self.api);
        self.spawn(async move { AppEvent::CacheRefreshed(api.force_refresh().await) });
    }

    pub fn send_chat(&mut self) {
        let Some(request) = self.chat.submit() else {
            return;
        };
        let api = Arc::clone(&self.api);
        self.spawn(async move { AppEvent::ChatReplied(api.send_message(&request).await) });
    }

    pub fn reset_filters(&mut self) {
        self.search_input.clear();
        self.search_deadline = None;
        self.tasks.reset_filters();
        self.reload();
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Err(error) = self.preferences.save_theme(self.theme) {
            warn!(error = %error, "failed to persist theme");
        }
    }

    pub fn toggle_column(&mut self, column: Column) {
        self.columns.toggle(column);
        if let Err(error) = self.preferences.save_column_visibility(&self.columns) {
            warn!(error = %error, "failed to persist column settings");
        }
    }

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::TasksLoaded { request, result } => {
                self.tasks.finish_fetch(request, result);
            }
            AppEvent::ProjectsLoaded(Ok(projects)) => self.tasks.set_projects(projects),
            AppEvent::ProjectsLoaded(Err(error)) => {
                self.notifier.error("Could not load projects", error.user_message());
            }
            AppEvent::DetailLoaded { request, result } => {
                if self.modal.finish(request, result) {
                    let running = self
                        .modal
                        .task_id()
                        .is_some_and(|task_id| self.integrating.contains(&task_id));
                    self.modal.set_integrating(running);
                }
            }
            AppEvent::Integrated { task_id, result } => {
                self.integrating.remove(&task_id);
                match result {
                    Ok(conversation_id) => {
                        self.modal.close();
                        self.chat.open_conversation(
                            conversation_id.clone(),
                            format!("Task #{task_id} linked to conversation {conversation_id}."),
                        );
                        self.view = View::Chat;
                        self.mode = InputMode::Normal;
                        self.notifier
                            .success("Task linked", format!("Conversation {conversation_id} is ready."));
                    }
                    Err(error) => {
                        if self.modal.task_id() == Some(task_id) {
                            self.modal.set_integrating(false);
                        }
                        self.notifier.error("Integration failed", error.user_message());
                    }
                }
            }
            AppEvent::ChatReplied(result) => self.chat.receive(result),
            AppEvent::CacheRefreshed(Ok(_)) => {
                self.notifier.success("Refreshed", "Task data is up to date.");
                self.reload();
            }
            AppEvent::CacheRefreshed(Err(error)) => {
                self.notifier.error("Refresh failed", error.user_message());
            }
        }
    }

    /// Timer work: debounced search and notification expiry.
    pub fn tick(&mut self, now: Instant) {
        if self.search_deadline.is_some_and(|deadline| now >= deadline) {
            self.search_deadline = None;
            self.tasks.set_search(&self.search_input);
        }
        self.notifier.expire(now);
    }

    fn search_edited(&mut self) {
        self.search_deadline = Some(Instant::now() + self.debounce);
    }

    fn commit_search(&mut self) {
        self.search_deadline = None;
        self.tasks.set_search(&self.search_input);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.modal.is_open() {
            self.handle_modal_key(key);
            return;
        }
        match (self.view, self.mode) {
            (View::Chat, _) => self.handle_chat_key(key),
            (View::Tasks, InputMode::Search) => self.handle_search_key(key),
            (View::Tasks, InputMode::Columns(cursor)) => self.handle_columns_key(key, cursor),
            (View::Tasks, InputMode::Normal) => self.handle_table_key(key),
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.modal.close(),
            KeyCode::Char('i') => {
                if let DetailModal::Populated { detail, .. } = &self.modal {
                    let task_id = detail.id;
                    self.integrate(task_id);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.modal.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.modal.scroll_by(-1),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.commit_search();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.search_input.pop();
                self.search_edited();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_input.clear();
                self.search_edited();
            }
            KeyCode::Char(ch) => {
                self.search_input.push(ch);
                self.search_edited();
            }
            _ => {}
        }
    }

    fn handle_columns_key(&mut self, key: KeyEvent, cursor: usize) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('q') => self.mode = InputMode::Normal,
            KeyCode::Down | KeyCode::Char('j') => {
                self.mode = InputMode::Columns((cursor + 1).min(Column::ALL.len() - 1));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.mode = InputMode::Columns(cursor.saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(column) = Column::ALL.get(cursor) {
                    self.toggle_column(*column);
                }
            }
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.chat.start_new();
            }
            KeyCode::Esc | KeyCode::Tab => self.view = View::Tasks,
            KeyCode::Enter => self.send_chat(),
            KeyCode::Backspace => {
                self.chat.input.pop();
            }
            KeyCode::Char(ch) => self.chat.input.push(ch),
            _ => {}
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                self.notifier.dismiss();
            }
            KeyCode::Down | KeyCode::Char('j') => self.tasks.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.tasks.select_previous(),
            KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => {
                self.tasks.next_page();
            }
            KeyCode::Left | KeyCode::PageUp | KeyCode::Char('b') => {
                self.tasks.previous_page();
            }
            KeyCode::Enter | KeyCode::Char('v') => {
                if let Some(task_id) = self.tasks.selected_task().map(|task| task.id) {
                    self.open_detail(task_id);
                }
            }
            KeyCode::Char('i') => {
                if let Some(task_id) = self.tasks.selected_task().map(|task| task.id) {
                    self.integrate(task_id);
                }
            }
            KeyCode::Char('/') => self.mode = InputMode::Search,
            KeyCode::Char('s') => self.tasks.cycle_status_filter(),
            KeyCode::Char('p') => self.tasks.cycle_project_filter(),
            KeyCode::Char('a') => self.tasks.cycle_assigner_filter(),
            KeyCode::Char('z') => {
                self.tasks.cycle_page_size();
            }
            KeyCode::Char(digit @ '1'..='6') => {
                let index = digit as usize - '1' as usize;
                self.tasks.sort_by(Column::ALL[index]);
            }
            KeyCode::Char('c') => self.mode = InputMode::Columns(0),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('R') => self.force_refresh(),
            KeyCode::Char('x') => self.reset_filters(),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Tab => self.view = View::Chat,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatRequest;
    use crate::error::ApiError;
    use crate::notification::NotificationKind;
    use crate::task::{normalize_records, TaskRecord};
    use crate::task_list::{LoadState, StatusFilter};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        list_calls: AtomicUsize,
        detail_failures: AtomicUsize,
        integrate_calls: AtomicUsize,
        sent: Mutex<Vec<ChatRequest>>,
    }

    fn sample_tasks() -> Vec<Task> {
        let records: Vec<TaskRecord> = serde_json::from_value(json!([
            { "id": 1, "name": "Fix login", "status": { "id": 1, "name": "Новая" },
              "project": { "id": 10, "name": "Portal" }, "assigner": { "name": "Olga" } },
            { "id": 2, "name": "Release", "status": { "id": 3, "name": "Завершена" },
              "project": { "id": 11, "name": "Mobile" }, "assigner": { "name": "Ivan" } },
        ]))
        .expect("records");
        normalize_records(records)
    }

    #[async_trait]
    impl TaskApi for FakeApi {
        async fn list_tasks(&self) -> ApiResult<Vec<Task>> {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            let mut tasks = sample_tasks();
            if call == 0 {
                tasks.truncate(1);
            }
            Ok(tasks)
        }

        async fn get_task(&self, id: i64) -> ApiResult<Task> {
            if self.detail_failures.load(Ordering::SeqCst) > 0 {
                self.detail_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ApiError::Status {
                    path: format!("/api/task/{id}/"),
                    status: 500,
                    body: String::new(),
                });
            }
            sample_tasks()
                .into_iter()
                .find(|task| task.id == id)
                .ok_or_else(|| ApiError::Rejected("missing".into()))
        }

        async fn list_projects(&self) -> ApiResult<Vec<Project>> {
            Ok(vec![Project { id: "10".into(), name: "Portal".into() }])
        }

        async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
            self.sent.lock().expect("sent lock").push(request.clone());
            Ok(ChatReply {
                message: format!("echo: {}", request.message),
                conversation_id: Some("55".into()),
            })
        }

        async fn integrate_task(&self, _id: i64) -> ApiResult<String> {
            self.integrate_calls.fetch_add(1, Ordering::SeqCst);
            Ok("77".into())
        }

        async fn force_refresh(&self) -> ApiResult<Value> {
            Ok(json!({ "status": "ok" }))
        }
    }

    fn app_with(api: Arc<FakeApi>) -> (App, UnboundedReceiver<AppEvent>) {
        let config = AppConfig {
            search_debounce_ms: 300,
            ..AppConfig::default()
        };
        App::new(api, PreferenceStore::in_memory(), &config)
    }

    async fn pump(app: &mut App, events: &mut UnboundedReceiver<AppEvent>, count: usize) {
        for _ in 0..count {
            let event = events.recv().await.expect("event");
            app.apply(event);
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    async fn loaded_app(api: Arc<FakeApi>) -> (App, UnboundedReceiver<AppEvent>) {
        // The first list call returns a single task; reload once to get both.
        api.list_calls.store(1, Ordering::SeqCst);
        let (mut app, mut events) = app_with(api);
        app.start();
        pump(&mut app, &mut events, 2).await;
        assert_eq!(app.tasks.total_count(), 2);
        (app, events)
    }

    #[tokio::test]
    async fn completed_and_active_filters() {
        let (mut app, _events) = loaded_app(Arc::new(FakeApi::default())).await;
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.tasks.filters().status, StatusFilter::Active);
        let ids: Vec<i64> = app.tasks.visible_tasks().iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![1]);
        press(&mut app, KeyCode::Char('s'));
        let ids: Vec<i64> = app.tasks.visible_tasks().iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn search_is_debounced_then_matches_project_name() {
        let (mut app, _events) = loaded_app(Arc::new(FakeApi::default())).await;
        press(&mut app, KeyCode::Char('/'));
        for ch in "mobile".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        app.tick(Instant::now());
        assert_eq!(app.tasks.shown_count(), 2);
        app.tick(Instant::now() + Duration::from_millis(400));
        let ids: Vec<i64> = app.tasks.visible_tasks().iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![2]);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn integrating_a_completed_task_never_calls_the_server() {
        let api = Arc::new(FakeApi::default());
        let (mut app, mut events) = loaded_app(Arc::clone(&api)).await;
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.tasks.selected_task().map(|task| task.id), Some(2));
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(api.integrate_calls.load(Ordering::SeqCst), 0);
        assert!(events.try_recv().is_err());
        let notification = app.notifier.current().expect("notification");
        assert_eq!(notification.kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn integrating_an_open_task_switches_to_chat() {
        let api = Arc::new(FakeApi::default());
        let (mut app, mut events) = loaded_app(Arc::clone(&api)).await;
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut events, 1).await;
        assert!(app.modal.can_integrate());
        press(&mut app, KeyCode::Char('i'));
        assert!(app.is_integrating(1));
        assert!(!app.modal.can_integrate());
        pump(&mut app, &mut events, 1).await;
        assert_eq!(api.integrate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.view, View::Chat);
        assert!(!app.modal.is_open());
        assert_eq!(app.chat.conversation_id(), Some("77"));
    }

    #[tokio::test]
    async fn detail_opened_during_integration_shows_it_running() {
        let api = Arc::new(FakeApi::default());
        let (mut app, mut events) = loaded_app(Arc::clone(&api)).await;
        press(&mut app, KeyCode::Char('i'));
        assert!(app.is_integrating(1));
        press(&mut app, KeyCode::Enter);

        let mut pending = vec![
            events.recv().await.expect("event"),
            events.recv().await.expect("event"),
        ];
        let detail_at = pending
            .iter()
            .position(|event| matches!(event, AppEvent::DetailLoaded { .. }))
            .expect("detail event");
        let detail = pending.remove(detail_at);
        app.apply(detail);
        assert!(matches!(app.modal, DetailModal::Populated { integrating: true, .. }));
        assert!(!app.modal.can_integrate());

        let integrated = pending.pop().expect("integration event");
        app.apply(integrated);
        assert_eq!(app.view, View::Chat);
        assert!(!app.is_integrating(1));
    }

    #[tokio::test]
    async fn failed_detail_errors_then_reopen_succeeds() {
        let api = Arc::new(FakeApi::default());
        api.detail_failures.store(1, Ordering::SeqCst);
        let (mut app, mut events) = loaded_app(Arc::clone(&api)).await;

        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.modal, DetailModal::Loading { task_id: 1, .. }));
        pump(&mut app, &mut events, 1).await;
        assert!(matches!(app.modal, DetailModal::Errored { task_id: 1, .. }));

        press(&mut app, KeyCode::Esc);
        assert!(!app.modal.is_open());
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut events, 1).await;
        assert!(matches!(app.modal, DetailModal::Populated { .. }));
    }

    #[tokio::test]
    async fn stale_list_response_is_dropped() {
        let (mut app, mut events) = app_with(Arc::new(FakeApi::default()));
        app.reload();
        app.reload();
        let mut responses = vec![
            events.recv().await.expect("event"),
            events.recv().await.expect("event"),
        ];
        responses.sort_by_key(|event| match event {
            AppEvent::TasksLoaded { request, .. } => *request,
            _ => 0,
        });
        let newer = responses.pop().expect("newer");
        let older = responses.pop().expect("older");

        app.apply(newer);
        let count = app.tasks.total_count();
        assert!(count > 0);
        app.apply(older);
        app.apply(AppEvent::TasksLoaded { request: 1, result: Ok(Vec::new()) });
        assert_eq!(app.tasks.total_count(), count);
        assert_eq!(app.tasks.load_state(), &LoadState::Loaded);
    }

    #[tokio::test]
    async fn chat_round_trip_adopts_conversation() {
        let api = Arc::new(FakeApi::default());
        let (mut app, mut events) = app_with(Arc::clone(&api));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view, View::Chat);
        for ch in "hi".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press(&mut app, KeyCode::Enter);
        assert!(app.chat.is_waiting());
        pump(&mut app, &mut events, 1).await;
        assert_eq!(app.chat.conversation_id(), Some("55"));
        assert_eq!(app.chat.messages().len(), 2);
        assert_eq!(api.sent.lock().expect("sent lock")[0].message, "hi");
    }

    #[tokio::test]
    async fn ctrl_n_starts_a_new_conversation() {
        let api = Arc::new(FakeApi::default());
        let (mut app, mut events) = app_with(Arc::clone(&api));
        press(&mut app, KeyCode::Tab);
        for ch in "hi".chars() {
            press(&mut app, KeyCode::Char(ch));
        }
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut events, 1).await;
        assert_eq!(app.chat.conversation_id(), Some("55"));

        app.handle_key(KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(app.chat.conversation_id(), None);
        assert!(app.chat.messages().is_empty());
        assert!(app.chat.input.is_empty());

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Enter);
        pump(&mut app, &mut events, 1).await;
        let sent = api.sent.lock().expect("sent lock");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].conversation_id, None);
    }

    #[tokio::test]
    async fn force_refresh_notifies_and_reloads() {
        let (mut app, mut events) = loaded_app(Arc::new(FakeApi::default())).await;
        press(&mut app, KeyCode::Char('R'));
        assert_eq!(app.notifier.current().map(|n| n.kind), Some(NotificationKind::Info));
        pump(&mut app, &mut events, 1).await;
        assert_eq!(app.notifier.current().map(|n| n.kind), Some(NotificationKind::Success));
        assert!(app.tasks.is_loading());
        pump(&mut app, &mut events, 1).await;
        assert_eq!(app.tasks.load_state(), &LoadState::Loaded);
    }

    #[tokio::test]
    async fn column_and_theme_toggles_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("preferences.json");
        let (mut app, _events) = App::new(
            Arc::new(FakeApi::default()),
            PreferenceStore::open(&path),
            &AppConfig::default(),
        );
        let initial_theme = app.theme;
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('t'));
        assert!(!app.columns.is_visible(Column::Name));

        let stored = PreferenceStore::open(&path);
        assert!(!stored.column_visibility().is_visible(Column::Name));
        assert_eq!(stored.theme(), Some(initial_theme.toggled()));
    }
}
