//! The task table: filtering, sorting, paging and fetch bookkeeping.
//!
//! Filtering and sorting run over the in-memory collection; only an explicit reload
//! goes back to the server. Every reload is numbered and only the newest answer is
//! applied, so a slow early response can never overwrite a later one.

use crate::columns::Column;
use crate::error::ApiResult;
use crate::pagination::{PageItem, Pagination};
use crate::palette::{assigner_color, initial, project_color};
use crate::status::StatusClass;
use crate::task::{Project, Task};
use ratatui::style::Color;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.is_completed(),
            StatusFilter::Completed => task.is_completed(),
        }
    }

    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Active => "Active",
            StatusFilter::Completed => "Completed",
        }
    }
}

/// Active filters. `None` for project or assigner means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub status: StatusFilter,
    pub project: Option<String>,
    pub assigner: Option<String>,
    pub search: String,
}

impl Filters {
    pub fn is_default(&self) -> bool {
        *self == Filters::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Column,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: Column::Id,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortState {
    /// Header activation: the active column flips direction, any other sortable
    /// column becomes active ascending. Returns false for unsortable columns.
    pub fn activate(&mut self, column: Column) -> bool {
        if !column.is_sortable() {
            return false;
        }
        if self.column == column {
            self.direction = self.direction.flipped();
        } else {
            self.column = column;
            self.direction = SortDirection::Ascending;
        }
        true
    }
}

/// Lowercased text the search box is matched against.
pub fn search_haystack(task: &Task) -> String {
    [
        Some(task.id.to_string()),
        task.name.clone(),
        task.status_name().map(str::to_owned),
        task.project_name().map(str::to_owned),
        Some(task.date_range_text()).filter(|dates| !dates.is_empty()),
        task.assigner.clone(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

pub fn matches_filters(task: &Task, filters: &Filters) -> bool {
    if !filters.status.matches(task) {
        return false;
    }
    if let Some(project) = &filters.project {
        if task.project_id() != Some(project.as_str()) {
            return false;
        }
    }
    if let Some(assigner) = &filters.assigner {
        if task.assigner.as_deref() != Some(assigner.as_str()) {
            return false;
        }
    }
    let query = filters.search.trim().to_lowercase();
    query.is_empty() || search_haystack(task).contains(&query)
}

fn lower(text: Option<&str>) -> String {
    text.unwrap_or_default().to_lowercase()
}

/// Ascending order of two tasks by one column.
pub fn compare(a: &Task, b: &Task, column: Column) -> Ordering {
    match column {
        Column::Id | Column::Actions => a.id.cmp(&b.id),
        Column::Name => lower(a.name.as_deref()).cmp(&lower(b.name.as_deref())),
        Column::Status => lower(a.status_name()).cmp(&lower(b.status_name())),
        Column::Project => lower(a.project_name()).cmp(&lower(b.project_name())),
        Column::Dates => a.sort_date().cmp(&b.sort_date()),
        Column::Assignee => lower(a.assignees.first().map(String::as_str))
            .cmp(&lower(b.assignees.first().map(String::as_str))),
    }
}

/// Indices into `tasks` that pass `filters`, in `sort` order. Ties keep input order
/// in both directions.
pub fn visible_indices(tasks: &[Task], filters: &Filters, sort: SortState) -> Vec<usize> {
    let mut indices: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| matches_filters(task, filters))
        .map(|(index, _)| index)
        .collect();
    indices.sort_by(|left, right| {
        let ordering = compare(&tasks[*left], &tasks[*right], sort.column);
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    indices
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// One table row, ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub has_description: bool,
    pub status_label: String,
    pub status_class: StatusClass,
    pub project_label: String,
    pub project_color: Color,
    pub start: String,
    pub end: String,
    pub assigner: String,
    pub assigner_initial: String,
    pub assigner_color: Color,
    pub can_integrate: bool,
}

impl TaskRow {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title().to_owned(),
            has_description: task.description.is_some(),
            status_label: task.status_name().unwrap_or("Unknown").to_owned(),
            status_class: task.status_class(),
            project_label: task.project_name().unwrap_or("No project").to_owned(),
            project_color: project_color(task.project_id()),
            start: task.start.display(),
            end: task.end.display(),
            assigner: task.assigner.clone().unwrap_or_else(|| "Unassigned".to_owned()),
            assigner_initial: initial(task.assigner.as_deref()),
            assigner_color: assigner_color(task.assigner.as_deref()),
            can_integrate: !task.is_completed(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskList {
    tasks: Vec<Task>,
    visible: Vec<usize>,
    filters: Filters,
    sort: SortState,
    pagination: Pagination,
    /// Row within the current page.
    selected: usize,
    load_state: LoadState,
    latest_request: u64,
    projects: Vec<Project>,
}

impl TaskList {
    pub fn new(page_size: usize) -> Self {
        Self {
            tasks: Vec::new(),
            visible: Vec::new(),
            filters: Filters::default(),
            sort: SortState::default(),
            pagination: Pagination::new(page_size),
            selected: 0,
            load_state: LoadState::Idle,
            latest_request: 0,
            projects: Vec::new(),
        }
    }

    /// Marks a reload as in flight and returns its request number.
    pub fn begin_fetch(&mut self) -> u64 {
        self.latest_request += 1;
        self.load_state = LoadState::Loading;
        self.latest_request
    }

    /// Applies a reload result. Returns false, leaving state untouched, when a newer
    /// reload has started since `request` was issued.
    pub fn finish_fetch(&mut self, request: u64, result: ApiResult<Vec<Task>>) -> bool {
        if request != self.latest_request {
            debug!(request, latest = self.latest_request, "dropping stale task list response");
            return false;
        }
        match result {
            Ok(tasks) => {
                info!(count = tasks.len(), "task list loaded");
                self.tasks = tasks;
                self.load_state = LoadState::Loaded;
            }
            Err(error) => {
                self.load_state = LoadState::Failed(error.user_message());
            }
        }
        self.apply();
        true
    }

    /// Recomputes the visible rows after any filter or sort change.
    fn apply(&mut self) {
        self.visible = visible_indices(&self.tasks, &self.filters, self.sort);
        self.pagination.clamp(self.visible.len());
        let rows = self.page_range().len();
        self.selected = self.selected.min(rows.saturating_sub(1));
    }

    fn filters_changed(&mut self) {
        self.pagination.first();
        self.selected = 0;
        self.apply();
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filters.status = status;
        self.filters_changed();
    }

    pub fn set_project_filter(&mut self, project: Option<String>) {
        self.filters.project = project;
        self.filters_changed();
    }

    pub fn set_assigner_filter(&mut self, assigner: Option<String>) {
        self.filters.assigner = assigner;
        self.filters_changed();
    }

    pub fn set_search(&mut self, query: &str) {
        if self.filters.search == query {
            return;
        }
        self.filters.search = query.to_owned();
        self.filters_changed();
    }

    pub fn reset_filters(&mut self) {
        self.filters = Filters::default();
        self.filters_changed();
    }

    pub fn cycle_status_filter(&mut self) {
        self.set_status_filter(self.filters.status.next());
    }

    pub fn cycle_project_filter(&mut self) {
        let ids: Vec<String> = self.project_options().into_iter().map(|project| project.id).collect();
        let next = cycle_option(&ids, self.filters.project.as_deref());
        self.set_project_filter(next);
    }

    pub fn cycle_assigner_filter(&mut self) {
        let names = self.assigner_options();
        let next = cycle_option(&names, self.filters.assigner.as_deref());
        self.set_assigner_filter(next);
    }

    pub fn sort_by(&mut self, column: Column) -> bool {
        if !self.sort.activate(column) {
            return false;
        }
        self.apply();
        true
    }

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    /// Project filter choices: the server's list when loaded, else the projects seen
    /// on tasks.
    pub fn project_options(&self) -> Vec<Project> {
        if !self.projects.is_empty() {
            return self.projects.clone();
        }
        let mut seen = BTreeSet::new();
        let mut projects: Vec<Project> = self
            .tasks
            .iter()
            .filter_map(|task| {
                let id = task.project_id()?;
                seen.insert(id.to_owned()).then(|| Project {
                    id: id.to_owned(),
                    name: task.project_name().unwrap_or(id).to_owned(),
                })
            })
            .collect();
        projects.sort_by_key(|project| project.name.to_lowercase());
        projects
    }

    pub fn project_label(&self, id: &str) -> String {
        self.project_options()
            .into_iter()
            .find(|project| project.id == id)
            .map(|project| project.name)
            .unwrap_or_else(|| id.to_owned())
    }

    /// Distinct assigner names, sorted.
    pub fn assigner_options(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter_map(|task| task.assigner.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn shown_count(&self) -> usize {
        self.visible.len()
    }

    /// Loaded successfully but nothing passes the filters.
    pub fn is_empty_result(&self) -> bool {
        self.load_state == LoadState::Loaded && self.visible.is_empty()
    }

    fn page_range(&self) -> std::ops::Range<usize> {
        self.pagination.range(self.visible.len())
    }

    pub fn page_tasks(&self) -> Vec<&Task> {
        self.visible[self.page_range()]
            .iter()
            .map(|index| &self.tasks[*index])
            .collect()
    }

    pub fn page_rows(&self) -> Vec<TaskRow> {
        self.page_tasks().into_iter().map(TaskRow::from_task).collect()
    }

    /// Every visible task in order, ignoring paging.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.visible.iter().map(|index| &self.tasks[*index]).collect()
    }

    pub fn total_pages(&self) -> usize {
        self.pagination.total_pages(self.visible.len())
    }

    pub fn page_window(&self) -> Vec<PageItem> {
        self.pagination.window(self.visible.len())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.page_tasks().get(self.selected).copied()
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn select_next(&mut self) {
        let rows = self.page_range().len();
        if rows > 0 && self.selected + 1 < rows {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn next_page(&mut self) -> bool {
        self.change_page(1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.change_page(-1)
    }

    fn change_page(&mut self, delta: isize) -> bool {
        let changed = self.pagination.step(delta, self.visible.len());
        if changed {
            self.selected = 0;
        }
        changed
    }

    pub fn cycle_page_size(&mut self) -> usize {
        let size = self.pagination.cycle_page_size();
        self.selected = 0;
        self.apply();
        size
    }
}

/// Next entry after `current` in `options`, wrapping through "all" (`None`).
fn cycle_option(options: &[String], current: Option<&str>) -> Option<String> {
    match current {
        None => options.first().cloned(),
        Some(current) => options
            .iter()
            .position(|option| option == current)
            .and_then(|position| options.get(position + 1))
            .cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::task::{TaskRecord, normalize_records};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tasks(values: serde_json::Value) -> Vec<Task> {
        let records: Vec<TaskRecord> = serde_json::from_value(values).expect("records");
        normalize_records(records)
    }

    fn sample() -> Vec<Task> {
        tasks(json!([
            { "id": 3, "name": "Deploy", "status": { "id": 3, "name": "Завершена" },
              "project": { "id": 1, "name": "Infra" }, "assigner": { "name": "Olga" },
              "assignees": [{ "name": "Pavel" }], "endDateTime": "2024-02-01" },
            { "id": 1, "name": "write docs", "status": { "id": 1, "name": "Новая" },
              "project": { "id": 2, "name": "Website" }, "assigner": { "name": "Ivan" },
              "assignees": [{ "name": "anna" }], "startDateTime": "2024-01-15" },
            { "id": 2, "name": "Audit", "status": { "id": 2, "name": "В работе" },
              "project": { "id": 1, "name": "Infra" }, "assigner": { "name": "Olga" },
              "assignees": { "users": [{ "name": "Boris" }] } },
        ]))
    }

    fn loaded(page_size: usize) -> TaskList {
        let mut list = TaskList::new(page_size);
        let request = list.begin_fetch();
        assert!(list.finish_fetch(request, Ok(sample())));
        list
    }

    fn ids(list: &TaskList) -> Vec<i64> {
        list.visible_tasks().iter().map(|task| task.id).collect()
    }

    #[test]
    fn default_order_is_id_ascending() {
        assert_eq!(ids(&loaded(25)), vec![1, 2, 3]);
    }

    #[test]
    fn status_filters_split_on_completion() {
        let mut list = loaded(25);
        list.set_status_filter(StatusFilter::Completed);
        assert_eq!(ids(&list), vec![3]);
        list.set_status_filter(StatusFilter::Active);
        assert_eq!(ids(&list), vec![1, 2]);
        assert_eq!(list.shown_count(), 2);
        assert_eq!(list.total_count(), 3);
    }

    #[test]
    fn project_filter_compares_ids_as_strings() {
        let mut list = loaded(25);
        list.set_project_filter(Some("1".into()));
        assert_eq!(ids(&list), vec![2, 3]);
    }

    #[test]
    fn search_matches_project_name_only() {
        let mut list = loaded(25);
        list.set_search("WEBSITE");
        assert_eq!(ids(&list), vec![1]);
        list.set_search("  ");
        assert_eq!(ids(&list), vec![1, 2, 3]);
    }

    #[test]
    fn search_covers_formatted_dates_and_assigner() {
        let mut list = loaded(25);
        list.set_search("01.02.2024");
        assert_eq!(ids(&list), vec![3]);
        list.set_search("ivan");
        assert_eq!(ids(&list), vec![1]);
        list.set_search("not specified");
        assert_eq!(ids(&list), Vec::<i64>::new());
        assert!(list.is_empty_result());
    }

    #[test]
    fn assigner_filter_and_options() {
        let mut list = loaded(25);
        assert_eq!(list.assigner_options(), vec!["Ivan", "Olga"]);
        list.cycle_assigner_filter();
        assert_eq!(list.filters().assigner.as_deref(), Some("Ivan"));
        list.cycle_assigner_filter();
        assert_eq!(ids(&list), vec![2, 3]);
        list.cycle_assigner_filter();
        assert_eq!(list.filters().assigner, None);
    }

    #[test]
    fn sort_toggles_then_resets_on_new_column() {
        let mut list = loaded(25);
        assert!(list.sort_by(Column::Id));
        assert_eq!(list.sort().direction, SortDirection::Descending);
        assert_eq!(ids(&list), vec![3, 2, 1]);
        assert!(list.sort_by(Column::Name));
        assert_eq!(list.sort().direction, SortDirection::Ascending);
        assert_eq!(ids(&list), vec![2, 3, 1]);
        assert!(!list.sort_by(Column::Actions));
        assert_eq!(list.sort().column, Column::Name);
    }

    #[test]
    fn sorting_by_assignee_uses_first_assignee() {
        let mut list = loaded(25);
        list.sort_by(Column::Assignee);
        assert_eq!(ids(&list), vec![1, 2, 3]);
    }

    #[test]
    fn dates_sort_missing_first_and_prefer_end() {
        let mut list = loaded(25);
        list.sort_by(Column::Dates);
        assert_eq!(ids(&list), vec![2, 1, 3]);
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let mut list = loaded(25);
        list.sort_by(Column::Project);
        assert_eq!(ids(&list), vec![3, 2, 1]);
        list.sort_by(Column::Project);
        assert_eq!(ids(&list), vec![1, 3, 2]);
    }

    #[test]
    fn stale_responses_are_ignored() {
        let mut list = TaskList::new(25);
        let first = list.begin_fetch();
        let second = list.begin_fetch();
        assert!(list.finish_fetch(second, Ok(sample())));
        assert!(!list.finish_fetch(first, Ok(Vec::new())));
        assert_eq!(list.total_count(), 3);
        assert_eq!(list.load_state(), &LoadState::Loaded);
    }

    #[test]
    fn failure_keeps_a_retryable_message() {
        let mut list = TaskList::new(25);
        let request = list.begin_fetch();
        assert!(list.is_loading());
        list.finish_fetch(request, Err(ApiError::Rejected("nope".into())));
        assert_eq!(list.load_state(), &LoadState::Failed("nope".into()));
        assert!(!list.is_empty_result());
    }

    #[test]
    fn paging_and_selection_stay_in_bounds() {
        let mut list = loaded(10);
        list.cycle_page_size();
        assert_eq!(list.pagination().page_size(), 25);

        let mut list = TaskList::new(10);
        let many: Vec<Task> = (1..=23)
            .map(|id| tasks(json!([{ "id": id, "name": format!("t{id}") }])).remove(0))
            .collect();
        let request = list.begin_fetch();
        list.finish_fetch(request, Ok(many));
        assert_eq!(list.total_pages(), 3);
        assert!(list.next_page());
        assert!(list.next_page());
        assert!(!list.next_page());
        assert_eq!(list.page_rows().len(), 3);
        for _ in 0..10 {
            list.select_next();
        }
        assert_eq!(list.selected_task().map(|task| task.id), Some(23));

        list.set_search("t1");
        assert_eq!(list.pagination().page(), 1);
        assert_eq!(list.shown_count(), 11);
    }

    #[test]
    fn reset_clears_every_filter() {
        let mut list = loaded(25);
        list.set_status_filter(StatusFilter::Completed);
        list.set_project_filter(Some("2".into()));
        list.set_search("docs");
        assert_eq!(list.shown_count(), 0);
        list.reset_filters();
        assert!(list.filters().is_default());
        assert_eq!(list.shown_count(), 3);
    }

    #[test]
    fn project_options_fall_back_to_task_projects() {
        let mut list = loaded(25);
        let names: Vec<String> = list.project_options().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Infra", "Website"]);
        list.set_projects(vec![Project { id: "9".into(), name: "Remote".into() }]);
        list.cycle_project_filter();
        assert_eq!(list.filters().project.as_deref(), Some("9"));
        assert_eq!(list.project_label("9"), "Remote");
    }

    #[test]
    fn rows_disable_integrate_for_completed_tasks() {
        let list = loaded(25);
        let rows = list.page_rows();
        let completed = rows.iter().find(|row| row.id == 3).expect("row");
        assert!(!completed.can_integrate);
        assert_eq!(completed.status_class, StatusClass::Completed);
        assert_eq!(completed.start, "Not specified");
        assert_eq!(completed.end, "01.02.2024");
        let open = rows.iter().find(|row| row.id == 1).expect("row");
        assert!(open.can_integrate);
        assert_eq!(open.assigner_initial, "I");
    }
}
