//! Task detail popup state.

use crate::error::ApiResult;
use crate::status::StatusClass;
use crate::task::Task;
use tracing::debug;

pub const NOT_SPECIFIED: &str = "Not specified";
pub const UNASSIGNED: &str = "Unassigned";
pub const NORMAL_PRIORITY: &str = "Normal";
pub const NO_DESCRIPTION: &str = "No description";

/// Fields shown in the popup, with placeholders already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    pub id: i64,
    pub title: String,
    pub project: String,
    pub assigner: String,
    pub assignees: String,
    pub priority: String,
    pub status: String,
    pub status_class: StatusClass,
    pub start: String,
    pub end: String,
    pub description: String,
    pub completed: bool,
}

impl TaskDetail {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title().to_owned(),
            project: task.project_name().unwrap_or(NOT_SPECIFIED).to_owned(),
            assigner: task.assigner.clone().unwrap_or_else(|| NOT_SPECIFIED.to_owned()),
            assignees: if task.assignees.is_empty() {
                UNASSIGNED.to_owned()
            } else {
                task.assignees.join(", ")
            },
            priority: task.priority.clone().unwrap_or_else(|| NORMAL_PRIORITY.to_owned()),
            status: task.status_name().unwrap_or(NOT_SPECIFIED).to_owned(),
            status_class: task.status_class(),
            start: task.start.display(),
            end: task.end.display(),
            description: task
                .description
                .clone()
                .unwrap_or_else(|| NO_DESCRIPTION.to_owned()),
            completed: task.is_completed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailModal {
    #[default]
    Closed,
    Loading {
        task_id: i64,
        request: u64,
    },
    Populated {
        detail: TaskDetail,
        /// Integration request in flight; the control is disabled meanwhile.
        integrating: bool,
        scroll: u16,
    },
    Errored {
        task_id: i64,
        message: String,
    },
}

impl DetailModal {
    pub fn is_open(&self) -> bool {
        !matches!(self, DetailModal::Closed)
    }

    pub fn task_id(&self) -> Option<i64> {
        match self {
            DetailModal::Closed => None,
            DetailModal::Loading { task_id, .. } | DetailModal::Errored { task_id, .. } => {
                Some(*task_id)
            }
            DetailModal::Populated { detail, .. } => Some(detail.id),
        }
    }

    /// Opens in the loading state. Any previous content is discarded.
    pub fn open(&mut self, task_id: i64, request: u64) {
        *self = DetailModal::Loading { task_id, request };
    }

    pub fn close(&mut self) {
        *self = DetailModal::Closed;
    }

    /// Applies a detail response if it belongs to the request currently loading.
    pub fn finish(&mut self, request: u64, result: ApiResult<Task>) -> bool {
        let task_id = match self {
            DetailModal::Loading {
                task_id,
                request: pending,
            } if *pending == request => *task_id,
            _ => {
                debug!(request, "dropping detail response for a closed or replaced popup");
                return false;
            }
        };
        *self = match result {
            Ok(task) => DetailModal::Populated {
                detail: TaskDetail::from_task(&task),
                integrating: false,
                scroll: 0,
            },
            Err(error) => DetailModal::Errored {
                task_id,
                message: error.user_message(),
            },
        };
        true
    }

    /// Integration is offered only for a loaded, unfinished task with no request
    /// already running.
    pub fn can_integrate(&self) -> bool {
        matches!(
            self,
            DetailModal::Populated {
                detail,
                integrating: false,
                ..
            } if !detail.completed
        )
    }

    pub fn set_integrating(&mut self, value: bool) {
        if let DetailModal::Populated { integrating, .. } = self {
            *integrating = value;
        }
    }

    pub fn scroll_by(&mut self, delta: i16) {
        if let DetailModal::Populated { scroll, .. } = self {
            *scroll = scroll.saturating_add_signed(delta);
        }
    }
}
