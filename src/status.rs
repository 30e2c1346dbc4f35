//! Status classification shared by filtering, row badges and the detail modal.

use serde::{Deserialize, Serialize};

/// Status id the upstream system uses for finished tasks.
pub const COMPLETED_STATUS_ID: i64 = 3;

const DRAFT_KEYWORDS: &[&str] = &["черновик", "draft"];
const NEW_KEYWORDS: &[&str] = &["нов", "new"];
const IN_PROGRESS_KEYWORDS: &[&str] = &["работ", "progress"];
const COMPLETED_KEYWORDS: &[&str] = &["выполн", "заверш", "готов", "compl", "done", "finish"];
const ON_HOLD_KEYWORDS: &[&str] = &["отлож", "приост", "hold", "paused"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusClass {
    Draft,
    New,
    InProgress,
    Completed,
    OnHold,
    /// Unrecognized name, lowercased with whitespace removed.
    Other(String),
}

impl StatusClass {
    /// Classifies a status name by keyword; the first matching group wins.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|keyword| lower.contains(keyword));

        // "нов" is a substring of "черновик" and "приостановлена", so the
        // new-task group is checked last.
        if has(DRAFT_KEYWORDS) {
            StatusClass::Draft
        } else if has(ON_HOLD_KEYWORDS) {
            StatusClass::OnHold
        } else if has(COMPLETED_KEYWORDS) {
            StatusClass::Completed
        } else if has(IN_PROGRESS_KEYWORDS) {
            StatusClass::InProgress
        } else if has(NEW_KEYWORDS) {
            StatusClass::New
        } else {
            StatusClass::Other(lower.split_whitespace().collect())
        }
    }

    /// Classifies a status from both signals the upstream system provides.
    pub fn classify(id: Option<i64>, name: Option<&str>) -> Self {
        if id == Some(COMPLETED_STATUS_ID) {
            return StatusClass::Completed;
        }
        match name {
            Some(name) => StatusClass::from_name(name),
            None => StatusClass::Other(String::new()),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StatusClass::Completed)
    }

    pub fn label(&self) -> &str {
        match self {
            StatusClass::Draft => "draft",
            StatusClass::New => "new",
            StatusClass::InProgress => "in-progress",
            StatusClass::Completed => "completed",
            StatusClass::OnHold => "on-hold",
            StatusClass::Other(raw) => raw,
        }
    }
}
