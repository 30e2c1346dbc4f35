use crate::dates::TaskDate;
use crate::markup::{html_to_text, sanitize_line};
use crate::status::StatusClass;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub const UNTITLED: &str = "Untitled";

/// A task as the backend sends it. Only `id` is dependable; every other field may be
/// missing or arrive in one of several shapes, so the loose ones stay as raw JSON
/// until [`Task::from_record`] normalizes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_ref")]
    pub status: Option<NamedRef>,
    #[serde(default, deserialize_with = "lenient_ref")]
    pub project: Option<NamedRef>,
    #[serde(default)]
    pub assigner: Option<Value>,
    #[serde(default)]
    pub assignees: Option<Value>,
    #[serde(default, deserialize_with = "lenient_ref")]
    pub priority: Option<NamedRef>,
    #[serde(default)]
    pub start_date_time: Option<Value>,
    #[serde(default)]
    pub end_date_time: Option<Value>,
    #[serde(default)]
    pub date_begin: Option<Value>,
    #[serde(default)]
    pub date_end: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

/// `{ id, name }` pair used for status, project and priority. A bare string is
/// read as the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

impl NamedRef {
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.as_ref().and_then(value_as_i64)
    }

    pub fn string_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(raw) => Some(raw.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub class: StatusClass,
}

impl Status {
    pub fn is_completed(&self) -> bool {
        self.class.is_completed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// The normalized task every filter, sort and view works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub name: Option<String>,
    pub status: Option<Status>,
    pub project: Option<ProjectRef>,
    pub assigner: Option<String>,
    pub assignees: Vec<String>,
    pub priority: Option<String>,
    pub start: TaskDate,
    pub end: TaskDate,
    /// Plain-text description, already stripped of markup.
    pub description: Option<String>,
}

impl Task {
    /// Normalizes a raw record. Returns `None` when the record has no usable id.
    pub fn from_record(record: TaskRecord) -> Option<Self> {
        let Some(id) = record.id else {
            warn!(name = ?record.name, "dropping task record without an id");
            return None;
        };

        let status = record.status.map(|status| {
            let id = status.numeric_id();
            let name = clean(status.name);
            let class = StatusClass::classify(id, name.as_deref());
            Status { id, name, class }
        });
        let project = record.project.map(|project| ProjectRef {
            id: project.string_id(),
            name: clean(project.name),
        });

        let start = first_present(&[record.start_date_time.as_ref(), record.date_begin.as_ref()]);
        let end = first_present(&[record.end_date_time.as_ref(), record.date_end.as_ref()]);

        Some(Task {
            id,
            name: clean(record.name),
            status,
            project,
            assigner: record.assigner.as_ref().and_then(person_name),
            assignees: normalize_assignees(record.assignees.as_ref()),
            priority: record.priority.and_then(|priority| clean(priority.name)),
            start,
            end,
            description: record
                .description
                .map(|html| html_to_text(&html))
                .filter(|text| !text.trim().is_empty()),
        })
    }

    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or(UNTITLED)
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().and_then(|status| status.name.as_deref())
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref().and_then(|project| project.name.as_deref())
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().and_then(|project| project.id.as_deref())
    }

    pub fn is_completed(&self) -> bool {
        self.status.as_ref().is_some_and(Status::is_completed)
    }

    pub fn status_class(&self) -> StatusClass {
        self.status
            .as_ref()
            .map(|status| status.class.clone())
            .unwrap_or(StatusClass::Other(String::new()))
    }

    /// Start and end as shown in the dates column, skipping absent values.
    pub fn date_range_text(&self) -> String {
        [self.start.formatted(), self.end.formatted()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// End date when known, else start date; the key for date sorting.
    pub fn sort_date(&self) -> Option<chrono::NaiveDateTime> {
        self.end.value().or_else(|| self.start.value())
    }
}

pub fn normalize_records(records: Vec<TaskRecord>) -> Vec<Task> {
    records.into_iter().filter_map(Task::from_record).collect()
}

/// Decodes list entries one at a time so a single malformed entry is skipped
/// instead of failing the whole list.
pub fn records_from_values(values: Vec<Value>) -> Vec<TaskRecord> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(error = %error, "dropping malformed task record");
                None
            }
        })
        .collect()
}

/// Assignees arrive as a list of people, as `{ users: [...] }`, or as a single person.
pub fn normalize_assignees(value: Option<&Value>) -> Vec<String> {
    let people: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(person @ Value::Object(fields)) => match fields.get("users") {
            Some(Value::Array(users)) => users.iter().collect(),
            Some(_) => Vec::new(),
            None => vec![person],
        },
        Some(name @ Value::String(_)) => vec![name],
        _ => Vec::new(),
    };
    people.into_iter().filter_map(person_name).collect()
}

fn person_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => clean(Some(name.clone())),
        Value::Object(fields) => clean(fields.get("name").and_then(Value::as_str).map(str::to_owned)),
        _ => None,
    }
}

fn first_present(candidates: &[Option<&Value>]) -> TaskDate {
    candidates
        .iter()
        .map(|candidate| TaskDate::from_value(*candidate))
        .find(|date| !date.is_missing())
        .unwrap_or(TaskDate::Missing)
}

fn clean(text: Option<String>) -> Option<String> {
    text.map(|text| sanitize_line(&text).trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

/// Text fields: strings as sent, numbers and booleans as their text, anything else
/// absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_ref<'de, D>(deserializer: D) -> Result<Option<NamedRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(name)) => Some(NamedRef {
            id: None,
            name: Some(name),
        }),
        Some(fields @ Value::Object(_)) => serde_json::from_value(fields).ok(),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

/// Entry of `GET /api/projects/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default)]
    pub id: Value,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// Keeps named projects with an id, sorted by lowercase name.
pub fn normalize_projects(records: Vec<ProjectRecord>) -> Vec<Project> {
    let mut projects: Vec<Project> = records
        .into_iter()
        .filter_map(|record| {
            let id = match record.id {
                Value::String(raw) if !raw.trim().is_empty() => raw,
                Value::Number(number) => number.to_string(),
                _ => return None,
            };
            let name = clean(record.name)?;
            Some(Project { id, name })
        })
        .collect();
    projects.sort_by_key(|project| project.name.to_lowercase());
    projects
}
