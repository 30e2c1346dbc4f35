use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Table columns, in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Id,
    Name,
    Status,
    Project,
    Dates,
    Assignee,
    Actions,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::Name,
        Column::Status,
        Column::Project,
        Column::Dates,
        Column::Assignee,
        Column::Actions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Status => "status",
            Column::Project => "project",
            Column::Dates => "dates",
            Column::Assignee => "assignee",
            Column::Actions => "actions",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::Name => "Name",
            Column::Status => "Status",
            Column::Project => "Project",
            Column::Dates => "Dates",
            Column::Assignee => "Assigner",
            Column::Actions => "Actions",
        }
    }

    pub fn is_sortable(self) -> bool {
        !matches!(self, Column::Actions)
    }
}

/// Which columns are shown. Persisted as a JSON object of column key to bool;
/// keys missing from storage default to visible and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct ColumnVisibility {
    hidden: Vec<Column>,
}

impl ColumnVisibility {
    pub fn is_visible(&self, column: Column) -> bool {
        !self.hidden.contains(&column)
    }

    pub fn set(&mut self, column: Column, visible: bool) {
        self.hidden.retain(|hidden| *hidden != column);
        if !visible {
            self.hidden.push(column);
            self.hidden.sort();
        }
    }

    /// Flips one column and returns its new visibility.
    pub fn toggle(&mut self, column: Column) -> bool {
        let visible = !self.is_visible(column);
        self.set(column, visible);
        visible
    }

    pub fn visible_columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|column| self.is_visible(*column))
            .collect()
    }
}

impl From<BTreeMap<String, bool>> for ColumnVisibility {
    fn from(map: BTreeMap<String, bool>) -> Self {
        let mut visibility = ColumnVisibility::default();
        for column in Column::ALL {
            if let Some(visible) = map.get(column.key()) {
                visibility.set(column, *visible);
            }
        }
        visibility
    }
}

impl From<ColumnVisibility> for BTreeMap<String, bool> {
    fn from(visibility: ColumnVisibility) -> Self {
        Column::ALL
            .into_iter()
            .map(|column| (column.key().to_owned(), visibility.is_visible(column)))
            .collect()
    }
}
