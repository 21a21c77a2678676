use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const ORPHAN_ROW_TITLE: &str = "Uncategorized Cards";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgileRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub agile: AgileRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgileUserProfile {
    #[serde(default)]
    pub default_agile: Option<AgileRef>,
    #[serde(default)]
    pub visited_sprints: Vec<SprintRef>,
}

impl AgileUserProfile {
    /// The last visited sprint of the default board
    pub fn current_sprint(&self) -> Option<&SprintRef> {
        let default_agile = self.default_agile.as_ref()?;
        self.visited_sprints
            .iter()
            .find(|s| s.agile.id == default_agile.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgileInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub orphans_at_the_top: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintFull {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub agile: AgileInfo,
    pub board: Board,
}

impl SprintFull {
    pub fn title(&self) -> String {
        format!("{} > {}", self.agile.name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(default)]
    pub columns: Vec<BoardColumn>,
    pub orphan_row: BoardRow,
    #[serde(default)]
    pub trimmed_swimlanes: Vec<BoardRow>,
}

impl Board {
    pub fn row(&self, row_id: &str) -> Option<&BoardRow> {
        if self.orphan_row.id == row_id {
            return Some(&self.orphan_row);
        }
        self.trimmed_swimlanes.iter().find(|r| r.id == row_id)
    }

    /// Replace one row's collapsed flag. Returns false when no row has that id.
    pub fn set_row_collapsed(&mut self, row_id: &str, collapsed: bool) -> bool {
        if self.orphan_row.id == row_id {
            self.orphan_row.collapsed = collapsed;
            return true;
        }
        match self.trimmed_swimlanes.iter_mut().find(|r| r.id == row_id) {
            Some(row) => {
                row.collapsed = collapsed;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: String,
    #[serde(default)]
    pub collapsed: bool,
    pub agile_column: AgileColumn,
}

impl BoardColumn {
    /// Header label: field value presentations joined with ", "
    pub fn label(&self) -> String {
        self.agile_column
            .field_values
            .iter()
            .map(|v| v.presentation.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgileColumn {
    #[serde(default)]
    pub field_values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(default)]
    pub presentation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCell {
    #[serde(default)]
    pub id: String,
    pub column: ColumnRef,
    #[serde(default)]
    pub issues: Vec<IssueOnList>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRow {
    pub id: String,
    #[serde(rename = "$type", default)]
    pub type_name: String,
    #[serde(default)]
    pub collapsed: bool,
    /// Set for issue-based swimlanes
    #[serde(default)]
    pub issue: Option<IssueOnList>,
    /// Set for attribute-based swimlanes
    #[serde(default)]
    pub value: Option<FieldValue>,
    #[serde(default)]
    pub cells: Vec<BoardCell>,
}

/// Body sent when persisting a row's collapsed flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPatch {
    pub id: String,
    #[serde(rename = "$type")]
    pub type_name: String,
    pub collapsed: bool,
}

impl BoardRow {
    pub fn is_orphan(&self) -> bool {
        self.type_name == "OrphanSwimlane" || self.id == "orphans"
    }

    pub fn title(&self) -> String {
        if self.is_orphan() {
            return ORPHAN_ROW_TITLE.to_string();
        }
        if let Some(issue) = &self.issue {
            return format!("{} {}", issue.id_readable, issue.summary);
        }
        match &self.value {
            Some(v) if !v.presentation.is_empty() => v.presentation.clone(),
            _ => self.id.clone(),
        }
    }

    pub fn cell_for(&self, column_id: &str) -> Option<&BoardCell> {
        self.cells.iter().find(|c| c.column.id == column_id)
    }

    pub fn issue_count(&self) -> usize {
        self.cells.iter().map(|c| c.issues.len()).sum()
    }

    pub fn collapse_patch(&self, collapsed: bool) -> RowPatch {
        RowPatch {
            id: self.id.clone(),
            type_name: self.type_name.clone(),
            collapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOnList {
    pub id: String,
    #[serde(default)]
    pub id_readable: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Epoch millis
    #[serde(default)]
    pub resolved: Option<i64>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub updated: Option<i64>,
    #[serde(default)]
    pub reporter: Option<UserRef>,
    #[serde(default)]
    pub fields: Vec<IssueField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserRef {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.login)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl IssueField {
    /// Presentation of a custom field value; handles single and multi-value fields.
    pub fn presentation(&self) -> Option<String> {
        fn one(v: &serde_json::Value) -> Option<String> {
            match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                serde_json::Value::Object(map) => ["presentation", "name", "fullName", "login"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(|x| x.as_str()))
                    .map(str::to_string),
                serde_json::Value::Array(_) => None,
            }
        }

        match &self.value {
            serde_json::Value::Array(values) => {
                let parts: Vec<String> = values.iter().filter_map(one).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
            other => one(other),
        }
    }
}

impl IssueOnList {
    pub fn field_presentation(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .and_then(IssueField::presentation)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn state_icon(&self) -> &'static str {
        if self.is_resolved() {
            return "●";
        }
        match self.field_presentation("State").as_deref() {
            Some("In Progress") => "◐",
            Some("Submitted") | Some("Open") | None => "○",
            _ => "◔",
        }
    }
}
