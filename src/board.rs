//! Board layout: a view description derived from a loaded sprint.
//!
//! Nothing here touches the terminal. `ui::board` draws a `BoardLayout`,
//! and `App` navigates it.

use crate::youtrack::{BoardRow, IssueOnList, SprintFull};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Orphan,
    Swimlane,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub row_id: String,
    pub title: String,
    pub kind: RowKind,
    pub collapsed: bool,
    pub issue_count: usize,
    /// One entry per column, in column order
    pub cells: Vec<Vec<IssueOnList>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardLayout {
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<RowView>,
}

impl RowView {
    fn from_row(row: &BoardRow, kind: RowKind, columns: &[ColumnHeader]) -> Self {
        let cells = columns
            .iter()
            .map(|c| {
                row.cell_for(&c.id)
                    .map(|cell| cell.issues.clone())
                    .unwrap_or_default()
            })
            .collect();

        Self {
            row_id: row.id.clone(),
            title: row.title(),
            kind,
            collapsed: row.collapsed,
            issue_count: row.issue_count(),
            cells,
        }
    }

    pub fn issues_in(&self, column: usize) -> &[IssueOnList] {
        self.cells.get(column).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl BoardLayout {
    pub fn from_sprint(sprint: &SprintFull) -> Self {
        let board = &sprint.board;
        let columns: Vec<ColumnHeader> = board
            .columns
            .iter()
            .map(|c| ColumnHeader { id: c.id.clone(), label: c.label() })
            .collect();

        let orphan = RowView::from_row(&board.orphan_row, RowKind::Orphan, &columns);
        let mut rows = Vec::with_capacity(board.trimmed_swimlanes.len() + 1);

        if sprint.agile.orphans_at_the_top {
            rows.push(orphan.clone());
        }
        rows.extend(
            board
                .trimmed_swimlanes
                .iter()
                .map(|r| RowView::from_row(r, RowKind::Swimlane, &columns)),
        );
        if !sprint.agile.orphans_at_the_top {
            rows.push(orphan);
        }

        Self { columns, rows }
    }

    #[cfg(test)]
    pub fn column_labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    #[cfg(test)]
    pub fn row_index(&self, row_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.row_id == row_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
