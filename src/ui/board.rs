use crate::app::App;
use crate::board::{RowKind, RowView};
use crate::config::Theme;
use crate::youtrack::IssueOnList;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.config.theme;
    let block = crate::ui::styled_block("Board", true, theme);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.layout.is_empty() {
        let message = if app.is_refreshing() {
            "Loading sprint..."
        } else if app.board.error().is_some() {
            "Could not load sprint. Press r to retry"
        } else {
            "No sprint loaded"
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(theme.parse_color(&theme.text_muted)));
        f.render_widget(empty, inner);
        return;
    }

    if inner.height < 2 {
        return;
    }

    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let body = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);

    draw_column_headers(f, app, header_area);

    let heights: Vec<u16> = app.layout.rows.iter().map(row_height).collect();
    let start = first_visible_row(&heights, app.cursor.row, body.height);

    let mut y = body.y;
    for (idx, row) in app.layout.rows.iter().enumerate().skip(start) {
        if y >= body.bottom() {
            break;
        }
        let height = heights[idx].min(body.bottom() - y);
        let row_area = Rect::new(body.x, y, body.width, height);
        draw_row(f, app, idx, row, row_area);
        y += height;
    }
}

fn column_areas(app: &App, area: Rect) -> std::rc::Rc<[Rect]> {
    let count = app.layout.columns.len().max(1) as u32;
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, count); count as usize])
        .split(area)
}

fn draw_column_headers(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.config.theme;
    let areas = column_areas(app, area);
    for (idx, column) in app.layout.columns.iter().enumerate() {
        let mut style = Style::default()
            .fg(theme.parse_color(&theme.text))
            .bg(theme.parse_color(&theme.header_bg))
            .add_modifier(Modifier::BOLD);
        if idx == app.cursor.column {
            style = style.fg(theme.parse_color(&theme.border_active));
        }
        let width = areas[idx].width.saturating_sub(1) as usize;
        let label = super::truncate_str(&column.label, width);
        f.render_widget(Paragraph::new(format!(" {label}")).style(style), areas[idx]);
    }
}

/// Title line plus the tallest cell; collapsed rows are a single line.
pub fn row_height(row: &RowView) -> u16 {
    if row.collapsed {
        return 1;
    }
    let tallest = row.cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
    1 + tallest as u16
}

/// First row to draw so that `selected` fits in `available` lines.
pub fn first_visible_row(heights: &[u16], selected: usize, available: u16) -> usize {
    if heights.is_empty() {
        return 0;
    }
    let selected = selected.min(heights.len() - 1);
    let mut used = 0u16;
    let mut start = selected;
    for idx in (0..=selected).rev() {
        used = used.saturating_add(heights[idx]);
        if used > available && idx != selected {
            break;
        }
        start = idx;
    }
    start
}

fn draw_row(f: &mut Frame, app: &App, idx: usize, row: &RowView, area: Rect) {
    let theme = &app.config.theme;
    let is_selected_row = idx == app.cursor.row;

    let indicator = if row.collapsed { "▶ " } else { "▼ " };
    let title_color = match row.kind {
        RowKind::Orphan => theme.parse_color(&theme.text_muted),
        RowKind::Swimlane => theme.parse_color(&theme.text),
    };
    let mut title_style = Style::default().fg(title_color).add_modifier(Modifier::BOLD);
    if is_selected_row {
        title_style = title_style.bg(theme.parse_color(&theme.selected_bg));
    }

    let title = Line::from(vec![
        Span::styled(indicator, title_style),
        Span::styled(row.title.clone(), title_style),
        Span::styled(
            format!("  ({})", row.issue_count),
            Style::default().fg(theme.parse_color(&theme.text_muted)),
        ),
    ]);
    f.render_widget(Paragraph::new(title), Rect::new(area.x, area.y, area.width, 1));

    if row.collapsed || area.height < 2 {
        return;
    }

    let cells_area = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    let areas = column_areas(app, cells_area);
    for (col, issues) in row.cells.iter().enumerate() {
        let Some(cell_area) = areas.get(col) else {
            break;
        };
        let selected_card = (is_selected_row && col == app.cursor.column).then_some(app.cursor.card);
        let lines: Vec<Line> = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| card_line(issue, theme, selected_card == Some(i), cell_area.width))
            .collect();
        f.render_widget(Paragraph::new(lines), *cell_area);
    }
}

fn card_line(issue: &IssueOnList, theme: &Theme, selected: bool, width: u16) -> Line<'static> {
    let mut id_style = Style::default().fg(theme.parse_color(&theme.border_active));
    let mut text_style = Style::default().fg(theme.parse_color(&theme.text));
    if issue.is_resolved() {
        id_style = id_style.add_modifier(Modifier::CROSSED_OUT);
        text_style = text_style.fg(theme.parse_color(&theme.card_resolved));
    }
    if selected {
        let bg = theme.parse_color(&theme.selected_bg);
        id_style = id_style.bg(bg).add_modifier(Modifier::BOLD);
        text_style = text_style.bg(bg);
    }

    let prefix = format!(" {} {} ", issue.state_icon(), issue.id_readable);
    let remaining = (width as usize).saturating_sub(prefix.chars().count() + 1);
    let summary = super::truncate_str(&issue.summary, remaining);

    Line::from(vec![
        Span::styled(prefix, id_style),
        Span::styled(summary, text_style),
    ])
}
