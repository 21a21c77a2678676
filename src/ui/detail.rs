use crate::app::App;
use crate::youtrack::IssueOnList;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

pub fn draw(f: &mut Frame, app: &App, issue: &IssueOnList, area: Rect) {
    let theme = &app.config.theme;
    let title = format!("{} (Esc to go back)", issue.id_readable);
    let block = crate::ui::styled_block(&title, true, theme);
    let inner = block.inner(area);

    let label = Style::default().fg(theme.parse_color(&theme.text_muted));
    let text = Style::default().fg(theme.parse_color(&theme.text));

    let mut lines = vec![
        Line::from(Span::styled(
            issue.summary.clone(),
            text.add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    let mut meta: Vec<(String, String)> = Vec::new();
    if let Some(reporter) = &issue.reporter {
        meta.push(("Reporter".into(), reporter.display_name().to_string()));
    }
    if let Some(created) = issue.created_at() {
        meta.push(("Created".into(), created.format("%Y-%m-%d %H:%M").to_string()));
    }
    if let Some(updated) = issue.updated_at() {
        meta.push(("Updated".into(), updated.format("%Y-%m-%d %H:%M").to_string()));
    }
    if issue.is_resolved() {
        meta.push(("Resolved".into(), "yes".into()));
    }
    for field in &issue.fields {
        if let Some(value) = field.presentation() {
            meta.push((field.name.clone(), value));
        }
    }

    for (name, value) in meta {
        lines.push(Line::from(vec![
            Span::styled(format!("{name:<12}"), label),
            Span::styled(value, text),
        ]));
    }

    lines.push(Line::from(""));
    match issue.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => {
            let width = inner.width.saturating_sub(1).max(20) as usize;
            for paragraph in description.lines() {
                if paragraph.is_empty() {
                    lines.push(Line::from(""));
                    continue;
                }
                for wrapped in textwrap::wrap(paragraph, width) {
                    lines.push(Line::from(Span::styled(wrapped.into_owned(), text)));
                }
            }
        }
        _ => lines.push(Line::from(Span::styled("No description", label))),
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.detail_scroll, 0));
    f.render_widget(paragraph, area);
}
