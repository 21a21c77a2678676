mod board;
mod detail;
mod header;
mod help;
mod menu;

use crate::app::{App, InputMode, Route};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Header (3) + content + status bar (1)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    header::draw(f, app, chunks[0]);

    match app.current_route().cloned() {
        Some(Route::IssueDetail { placeholder, .. }) => detail::draw(f, app, &placeholder, chunks[1]),
        None => board::draw(f, app, chunks[1]),
    }

    draw_status_bar(f, app, chunks[2]);

    match app.input_mode {
        InputMode::Menu => menu::draw_menu(f, app, size),
        InputMode::SprintSelect => menu::draw_sprint_dropdown(f, app, size),
        InputMode::Help => help::draw_popup(f, app, size),
        InputMode::Normal => {}
    }
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let style = if app.status_is_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        match (app.input_mode, app.current_route()) {
            (InputMode::Normal, Some(Route::IssueDetail { .. })) => {
                "j/k:scroll  o:open  y:copy id  Esc:back  ?:help  q:quit".into()
            }
            (InputMode::Normal, None) => {
                "h/j/k/l:move  J/K:card  Enter:open  z:collapse  r:refresh  s:sprint  m:menu  ?:help  q:quit".into()
            }
            _ => "j/k:select  Enter:confirm  Esc:cancel".into(),
        }
    };

    let paragraph = Paragraph::new(content).style(style);
    f.render_widget(paragraph, area);
}

// Helper: create a centered rect
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

// Helper: styled block with focus indicator
pub fn styled_block<'a>(
    title: &'a str,
    focused: bool,
    theme: &'a crate::config::Theme,
) -> Block<'a> {
    let border_color = if focused {
        theme.parse_color(&theme.border_active)
    } else {
        theme.parse_color(&theme.border)
    };

    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {title} "))
}

pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max_chars {
        let truncated: String = chars[..max_chars.saturating_sub(3)].iter().collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}
