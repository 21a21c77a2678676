use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12), // Menu button
            Constraint::Min(0),     // Board > Sprint
            Constraint::Length(18), // Refresh state
        ])
        .split(area);

    let theme = &app.config.theme;
    let menu_style = if app.menu_open() {
        Style::default().fg(theme.parse_color(&theme.highlight)).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let menu = Paragraph::new("Menu [m]")
        .style(menu_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(menu, chunks[0]);

    let title = Paragraph::new(app.header_title())
        .style(Style::default().fg(theme.parse_color(&theme.text)).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Sprint [s] "));
    f.render_widget(title, chunks[1]);

    let block = Block::default().borders(Borders::ALL).title(" Status ");
    if app.is_refreshing() {
        let text = Paragraph::new(format!("{} Refreshing", app.spinner_char()))
            .block(block)
            .style(Style::default().fg(theme.parse_color(&theme.highlight)));
        f.render_widget(text, chunks[2]);
    } else if app.board.error().is_some() {
        let text = Paragraph::new("⚠ Load failed")
            .block(block)
            .style(Style::default().fg(Color::Red));
        f.render_widget(text, chunks[2]);
    } else {
        f.render_widget(block, chunks[2]);
    }
}
