use crate::app::{App, MenuEntry};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem};

pub fn draw_menu(f: &mut Frame, app: &mut App, area: Rect) {
    let items: Vec<ListItem> = MenuEntry::ALL
        .iter()
        .map(|e| ListItem::new(e.label()))
        .collect();

    // Side menu pinned to the left edge
    let height = (items.len() as u16 + 2).min(area.height);
    let menu_area = Rect::new(area.x, area.y + 3.min(area.height), 24.min(area.width), height);
    f.render_widget(Clear, menu_area);

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Menu "))
        .highlight_style(Style::default().bg(Color::Rgb(35, 55, 85)))
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, menu_area, &mut app.menu_state);
}

pub fn draw_sprint_dropdown(f: &mut Frame, app: &mut App, area: Rect) {
    let current = app.sprint().map(|s| s.id.clone());
    let items: Vec<ListItem> = app
        .visited_sprints()
        .iter()
        .map(|s| {
            let marker = if Some(&s.id) == current.as_ref() { "● " } else { "  " };
            let agile = if s.agile.name.is_empty() { &s.agile.id } else { &s.agile.name };
            ListItem::new(format!("{marker}{agile} > {}", s.name))
        })
        .collect();

    let height = (items.len() + 2).min(15) as u16;
    let inner = super::centered_rect(50, height, area);
    f.render_widget(Clear, inner);

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Select Sprint "))
        .highlight_style(Style::default().bg(Color::Rgb(35, 55, 85)))
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, inner, &mut app.dropdown_list_state);
}
