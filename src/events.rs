use crate::app::{App, InputMode, MenuEntry};
use crate::ui;
use anyhow::Result;
use arboard::Clipboard;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use std::time::{Duration, Instant};

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    app.start_load();

    let mut last_refresh = Instant::now();
    let mut last_spinner_tick = Instant::now();
    let refresh_interval = Duration::from_secs(app.config.settings.refresh_interval);
    let spinner_interval = Duration::from_millis(80);

    loop {
        if app.is_refreshing() && last_spinner_tick.elapsed() >= spinner_interval {
            app.tick_spinner();
            last_spinner_tick = Instant::now();
        }

        // Results of loads and row updates (non-blocking)
        app.poll_background();

        app.clear_expired_status();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with short timeout for responsive UI
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                handle_key(app, key);
            }
        }

        if app.should_quit {
            app.shutdown();
            return Ok(());
        }

        // Periodic refresh; 0 disables it
        if !refresh_interval.is_zero()
            && !app.is_refreshing()
            && app.input_mode == InputMode::Normal
            && last_refresh.elapsed() >= refresh_interval
        {
            app.refresh();
            last_refresh = Instant::now();
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.shutdown();
        return;
    }

    match app.input_mode {
        InputMode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter)
                || key.code == KeyCode::Char(app.config.keybindings.help)
            {
                app.input_mode = InputMode::Normal;
            }
        }
        InputMode::Menu => handle_menu_key(app, key),
        InputMode::SprintSelect => handle_sprint_select_key(app, key),
        InputMode::Normal => {
            app.clear_status();
            if app.current_route().is_some() {
                handle_detail_key(app, key);
            } else {
                handle_board_key(app, key);
            }
        }
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    let k = app.config.keybindings.clone();
    match key.code {
        KeyCode::Esc => app.close_menu(),
        KeyCode::Char(c) if c == k.menu => app.close_menu(),
        KeyCode::Down => app.menu_next(),
        KeyCode::Up => app.menu_prev(),
        KeyCode::Char(c) if c == k.down => app.menu_next(),
        KeyCode::Char(c) if c == k.up => app.menu_prev(),
        KeyCode::Enter => {
            let entry = app.selected_menu_entry().unwrap_or(MenuEntry::Refresh);
            app.activate_menu_entry(entry);
        }
        _ => {}
    }
}

fn handle_sprint_select_key(app: &mut App, key: KeyEvent) {
    let k = app.config.keybindings.clone();
    let max = app.visited_sprints().len();
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Down => app.dropdown_next(max),
        KeyCode::Up => app.dropdown_prev(max),
        KeyCode::Char(c) if c == k.down => app.dropdown_next(max),
        KeyCode::Char(c) if c == k.up => app.dropdown_prev(max),
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            if let Some(idx) = app.dropdown_list_state.selected() {
                app.select_sprint(idx);
            }
        }
        _ => {}
    }
}

fn handle_detail_key(app: &mut App, key: KeyEvent) {
    let k = app.config.keybindings.clone();
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => {
            app.go_back();
        }
        KeyCode::Down => app.scroll_detail_down(),
        KeyCode::Up => app.scroll_detail_up(),
        KeyCode::Char(c) if c == k.down => app.scroll_detail_down(),
        KeyCode::Char(c) if c == k.up => app.scroll_detail_up(),
        KeyCode::Char(c) if c == k.left => {
            app.go_back();
        }
        KeyCode::Char(c) => handle_common_key(app, c),
        _ => {}
    }
}

fn handle_board_key(app: &mut App, key: KeyEvent) {
    let k = app.config.keybindings.clone();
    match key.code {
        KeyCode::Down => app.row_next(),
        KeyCode::Up => app.row_prev(),
        KeyCode::Left => app.column_prev(),
        KeyCode::Right => app.column_next(),
        KeyCode::Enter => app.open_selected_issue(),
        KeyCode::Char(' ') => app.toggle_selected_row(),
        KeyCode::Char(c) if c == k.down => app.row_next(),
        KeyCode::Char(c) if c == k.up => app.row_prev(),
        KeyCode::Char(c) if c == k.left => app.column_prev(),
        KeyCode::Char(c) if c == k.right => app.column_next(),
        KeyCode::Char(c) if c == k.next_card => app.card_next(),
        KeyCode::Char(c) if c == k.prev_card => app.card_prev(),
        KeyCode::Char(c) if c == k.collapse => app.toggle_selected_row(),
        KeyCode::Char(c) if c == k.refresh => app.refresh(),
        KeyCode::Char(c) if c == k.menu => app.open_menu(),
        KeyCode::Char(c) if c == k.select_sprint => app.open_sprint_select(),
        KeyCode::Char(c) => handle_common_key(app, c),
        _ => {}
    }
}

/// Keys shared by the board and the detail screen
fn handle_common_key(app: &mut App, c: char) {
    let k = app.config.keybindings.clone();
    if c == k.quit {
        app.shutdown();
    } else if c == k.help {
        app.input_mode = InputMode::Help;
    } else if c == k.open {
        open_in_browser(app);
    } else if c == k.copy_id {
        copy_issue_id(app);
    }
}

fn open_in_browser(app: &mut App) {
    let Some(url) = app.focused_issue_url() else {
        app.set_status("No issue selected");
        return;
    };
    match open::that(&url) {
        Ok(()) => app.set_status(format!("Opened {url}")),
        Err(e) => app.notify_error("Could not open browser", &anyhow::Error::new(e)),
    }
}

fn copy_issue_id(app: &mut App) {
    let Some(id) = app.focused_issue().map(|i| i.id_readable.clone()) else {
        app.set_status("No issue selected");
        return;
    };
    let result = Clipboard::new().and_then(|mut clipboard| clipboard.set_text(id.clone()));
    match result {
        Ok(()) => app.set_status(format!("Copied {id}")),
        Err(e) => app.notify_error("Could not copy", &anyhow::Error::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_quit_key_shuts_down() {
        let mut app = App::new(Config::default(), None);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
        assert!(app.is_shut_down());
    }

    #[test]
    fn test_help_toggles() {
        let mut app = App::new(Config::default(), None);
        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.input_mode, InputMode::Help);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_menu_quit_entry() {
        let mut app = App::new(Config::default(), None);
        press(&mut app, KeyCode::Char('m'));
        assert!(app.menu_open());
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        assert!(!app.menu_open());
        assert!(app.should_quit);
    }

    #[test]
    fn test_menu_escape_closes() {
        let mut app = App::new(Config::default(), None);
        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_any_mode() {
        let mut app = App::new(Config::default(), None);
        press(&mut app, KeyCode::Char('?'));
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
