use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub fn draw_popup(f: &mut Frame, app: &App, area: Rect) {
    let k = &app.config.keybindings;
    let help_text = format!(
        r#"
BOARD
  {down}/{up} ↑/↓       Move between rows
  {left}/{right} ←/→       Move between columns
  {next}/{prev}           Next/previous card
  Enter         Open issue
  {collapse} / Space     Collapse/expand row

ISSUE
  {open}             Open in browser
  {copy}             Copy issue ID
  j/k           Scroll
  Esc           Back to board

GENERAL
  {menu}             Menu
  {sprint}             Select sprint
  {refresh}             Refresh board
  {help}             Toggle help
  {quit}             Quit
"#,
        down = k.down,
        up = k.up,
        left = k.left,
        right = k.right,
        next = k.next_card,
        prev = k.prev_card,
        collapse = k.collapse,
        open = k.open,
        copy = k.copy_id,
        menu = k.menu,
        sprint = k.select_sprint,
        refresh = k.refresh,
        help = k.help,
        quit = k.quit,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help - Press ? or Esc to close ");

    let inner = super::centered_rect(50, 26, area);
    f.render_widget(Clear, inner);

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, inner);
}
