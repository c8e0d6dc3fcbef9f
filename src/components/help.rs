// ABOUTME: Static key binding reference screen

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const HELP_TEXT: &str = "\
Browse mode
  j / k, arrows   move selection
  Enter           open a terminal into the selected container
  r               refresh the container list
  Tab             focus the next terminal window
  ?               this help
  q               quit

Terminal focus
  Ctrl-q          return to browse mode
  Ctrl-w          close the window (ends the session)
  Ctrl-n          minimize the window
  Ctrl-f          maximize / restore
  anything else   sent to the remote shell
";

pub fn render(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title(" Help "));
    frame.render_widget(help, area);
}
