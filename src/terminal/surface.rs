// ABOUTME: Terminal surface for exec sessions: vt100 parsing, scrollback,
// and rendering of the session's output stream into the TUI

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Widget, Wrap},
};
use std::collections::VecDeque;
use tokio::sync::mpsc;

const MAX_SCROLLBACK: usize = 10_000;

/// Render target for one session's inbound bytes.
///
/// Feeds everything through a vt100 parser so ANSI sequences from the
/// remote shell come out styled. Owned exclusively by the window hosting
/// the session; never shared.
pub struct TerminalSurface {
    parser: vt100::Parser,
    output_rx: Option<mpsc::UnboundedReceiver<String>>,
    scrollback: VecDeque<String>,
    scroll_offset: usize,
    cols: u16,
    rows: u16,
}

impl TerminalSurface {
    pub fn new(cols: u16, rows: u16, output_rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            parser: vt100::Parser::new(rows, cols, 0),
            output_rx: Some(output_rx),
            scrollback: VecDeque::new(),
            scroll_offset: 0,
            cols,
            rows,
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Pull everything the session has produced since the last draw tick
    /// into the parser. Non-blocking; called once per frame.
    pub fn drain(&mut self) {
        let Some(rx) = self.output_rx.as_mut() else {
            return;
        };
        let mut chunks = Vec::new();
        while let Ok(text) = rx.try_recv() {
            chunks.push(text);
        }
        for text in chunks {
            self.process(&text);
        }
    }

    /// Feed text directly into the parser.
    pub fn process(&mut self, data: &str) {
        self.parser.process(data.as_bytes());

        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        for row in 0..rows {
            let mut line = String::new();
            for col in 0..cols {
                if let Some(cell) = screen.cell(row, col) {
                    line.push_str(&cell.contents());
                }
            }
            if !line.trim_end().is_empty() {
                self.scrollback.push_back(line);
                while self.scrollback.len() > MAX_SCROLLBACK {
                    self.scrollback.pop_front();
                }
            }
        }

        // New output snaps the view back to the live screen.
        self.scroll_offset = 0;
    }

    /// Resize the emulator to match the hosting window. The caller is
    /// responsible for telling the session via `notify_resize`.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.parser.set_size(rows, cols);
    }

    pub fn scroll_up(&mut self, n: usize) {
        let max_scroll = self.scrollback.len().saturating_sub(self.rows as usize);
        self.scroll_offset = (self.scroll_offset + n).min(max_scroll);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_offset == 0
    }

    /// Plain-text contents of the live screen.
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    fn screen_to_text(&self) -> Text<'static> {
        if self.scroll_offset > 0 {
            let total = self.scrollback.len();
            let start = total.saturating_sub(self.rows as usize + self.scroll_offset);
            let end = (start + self.rows as usize).min(total);
            return Text::from(
                self.scrollback
                    .range(start..end)
                    .map(|line| Line::from(line.clone()))
                    .collect::<Vec<_>>(),
            );
        }

        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        let mut lines = Vec::with_capacity(rows as usize);
        for row in 0..rows {
            let mut spans = Vec::new();
            let mut current_style = Style::default();
            let mut current_text = String::new();
            for col in 0..cols {
                if let Some(cell) = screen.cell(row, col) {
                    let cell_style = cell_to_style(&cell);
                    if cell_style != current_style && !current_text.is_empty() {
                        spans.push(Span::styled(current_text.clone(), current_style));
                        current_text.clear();
                    }
                    current_style = cell_style;
                    current_text.push_str(&cell.contents());
                } else {
                    current_text.push(' ');
                }
            }
            if !current_text.is_empty() {
                spans.push(Span::styled(current_text, current_style));
            }
            lines.push(Line::from(spans));
        }
        Text::from(lines)
    }

    /// Draw the surface into `area`, cursor included when at the bottom.
    pub fn render_into(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.screen_to_text())
            .wrap(Wrap { trim: false })
            .render(area, buf);

        let screen = self.parser.screen();
        if !screen.hide_cursor() && self.is_at_bottom() && area.width > 0 && area.height > 0 {
            let (cursor_row, cursor_col) = screen.cursor_position();
            let x = area.left() + cursor_col.min(area.width - 1);
            let y = area.top() + cursor_row.min(area.height - 1);
            if x < area.right() && y < area.bottom() {
                buf.get_mut(x, y)
                    .set_style(Style::default().add_modifier(Modifier::REVERSED));
            }
        }
    }
}

fn cell_to_style(cell: &vt100::Cell) -> Style {
    let mut style = Style::default();

    style = match cell.fgcolor() {
        vt100::Color::Default => style,
        vt100::Color::Idx(n) => style.fg(ansi_color(n)),
        vt100::Color::Rgb(r, g, b) => style.fg(Color::Rgb(r, g, b)),
    };
    style = match cell.bgcolor() {
        vt100::Color::Default => style,
        vt100::Color::Idx(n) => style.bg(ansi_color(n)),
        vt100::Color::Rgb(r, g, b) => style.bg(Color::Rgb(r, g, b)),
    };

    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }

    style
}

fn ansi_color(idx: u8) -> Color {
    match idx {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        7 => Color::Gray,
        8 => Color::DarkGray,
        9 => Color::LightRed,
        10 => Color::LightGreen,
        11 => Color::LightYellow,
        12 => Color::LightBlue,
        13 => Color::LightMagenta,
        14 => Color::LightCyan,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> TerminalSurface {
        let (_tx, rx) = mpsc::unbounded_channel();
        TerminalSurface::new(80, 24, rx)
    }

    #[test]
    fn plain_output_reaches_the_screen() {
        let mut s = surface();
        s.process("hello\r\n");
        assert!(s.contents().contains("hello"));
    }

    #[test]
    fn ansi_sequences_are_consumed_not_displayed() {
        let mut s = surface();
        s.process("\x1b[31mred\x1b[0m\r\n");
        let contents = s.contents();
        assert!(contents.contains("red"));
        assert!(!contents.contains('\x1b'));
    }

    #[test]
    fn drain_pulls_queued_chunks_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut s = TerminalSurface::new(80, 24, rx);
        tx.send("one ".to_string()).unwrap();
        tx.send("two".to_string()).unwrap();
        s.drain();
        assert!(s.contents().contains("one two"));
    }

    #[test]
    fn resize_changes_parser_geometry() {
        let mut s = surface();
        s.resize(120, 40);
        assert_eq!(s.size(), (120, 40));
    }
}
