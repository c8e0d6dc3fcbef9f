// ABOUTME: Floating terminal window chrome: title bar, state badge, and
// the session surface rendered inside

use crate::app::TerminalWindow;
use crate::terminal::SessionState;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Widget},
    Frame,
};

fn state_badge(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle | SessionState::Connecting => "connecting",
        SessionState::Connected => "live",
        SessionState::Closing => "closing",
        SessionState::Closed => "closed",
    }
}

/// Clamp the chrome's position and size to the visible screen.
fn window_rect(window: &TerminalWindow, screen: Rect) -> Rect {
    let (x, y) = window.chrome.position;
    let (w, h) = window.chrome.size;
    let x = x.min(screen.width.saturating_sub(10));
    let y = y.min(screen.height.saturating_sub(3));
    Rect {
        x,
        y,
        width: w.clamp(10, screen.width - x),
        height: h.clamp(3, screen.height - y),
    }
}

pub fn render(frame: &mut Frame, window: &TerminalWindow, focused: bool) {
    if window.chrome.minimized || frame.size().width < 12 || frame.size().height < 4 {
        return;
    }

    let area = window_rect(window, frame.size());
    frame.render_widget(Clear, area);

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    let title = format!(
        " {} [{}] ",
        window.title(),
        state_badge(window.handle.state())
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    window.surface.render_into(inner, frame.buffer_mut());
}

/// Minimized windows collapse into small badges along the bottom edge.
pub fn render_minimized_badges(frame: &mut Frame, windows: &[TerminalWindow]) {
    let screen = frame.size();
    let mut x = screen.right().saturating_sub(2);
    for window in windows.iter().rev().filter(|w| w.chrome.minimized) {
        let label = format!(" {} ", window.handle.id().pod);
        let width = label.len() as u16;
        if x < width + 1 {
            break;
        }
        x -= width + 1;
        let area = Rect {
            x,
            y: screen.bottom().saturating_sub(1),
            width,
            height: 1,
        };
        let buf = frame.buffer_mut();
        for (i, ch) in label.chars().enumerate() {
            buf.get_mut(area.x + i as u16, area.y)
                .set_symbol(&ch.to_string())
                .set_style(Style::default().fg(Color::Black).bg(Color::Gray));
        }
    }
}
