// ABOUTME: Top-level frame composition: listing, floating terminal windows,
// minimized badges, toast line, status bar

use crate::app::{AppState, ToastLevel, View};
use crate::components::{container_list, help, terminal_window};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

pub fn render(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    // Toast line: newest unexpired toast wins.
    if let Some(toast) = state.toasts.last() {
        let style = match toast.level {
            ToastLevel::Error => Style::default().fg(Color::Red),
            ToastLevel::Success => Style::default().fg(Color::Green),
            ToastLevel::Info => Style::default().fg(Color::Yellow),
        };
        frame.render_widget(Paragraph::new(toast.message.clone()).style(style), chunks[0]);
    }

    match state.view {
        View::Help => help::render(frame, chunks[1]),
        View::Containers => container_list::render(frame, state, chunks[1]),
    }

    let status = format!(
        " {} container(s) | {} window(s), {} live | ? for help ",
        state.container_rows().len(),
        state.windows.len(),
        state.live_session_count(),
    );
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    // Windows draw over the listing; the focused one last, on top.
    for (i, window) in state.windows.iter().enumerate() {
        if Some(i) != state.focused_window {
            terminal_window::render(frame, window, false);
        }
    }
    if let Some(window) = state.focused_window.and_then(|i| state.windows.get(i)) {
        terminal_window::render(frame, window, true);
    }
    terminal_window::render_minimized_badges(frame, &state.windows);
}
