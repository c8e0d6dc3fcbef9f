// ABOUTME: Keyboard event handling: list navigation in browse mode, raw
// keystroke forwarding when a terminal window holds focus

use crate::app::state::{AppState, View};
use crate::terminal::TerminalBridge;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    SelectNext,
    SelectPrev,
    OpenTerminal,
    RefreshContainers,
    CloseWindow,
    MinimizeWindow,
    ToggleMaximize,
    FocusNextWindow,
    LeaveTerminalFocus,
    TerminalInput(String),
    ShowHelp,
    Back,
}

pub struct EventHandler;

impl EventHandler {
    /// Map a key press to an application event, given the current focus.
    pub fn handle_key_event(key: KeyEvent, state: &AppState) -> Option<AppEvent> {
        if state.focused_window.is_some() {
            return Self::handle_terminal_key(key);
        }
        match state.view {
            View::Help => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Back),
                _ => None,
            },
            View::Containers => Self::handle_browse_key(key),
        }
    }

    fn handle_browse_key(key: KeyEvent) -> Option<AppEvent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(AppEvent::Quit);
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppEvent::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(AppEvent::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(AppEvent::SelectPrev),
            KeyCode::Enter => Some(AppEvent::OpenTerminal),
            KeyCode::Char('r') => Some(AppEvent::RefreshContainers),
            KeyCode::Tab => Some(AppEvent::FocusNextWindow),
            KeyCode::Char('?') => Some(AppEvent::ShowHelp),
            _ => None,
        }
    }

    /// With a terminal focused, almost everything is session input. The
    /// window chrome keeps a few chords for itself.
    fn handle_terminal_key(key: KeyEvent) -> Option<AppEvent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => return Some(AppEvent::LeaveTerminalFocus),
                KeyCode::Char('w') => return Some(AppEvent::CloseWindow),
                KeyCode::Char('n') => return Some(AppEvent::MinimizeWindow),
                KeyCode::Char('f') => return Some(AppEvent::ToggleMaximize),
                _ => {}
            }
        }
        key_to_input(key).map(AppEvent::TerminalInput)
    }

    pub fn process_event(event: AppEvent, state: &mut AppState, bridge: &TerminalBridge) {
        match event {
            AppEvent::Quit => state.should_quit = true,
            AppEvent::SelectNext => state.select_next(),
            AppEvent::SelectPrev => state.select_prev(),
            AppEvent::OpenTerminal => state.open_selected_terminal(bridge),
            AppEvent::RefreshContainers => state.refresh_requested = true,
            AppEvent::CloseWindow => state.close_focused_window(),
            AppEvent::MinimizeWindow => state.minimize_focused_window(),
            AppEvent::ToggleMaximize => state.toggle_maximize_focused_window(),
            AppEvent::FocusNextWindow => state.focus_next_window(),
            AppEvent::LeaveTerminalFocus => state.focused_window = None,
            AppEvent::TerminalInput(data) => {
                if let Some(window) = state.focused_window.and_then(|i| state.windows.get(i)) {
                    window.handle.send_input(data);
                }
            }
            AppEvent::ShowHelp => state.view = View::Help,
            AppEvent::Back => state.view = View::Containers,
        }
    }
}

/// Translate a key press into the byte sequence a PTY expects. Unmappable
/// keys produce nothing.
pub fn key_to_input(key: KeyEvent) -> Option<String> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(c) = key.code {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() {
                let ctrl = (c as u8 - b'a' + 1) as char;
                return Some(ctrl.to_string());
            }
        }
        return None;
    }

    match key.code {
        KeyCode::Char(c) => Some(c.to_string()),
        KeyCode::Enter => Some("\r".to_string()),
        KeyCode::Backspace => Some("\x7f".to_string()),
        KeyCode::Tab => Some("\t".to_string()),
        KeyCode::Esc => Some("\x1b".to_string()),
        KeyCode::Up => Some("\x1b[A".to_string()),
        KeyCode::Down => Some("\x1b[B".to_string()),
        KeyCode::Right => Some("\x1b[C".to_string()),
        KeyCode::Left => Some("\x1b[D".to_string()),
        KeyCode::Home => Some("\x1b[H".to_string()),
        KeyCode::End => Some("\x1b[F".to_string()),
        KeyCode::PageUp => Some("\x1b[5~".to_string()),
        KeyCode::PageDown => Some("\x1b[6~".to_string()),
        KeyCode::Delete => Some("\x1b[3~".to_string()),
        _ => None,
    }
}
