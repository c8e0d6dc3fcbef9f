// ABOUTME: Process-wide UI state: container listing, open terminal windows,
// toasts. Mutated only by the UI event loop; windows never share a session

use crate::app::toast::Toast;
use crate::models::ContainerInfo;
use crate::terminal::{SessionHandle, SessionState, TerminalBridge, TerminalSurface};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Containers,
    Help,
}

/// Cosmetic window presentation. None of this touches the session or its
/// transport; minimizing or moving a window changes pixels only.
#[derive(Debug, Clone)]
pub struct WindowChrome {
    pub minimized: bool,
    pub maximized: bool,
    pub position: (u16, u16),
    pub size: (u16, u16),
    restore_bounds: Option<((u16, u16), (u16, u16))>,
}

impl WindowChrome {
    pub fn centered(screen: (u16, u16)) -> Self {
        let width = (u32::from(screen.0) * 3 / 4).min(110) as u16;
        let height = (u32::from(screen.1) * 3 / 4).min(40) as u16;
        let x = screen.0.saturating_sub(width) / 2;
        let y = screen.1.saturating_sub(height) / 2;
        Self {
            minimized: false,
            maximized: false,
            position: (x, y),
            size: (width.max(20), height.max(6)),
            restore_bounds: None,
        }
    }

    pub fn minimize(&mut self) {
        self.minimized = true;
    }

    pub fn restore(&mut self) {
        self.minimized = false;
    }

    pub fn toggle_maximize(&mut self, screen: (u16, u16)) {
        if self.maximized {
            if let Some((position, size)) = self.restore_bounds.take() {
                self.position = position;
                self.size = size;
            }
            self.maximized = false;
        } else {
            self.restore_bounds = Some((self.position, self.size));
            self.position = (0, 0);
            self.size = screen;
            self.maximized = true;
        }
    }
}

/// One open terminal window: session handle, its rendering surface, and
/// the chrome hosting both.
pub struct TerminalWindow {
    pub handle: SessionHandle,
    pub surface: TerminalSurface,
    pub chrome: WindowChrome,
}

impl TerminalWindow {
    pub fn new(mut handle: SessionHandle, chrome: WindowChrome) -> Self {
        let cols = chrome.size.0.saturating_sub(2).max(10);
        let rows = chrome.size.1.saturating_sub(2).max(3);
        // Fresh handles always still carry their output receiver.
        let output = handle
            .take_output()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);
        let surface = TerminalSurface::new(cols, rows, output);
        handle.notify_resize(cols, rows);
        Self {
            handle,
            surface,
            chrome,
        }
    }

    pub fn title(&self) -> String {
        let label = self.handle.label();
        if label.is_empty() {
            format!("[Terminal] {}", self.handle.id())
        } else {
            format!("[Terminal] {} ({})", self.handle.id(), label)
        }
    }

    pub fn is_live(&self) -> bool {
        self.handle.state().is_live()
    }

    /// Resize chrome and surface together and tell the remote process.
    pub fn apply_geometry(&mut self, cols: u16, rows: u16) {
        self.surface.resize(cols, rows);
        self.handle.notify_resize(cols, rows);
    }
}

pub struct AppState {
    pub view: View,
    pub containers: Vec<ContainerInfo>,
    pub selected_row: Option<usize>,
    pub windows: Vec<TerminalWindow>,
    /// Index into `windows` when keystrokes are routed to a terminal.
    pub focused_window: Option<usize>,
    pub toasts: Vec<Toast>,
    pub should_quit: bool,
    pub loading: bool,
    /// Set by the event handler, drained by the main loop.
    pub refresh_requested: bool,
    pub screen: (u16, u16),
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            view: View::Containers,
            containers: Vec::new(),
            selected_row: None,
            windows: Vec::new(),
            focused_window: None,
            toasts: Vec::new(),
            should_quit: false,
            loading: false,
            refresh_requested: true,
            screen: (80, 24),
        }
    }
}

impl AppState {
    /// Flattened (pod, container, label) rows for the listing; one row per
    /// container within each pod.
    pub fn container_rows(&self) -> Vec<(String, String, String)> {
        let mut rows = Vec::new();
        for info in &self.containers {
            for name in &info.container_names {
                rows.push((
                    info.pod_name.clone(),
                    name.clone(),
                    info.display_label().to_string(),
                ));
            }
        }
        rows
    }

    pub fn select_next(&mut self) {
        let len = self.container_rows().len();
        if len == 0 {
            self.selected_row = None;
            return;
        }
        self.selected_row = Some(match self.selected_row {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        });
    }

    pub fn select_prev(&mut self) {
        if self.container_rows().is_empty() {
            self.selected_row = None;
            return;
        }
        self.selected_row = Some(self.selected_row.map_or(0, |i| i.saturating_sub(1)));
    }

    /// Open a terminal for the selected container row. A second terminal
    /// for the same identity is a fresh, independent session.
    pub fn open_selected_terminal(&mut self, bridge: &TerminalBridge) {
        let rows = self.container_rows();
        let Some((pod, container, label)) = self.selected_row.and_then(|i| rows.get(i).cloned())
        else {
            return;
        };
        match bridge.open(&pod, &container, &label) {
            Some(handle) => {
                info!(pod, container, "opened exec terminal");
                let chrome = WindowChrome::centered(self.screen);
                self.windows.push(TerminalWindow::new(handle, chrome));
                self.focused_window = Some(self.windows.len() - 1);
            }
            None => {
                self.toasts
                    .push(Toast::error("container has no usable identifiers"));
            }
        }
    }

    /// Close the focused window: asks the session to shut down and drops
    /// the chrome. Safe when the session is already dead.
    pub fn close_focused_window(&mut self) {
        let Some(i) = self.focused_window.filter(|&i| i < self.windows.len()) else {
            return;
        };
        let window = self.windows.remove(i);
        window.handle.close();
        self.focused_window = if self.windows.is_empty() {
            None
        } else {
            Some(i.min(self.windows.len() - 1))
        };
    }

    pub fn minimize_focused_window(&mut self) {
        if let Some(window) = self.focused_window.and_then(|i| self.windows.get_mut(i)) {
            window.chrome.minimize();
        }
        self.focused_window = None;
    }

    pub fn toggle_maximize_focused_window(&mut self) {
        let screen = self.screen;
        if let Some(window) = self.focused_window.and_then(|i| self.windows.get_mut(i)) {
            window.chrome.toggle_maximize(screen);
            let (w, h) = window.chrome.size;
            window.apply_geometry(w.saturating_sub(2).max(10), h.saturating_sub(2).max(3));
        }
    }

    /// Cycle focus across non-minimized windows, restoring the next
    /// minimized one when nothing else is open.
    pub fn focus_next_window(&mut self) {
        if self.windows.is_empty() {
            self.focused_window = None;
            return;
        }
        let start = self.focused_window.map_or(0, |i| (i + 1) % self.windows.len());
        self.focused_window = Some(start);
        if let Some(window) = self.windows.get_mut(start) {
            window.chrome.restore();
        }
    }

    pub fn push_toast(&mut self, toast: Toast) {
        self.toasts.push(toast);
    }

    pub fn prune_expired_toasts(&mut self) {
        self.toasts.retain(|t| !t.is_expired());
    }

    /// Count of sessions whose transport is still up, for the status line.
    pub fn live_session_count(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| w.handle.state() == SessionState::Connected)
            .count()
    }
}
