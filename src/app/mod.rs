// ABOUTME: Application state and event routing for the console UI

pub mod events;
pub mod state;
pub mod toast;

pub use events::{key_to_input, AppEvent, EventHandler};
pub use state::{AppState, TerminalWindow, View, WindowChrome};
pub use toast::{Toast, ToastLevel};
