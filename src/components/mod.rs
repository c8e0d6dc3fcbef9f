// ABOUTME: Ratatui view layer; consumes session state through handles only

pub mod container_list;
pub mod help;
pub mod layout;
pub mod terminal_window;
