// ABOUTME: Table of running challenge containers, one row per container

use crate::app::AppState;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Row, Table},
    Frame,
};

pub fn render(frame: &mut Frame, state: &AppState, area: Rect) {
    let rows = state.container_rows();
    let selected = state.selected_row;

    let table_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, (pod, container, label))| {
            let style = if Some(i) == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![pod.clone(), container.clone(), label.clone()]).style(style)
        })
        .collect();

    let title = if state.loading {
        " Containers (refreshing...) "
    } else {
        " Containers "
    };

    let table = Table::new(
        table_rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ],
    )
    .header(
        Row::new(vec!["Pod", "Container", "Team"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}
