// Move list widget: numbered SAN pairs, newest at the bottom.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        "Moves",
        Style::default().add_modifier(Modifier::BOLD),
    ));

    let rows = state
        .snapshot
        .as_ref()
        .map(|s| numbered_rows(&s.moves))
        .unwrap_or_default();

    let inner_height = area.height.saturating_sub(2) as usize;
    let skip = rows.len().saturating_sub(inner_height);

    let lines: Vec<Line> = if rows.is_empty() {
        vec![Line::from(Span::styled(
            "No moves yet",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        rows.into_iter().skip(skip).map(Line::from).collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// "1. e4 e5" style rows, one per full move.
pub fn numbered_rows(moves: &[String]) -> Vec<String> {
    moves
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| match pair {
            [white, black] => format!("{:>3}. {:<8}{}", i + 1, white, black),
            [white] => format!("{:>3}. {}", i + 1, white),
            _ => String::new(),
        })
        .collect()
}
