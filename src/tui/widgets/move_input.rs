// Move input widget: the line the player types moves into, doubling as a
// notice line for illegal moves and AI results.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::{InputMode, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let editing = state.mode == InputMode::MoveEntry;

    let border_style = if editing {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled("Your move", Style::default().add_modifier(Modifier::BOLD)))
        .border_style(border_style);

    let line = if editing {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(state.move_input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])
    } else if let Some(notice) = &state.notice {
        Line::from(Span::styled(notice.clone(), Style::default().fg(Color::Yellow)))
    } else {
        Line::from(Span::styled(
            "Press m to enter a move",
            Style::default().fg(Color::DarkGray),
        ))
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
}
