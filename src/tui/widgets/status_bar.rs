// Status bar widget: game status, AI indicator, opponent model.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::game::color_name;
use crate::tui::ViewState;

use super::ai_panel::status_indicator;

/// Render the status bar into the given area.
///
/// Layout: [status dot] [game status] | You: [side] | Model: [model]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();

    let (_, dot_color) = status_indicator(state.ai_status);
    spans.push(Span::styled(" ● ", Style::default().fg(dot_color)));

    match &state.snapshot {
        Some(snapshot) => {
            let status_style = if snapshot.game_over {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            spans.push(Span::styled(snapshot.status_text.clone(), status_style));
            spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled(
                format!("You: {}", color_name(snapshot.human_color)),
                Style::default().fg(Color::White),
            ));
            spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled("Model: ", Style::default().fg(Color::Gray)));
            spans.push(Span::styled(
                snapshot.model.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        }
        None => spans.push(Span::styled("Starting...", Style::default().fg(Color::Gray))),
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}
