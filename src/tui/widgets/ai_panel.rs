// AI panel widget: streams the model's answer for the current position.
//
// Header: "AI Reasoning -- idle/thinking.../moved/error"
// Body: raw streamed text while thinking, parsed reasoning once the move is
// played, or the error that halted play.
// Auto-scroll to bottom while streaming

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::protocol::LlmStatus;
use crate::tui::ViewState;

/// Render the AI panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let title_line = build_title(state.ai_status);

    let mut content = if state.reasoning_text.is_empty() {
        placeholder_text(state.ai_status).to_string()
    } else {
        state.reasoning_text.clone()
    };
    if let Some(error) = &state.ai_error {
        content.push_str("\n\n");
        content.push_str(error);
        content.push_str("\nPress r to ask again, u to undo.");
    }

    // Approximate wrapped height so the tail stays visible while streaming
    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let line_count: usize = content
        .lines()
        .map(|l| l.chars().count().max(1).div_ceil(inner_width))
        .sum();
    let scroll = if state.ai_status == LlmStatus::Thinking && line_count > inner_height {
        (line_count - inner_height) as u16
    } else {
        0
    };

    let paragraph = Paragraph::new(content)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title_line)
                .border_style(border_style(state.ai_status)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

/// Build the title line with status indicator.
fn build_title(status: LlmStatus) -> Line<'static> {
    let (status_text, status_color) = status_indicator(status);
    Line::from(vec![
        Span::styled("AI Reasoning", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(" -- ", Style::default().fg(Color::DarkGray)),
        Span::styled(status_text, Style::default().fg(status_color)),
    ])
}

/// Return status text and color for the AI status.
pub fn status_indicator(status: LlmStatus) -> (&'static str, Color) {
    match status {
        LlmStatus::Idle => ("idle", Color::DarkGray),
        LlmStatus::Thinking => ("thinking...", Color::Yellow),
        LlmStatus::Complete => ("moved", Color::Green),
        LlmStatus::Error => ("error", Color::Red),
    }
}

fn border_style(status: LlmStatus) -> Style {
    match status {
        LlmStatus::Thinking => Style::default().fg(Color::Yellow),
        LlmStatus::Error => Style::default().fg(Color::Red),
        _ => Style::default(),
    }
}

fn placeholder_text(status: LlmStatus) -> &'static str {
    match status {
        LlmStatus::Idle => "Waiting for your move...",
        LlmStatus::Thinking => "Thinking...",
        LlmStatus::Complete => "(no reasoning given)",
        LlmStatus::Error => "The AI could not move.",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
