// Quit confirmation overlay.
//
// Asks before leaving and says what is lost: the game lives only in memory,
// so an unfinished game cannot be resumed.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;
use crate::protocol::LlmStatus;
use crate::tui::ViewState;

const DIALOG_WIDTH: u16 = 44;
const DIALOG_HEIGHT: u16 = 6;

/// Render the quit confirmation overlay centered on the screen.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Leave the game? ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![Line::from(vec![
        Span::raw(" Really quit? ("),
        Span::styled("y", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw("/"),
        Span::styled("n", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(")"),
    ])];
    lines.extend(
        game_summary(state)
            .into_iter()
            .map(|text| Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))),
    );

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// What quitting now would abandon.
pub fn game_summary(state: &ViewState) -> Vec<String> {
    let Some(snapshot) = &state.snapshot else {
        return Vec::new();
    };
    if snapshot.game_over {
        return vec![format!(" {}", snapshot.status_text)];
    }
    let mut lines = Vec::new();
    match snapshot.moves.len() {
        0 => lines.push(" No moves played yet.".to_string()),
        1 => lines.push(" 1 half-move will be lost.".to_string()),
        n => lines.push(format!(" {n} half-moves will be lost.")),
    }
    if state.ai_status == LlmStatus::Thinking {
        lines.push(format!(" {} is still thinking.", snapshot.model));
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
