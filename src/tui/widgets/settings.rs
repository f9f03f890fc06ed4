// API key settings overlay.
//
// Three masked fields, one per provider. Saving writes the non-blank fields
// to config/credentials.toml; blank fields keep whatever key is stored.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;
use crate::tui::SettingsForm;

const DIALOG_WIDTH: u16 = 56;
const DIALOG_HEIGHT: u16 = 9;

pub fn render(frame: &mut Frame, area: Rect, form: &SettingsForm) {
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " API Keys ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![Line::from(Span::styled(
        " Blank fields keep the saved key.",
        Style::default().fg(Color::DarkGray),
    ))];
    lines.push(Line::from(""));
    for (i, label) in SettingsForm::LABELS.iter().enumerate() {
        let focused = i == form.focused;
        let marker = if focused { ">" } else { " " };
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let mut spans = vec![
            Span::styled(format!("{marker} {label:<10}"), label_style),
            Span::raw(mask(form.field(i))),
        ];
        if focused {
            spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Enter: save  Tab: next  Esc: cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Hide a key, showing only its last four characters.
pub fn mask(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat((count - 4).min(20)), tail)
}
