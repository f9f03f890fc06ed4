// TUI widget modules for each screen panel.

pub mod ai_panel;
pub mod board;
pub mod move_input;
pub mod move_list;
pub mod quit_confirm;
pub mod settings;
pub mod status_bar;

use ratatui::layout::{Constraint, Flex, Layout, Rect};

/// Centered rectangle of the given size within `area`, clamped to the
/// available space. Used by the modal overlays.
pub(crate) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width);
    let clamped_height = height.min(area.height);

    let vertical = Layout::vertical([Constraint::Length(clamped_height)])
        .flex(Flex::Center)
        .split(area);

    Layout::horizontal([Constraint::Length(clamped_width)])
        .flex(Flex::Center)
        .split(vertical[0])[0]
}
