// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +------------------------+-------------------------+
// | Board (12 rows)        | AI Reasoning            |
// +------------------------+                         |
// | Moves                  |                         |
// +------------------------+-------------------------+
// | Move Input (3 rows)                               |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Width of the board column: 8 squares of 3 cells, rank labels, borders.
pub const BOARD_COLUMN_WIDTH: u16 = 30;
/// Height of the board panel: 8 ranks, file labels, borders.
pub const BOARD_HEIGHT: u16 = 11;

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: game status, side to move, opponent model.
    pub status_bar: Rect,
    pub board: Rect,
    /// Below the board: numbered move list.
    pub move_list: Rect,
    /// Right of the board: streamed model output.
    pub ai_panel: Rect,
    /// Move entry line and notices.
    pub input: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the screen layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: status(1) | middle(fill) | input(3) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(BOARD_HEIGHT),
            Constraint::Length(3), // move input
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let status_bar = vertical[0];
    let middle = vertical[1];
    let input = vertical[2];
    let help_bar = vertical[3];

    // Horizontal: board column (fixed) | ai panel (fill)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(BOARD_COLUMN_WIDTH), Constraint::Min(20)])
        .split(middle);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(BOARD_HEIGHT), Constraint::Min(0)])
        .split(horizontal[0]);

    AppLayout {
        status_bar,
        board: left[0],
        move_list: left[1],
        ai_panel: horizontal[1],
        input,
        help_bar,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
