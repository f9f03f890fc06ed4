// Board widget: 8x8 grid with unicode pieces and the last move highlighted.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use shakmaty::{Board, File, Piece, Rank, Role, Square};

use crate::tui::ViewState;

const LIGHT_SQUARE: Color = Color::Rgb(240, 217, 181);
const DARK_SQUARE: Color = Color::Rgb(181, 136, 99);
const LIGHT_HIGHLIGHT: Color = Color::Rgb(205, 210, 106);
const DARK_HIGHLIGHT: Color = Color::Rgb(170, 162, 58);

/// Render the board into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        "Board",
        Style::default().add_modifier(Modifier::BOLD),
    ));

    let lines = match &state.snapshot {
        Some(snapshot) => board_lines(&snapshot.board, snapshot.last_move, state.black_at_bottom()),
        None => vec![Line::from("No game yet")],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Rows of the board from the viewer's side, with rank and file labels.
pub fn board_lines(
    board: &Board,
    last_move: Option<(Square, Square)>,
    black_at_bottom: bool,
) -> Vec<Line<'static>> {
    let ranks: Vec<Rank> = if black_at_bottom {
        Rank::ALL.to_vec()
    } else {
        Rank::ALL.iter().rev().copied().collect()
    };
    let files: Vec<File> = if black_at_bottom {
        File::ALL.iter().rev().copied().collect()
    } else {
        File::ALL.to_vec()
    };

    let mut lines = Vec::with_capacity(9);
    for &rank in &ranks {
        let mut spans = vec![Span::styled(
            format!("{} ", rank.char()),
            Style::default().fg(Color::Gray),
        )];
        for &file in &files {
            let square = Square::from_coords(file, rank);
            let highlighted = last_move.is_some_and(|(from, to)| square == from || square == to);
            let bg = match (square.is_light(), highlighted) {
                (true, false) => LIGHT_SQUARE,
                (false, false) => DARK_SQUARE,
                (true, true) => LIGHT_HIGHLIGHT,
                (false, true) => DARK_HIGHLIGHT,
            };
            let (text, style) = match board.piece_at(square) {
                Some(piece) => (
                    format!(" {} ", piece_glyph(piece)),
                    Style::default().bg(bg).fg(Color::Black).add_modifier(Modifier::BOLD),
                ),
                None => ("   ".to_string(), Style::default().bg(bg)),
            };
            spans.push(Span::styled(text, style));
        }
        lines.push(Line::from(spans));
    }

    let file_labels: String = files.iter().map(|f| format!(" {} ", f.char())).collect();
    lines.push(Line::from(Span::styled(
        format!("  {file_labels}"),
        Style::default().fg(Color::Gray),
    )));
    lines
}

/// Unicode chess symbol for a piece.
pub fn piece_glyph(piece: Piece) -> char {
    match (piece.color, piece.role) {
        (shakmaty::Color::White, Role::King) => '♔',
        (shakmaty::Color::White, Role::Queen) => '♕',
        (shakmaty::Color::White, Role::Rook) => '♖',
        (shakmaty::Color::White, Role::Bishop) => '♗',
        (shakmaty::Color::White, Role::Knight) => '♘',
        (shakmaty::Color::White, Role::Pawn) => '♙',
        (shakmaty::Color::Black, Role::King) => '♚',
        (shakmaty::Color::Black, Role::Queen) => '♛',
        (shakmaty::Color::Black, Role::Rook) => '♜',
        (shakmaty::Color::Black, Role::Bishop) => '♝',
        (shakmaty::Color::Black, Role::Knight) => '♞',
        (shakmaty::Color::Black, Role::Pawn) => '♟',
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
