// Chess game state: move application, undo, game-end detection and the
// status line shown to the player.
//
// All rules knowledge (legal moves, check, mate, SAN) comes from shakmaty.
// `ChessGame` only keeps the move history needed for undo, repetition
// counting and PGN output.

pub mod pgn;

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Board, CastlingMode, Chess, Color, EnPassantMode, Move, Position, Role, Square};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("invalid UCI move: {0}")]
    InvalidUci(String),

    #[error("invalid SAN move: {0}")]
    InvalidSan(String),

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("game is over")]
    GameOver,

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("invalid PGN at ply {ply} (`{token}`): {reason}")]
    Pgn {
        ply: usize,
        token: String,
        reason: String,
    },
}

/// FEN of the standard starting position.
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A half-move that has been played, in both notations the UI needs.
#[derive(Debug, Clone)]
pub struct PlayedMove {
    /// SAN including check/mate suffix, e.g. `Nf3`, `exd8=Q#`.
    pub san: String,
    /// UCI with castling as king-to-destination, e.g. `e1g1`, `a7a8q`.
    pub uci: String,
    /// Side that made the move.
    pub color: Color,
    /// Origin and destination squares (king squares for castling), for
    /// last-move highlighting.
    pub from: Square,
    pub to: Square,
    /// Position before the move; restored by `undo`.
    before: Chess,
}

/// Final (or pending) result of a game in PGN notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    /// PGN result token.
    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Ongoing => "*",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable side name as used in the status line.
pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

// ---------------------------------------------------------------------------
// ChessGame
// ---------------------------------------------------------------------------

/// A game in progress from a (usually standard) starting position.
#[derive(Debug, Clone)]
pub struct ChessGame {
    start: Chess,
    position: Chess,
    history: Vec<PlayedMove>,
    /// Zobrist hash of every position reached, including the start.
    seen: Vec<Zobrist64>,
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessGame {
    /// A new game from the standard starting position.
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    /// A new game from an arbitrary FEN.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let parsed = Fen::from_ascii(fen.trim().as_bytes())
            .map_err(|e| GameError::InvalidFen(format!("{fen}: {e}")))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| GameError::InvalidFen(format!("{fen}: {e}")))?;
        Ok(Self::from_position(position))
    }

    fn from_position(position: Chess) -> Self {
        let hash = position.zobrist_hash::<Zobrist64>(EnPassantMode::Legal);
        ChessGame {
            start: position.clone(),
            position,
            history: Vec::new(),
            seen: vec![hash],
        }
    }

    /// Reset to the starting position this game was created with.
    pub fn reset(&mut self) {
        *self = Self::from_position(self.start.clone());
    }

    // -- Accessors ----------------------------------------------------------

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn board(&self) -> &Board {
        self.position.board()
    }

    pub fn history(&self) -> &[PlayedMove] {
        &self.history
    }

    pub fn last_move(&self) -> Option<&PlayedMove> {
        self.history.last()
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Whether the game started from the standard initial position.
    pub fn starts_from_initial(&self) -> bool {
        self.start_fen() == INITIAL_FEN
    }

    /// FEN of the current position.
    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// FEN of the starting position.
    pub fn start_fen(&self) -> String {
        Fen::from_position(self.start.clone(), EnPassantMode::Legal).to_string()
    }

    /// All legal moves in UCI notation, castling as king-to-destination.
    pub fn legal_moves_uci(&self) -> Vec<String> {
        let turn = self.turn();
        self.position
            .legal_moves()
            .iter()
            .map(|m| move_to_uci(m, turn))
            .collect()
    }

    // -- Game-end detection -------------------------------------------------

    pub fn is_check(&self) -> bool {
        self.position.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    pub fn is_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    /// Fifty-move rule: 100 half-moves without a capture or pawn move.
    pub fn is_fifty_moves(&self) -> bool {
        self.position.halfmoves() >= 100
    }

    /// The current position has occurred at least three times.
    pub fn is_threefold_repetition(&self) -> bool {
        let Some(current) = self.seen.last() else {
            return false;
        };
        self.seen.iter().filter(|h| *h == current).count() >= 3
    }

    pub fn is_draw(&self) -> bool {
        self.is_fifty_moves()
            || self.is_stalemate()
            || self.is_insufficient_material()
            || self.is_threefold_repetition()
    }

    pub fn is_game_over(&self) -> bool {
        self.is_checkmate() || self.is_draw()
    }

    pub fn result(&self) -> GameResult {
        if self.is_checkmate() {
            match self.turn() {
                Color::White => GameResult::BlackWins,
                Color::Black => GameResult::WhiteWins,
            }
        } else if self.is_draw() {
            GameResult::Draw
        } else {
            GameResult::Ongoing
        }
    }

    /// Status line: whose move, check, or how the game ended.
    pub fn status_text(&self) -> String {
        let side = color_name(self.turn());
        if self.is_checkmate() {
            format!("Game over, {side} is in checkmate.")
        } else if self.is_draw() {
            "Game over, drawn position".to_string()
        } else if self.is_check() {
            format!("{side} to move, {side} is in check")
        } else {
            format!("{side} to move")
        }
    }

    // -- Making moves -------------------------------------------------------

    /// Apply a move in UCI notation.
    ///
    /// Input is lower-cased first. A missing promotion letter on a pawn
    /// reaching the last rank falls back to `default_promotion`. Castling is
    /// accepted both as king-to-destination (`e1g1`) and king-takes-rook
    /// (`e1h1`).
    pub fn play_uci(&mut self, uci: &str, default_promotion: Role) -> Result<&PlayedMove, GameError> {
        let m = self.resolve_uci(uci, default_promotion)?;
        self.push(m)
    }

    /// Apply a move in SAN notation (`Nf3`, `exd5`, `O-O`, `e8=Q+`).
    pub fn play_san(&mut self, san: &str) -> Result<&PlayedMove, GameError> {
        let m = self.resolve_san(san)?;
        self.push(m)
    }

    /// Apply a move typed by a person: SAN first, then UCI.
    pub fn play_input(&mut self, input: &str, default_promotion: Role) -> Result<&PlayedMove, GameError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GameError::InvalidSan(String::new()));
        }
        if let Ok(m) = self.resolve_san(input) {
            return self.push(m);
        }
        let m = self
            .resolve_uci(input, default_promotion)
            .map_err(|e| match e {
                GameError::InvalidUci(_) => GameError::IllegalMove(input.to_string()),
                other => other,
            })?;
        self.push(m)
    }

    /// Take back the last half-move.
    pub fn undo(&mut self) -> Option<PlayedMove> {
        let played = self.history.pop()?;
        self.seen.pop();
        self.position = played.before.clone();
        Some(played)
    }

    fn resolve_uci(&self, uci: &str, default_promotion: Role) -> Result<Move, GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        let text = uci.trim().to_ascii_lowercase();
        if !(text.len() == 4 || text.len() == 5) || !text.is_ascii() {
            return Err(GameError::InvalidUci(uci.to_string()));
        }
        let from: Square = text[0..2]
            .parse()
            .map_err(|_| GameError::InvalidUci(uci.to_string()))?;
        let to: Square = text[2..4]
            .parse()
            .map_err(|_| GameError::InvalidUci(uci.to_string()))?;
        let promotion = match text[4..].chars().next() {
            Some(c) => Some(
                Role::from_char(c)
                    .filter(|r| matches!(r, Role::Queen | Role::Rook | Role::Bishop | Role::Knight))
                    .ok_or_else(|| GameError::InvalidUci(uci.to_string()))?,
            ),
            None => None,
        };

        let turn = self.turn();
        let legal = self.position.legal_moves();
        let matches_squares = |m: &Move| -> bool {
            if m.from() != Some(from) {
                return false;
            }
            match m.castling_side() {
                Some(side) => to == side.king_to(turn) || to == m.to(),
                None => m.to() == to,
            }
        };

        // A promotion letter only counts on a promoting move; a bare
        // promotion takes the default piece.
        let promotes = legal
            .iter()
            .any(|m| matches_squares(m) && m.promotion().is_some());
        let wanted = promotes.then(|| promotion.unwrap_or(default_promotion));

        legal
            .iter()
            .find(|m| matches_squares(m) && m.promotion() == wanted)
            .cloned()
            .ok_or_else(|| GameError::IllegalMove(uci.to_string()))
    }

    fn resolve_san(&self, san: &str) -> Result<Move, GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        let cleaned = normalize_san(san);
        let parsed: SanPlus = cleaned
            .parse()
            .map_err(|_| GameError::InvalidSan(san.to_string()))?;
        parsed
            .san
            .to_move(&self.position)
            .map_err(|_| GameError::IllegalMove(san.to_string()))
    }

    /// Play a resolved move and record it.
    fn push(&mut self, m: Move) -> Result<&PlayedMove, GameError> {
        let before = self.position.clone();
        let color = before.turn();
        let san = San::from_move(&before, &m).to_string();
        let uci = move_to_uci(&m, color);
        let (from, to) = move_squares(&m, color);

        let after = before
            .clone()
            .play(&m)
            .map_err(|_| GameError::IllegalMove(uci.clone()))?;

        let suffix = if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        };

        self.seen
            .push(after.zobrist_hash::<Zobrist64>(EnPassantMode::Legal));
        self.position = after;
        self.history.push(PlayedMove {
            san: format!("{san}{suffix}"),
            uci,
            color,
            from,
            to,
            before,
        });
        Ok(&self.history[self.history.len() - 1])
    }
}

// ---------------------------------------------------------------------------
// Notation helpers
// ---------------------------------------------------------------------------

/// UCI text for a move, castling written as king-to-destination.
pub fn move_to_uci(m: &Move, turn: Color) -> String {
    let (from, to) = move_squares(m, turn);
    match m.promotion() {
        Some(role) => format!("{from}{to}{}", role.char()),
        None => format!("{from}{to}"),
    }
}

/// Origin and destination of the moving piece (the king for castling).
fn move_squares(m: &Move, turn: Color) -> (Square, Square) {
    let to = match m.castling_side() {
        Some(side) => side.king_to(turn),
        None => m.to(),
    };
    // Only drops lack an origin square, and standard chess has none.
    let from = m.from().unwrap_or(to);
    (from, to)
}

/// Strip annotation glyphs and accept zero-castling (`0-0`).
fn normalize_san(san: &str) -> String {
    let trimmed = san.trim().trim_end_matches(['!', '?']);
    match trimmed.trim_end_matches(['+', '#']) {
        "0-0" => trimmed.replacen("0-0", "O-O", 1),
        "0-0-0" => trimmed.replacen("0-0-0", "O-O-O", 1),
        _ => trimmed.to_string(),
    }
}

/// Parse a promotion letter (`q`, `r`, `b`, `n`, either case).
pub fn promotion_role(letter: &str) -> Option<Role> {
    let mut chars = letter.trim().chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Role::from_char(c.to_ascii_lowercase())
        .filter(|r| matches!(r, Role::Queen | Role::Rook | Role::Bishop | Role::Knight))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
