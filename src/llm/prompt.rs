// Prompt templates for asking a model for its next move.

use crate::game::{color_name, ChessGame};

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Static system prompt shared by every provider.
pub fn system_prompt() -> &'static str {
    "You are a chess engine. Output JSON."
}

// ---------------------------------------------------------------------------
// Move prompt
// ---------------------------------------------------------------------------

/// Build the user prompt asking for the best move in `game`'s current
/// position.
///
/// `pgn` is the game as the caller knows it (the browser sends its own
/// chess.js export); the FEN, side to move and legal moves are derived from
/// `game` so the model does not have to replay the movetext itself.
pub fn build_move_prompt(pgn: &str, game: &ChessGame) -> String {
    let side = color_name(game.turn());
    let pgn = if pgn.trim().is_empty() {
        "(no moves yet)"
    } else {
        pgn.trim()
    };

    let mut out = String::with_capacity(512);
    out.push_str("You are a chess grandmaster.\n");
    out.push_str(&format!("PGN: {pgn}\n"));
    out.push_str(&format!("FEN: {}\n", game.fen()));
    out.push_str(&format!("Side to move: {side}\n"));
    out.push_str(&format!(
        "Legal moves (UCI): {}\n",
        game.legal_moves_uci().join(" ")
    ));
    out.push_str("Analyze the position and determine the best move for the side to move.\n");
    out.push_str(
        "Return ONLY a JSON object with two keys: \"reasoning\" (string) and \
         \"move\" (string, UCI format e.g. e2e4).\n",
    );
    out
}
