// PGN export and movetext replay.
//
// Export mirrors what chess.js produced for the browser page: bare movetext
// (`1. e4 e5 2. Nf3`) for prompts, and a full seven-tag-roster game for
// saving. Replay accepts what a browser or a model sends back: headers,
// comments, variations, NAGs and move numbers are skipped; every SAN token
// must be legal in sequence.

use chrono::NaiveDate;

use super::{ChessGame, GameError, GameResult, PlayedMove};

/// Tag values for a full PGN export. Missing values are written as `?`.
#[derive(Debug, Clone, Default)]
pub struct PgnHeaders {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<NaiveDate>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
}

/// Movetext for a move list. The result token is appended only when the
/// game is decided.
///
/// `first_fullmove` and whether the first move is Black's come from the
/// starting position, so games set up from a FEN number correctly.
pub fn movetext(history: &[PlayedMove], first_fullmove: u32, result: GameResult) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(history.len() + history.len() / 2 + 1);
    let mut fullmove = first_fullmove;

    for (i, played) in history.iter().enumerate() {
        match played.color {
            shakmaty::Color::White => {
                parts.push(format!("{fullmove}."));
                parts.push(played.san.clone());
            }
            shakmaty::Color::Black => {
                if i == 0 {
                    parts.push(format!("{fullmove}..."));
                }
                parts.push(played.san.clone());
                fullmove += 1;
            }
        }
    }

    if result != GameResult::Ongoing {
        parts.push(result.as_str().to_string());
    }

    parts.join(" ")
}

impl ChessGame {
    /// Movetext of the game so far (no headers).
    pub fn pgn_movetext(&self) -> String {
        movetext(self.history(), self.start_fullmove(), self.result())
    }

    /// Full PGN with the seven tag roster, plus SetUp/FEN when the game did
    /// not start from the initial position.
    pub fn export_pgn(&self, headers: &PgnHeaders) -> String {
        let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "?".to_string());
        let date = headers
            .date
            .map(|d| d.format("%Y.%m.%d").to_string())
            .unwrap_or_else(|| "????.??.??".to_string());

        let mut out = String::new();
        let mut tag = |name: &str, value: &str| {
            out.push_str(&format!("[{name} \"{}\"]\n", escape_tag(value)));
        };
        tag("Event", &or_unknown(&headers.event));
        tag("Site", &or_unknown(&headers.site));
        tag("Date", &date);
        tag("Round", &or_unknown(&headers.round));
        tag("White", &or_unknown(&headers.white));
        tag("Black", &or_unknown(&headers.black));
        tag("Result", self.result().as_str());
        if !self.starts_from_initial() {
            tag("SetUp", "1");
            tag("FEN", &self.start_fen());
        }

        out.push('\n');
        let moves = self.pgn_movetext();
        if moves.is_empty() || self.result() == GameResult::Ongoing {
            // Seven tag roster requires a game termination marker.
            let sep = if moves.is_empty() { "" } else { " " };
            out.push_str(&format!("{moves}{sep}*"));
        } else {
            out.push_str(&moves);
        }
        out.push('\n');
        out
    }

    fn start_fullmove(&self) -> u32 {
        // Last FEN field is the fullmove number.
        self.start_fen()
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(1)
    }
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replay a PGN game (headers optional) into a `ChessGame`.
///
/// A `[FEN "..."]` tag sets the starting position. Replay stops at the first
/// result token or at the end of input.
pub fn parse(pgn: &str) -> Result<ChessGame, GameError> {
    let mut start_fen: Option<String> = None;
    let mut body = String::with_capacity(pgn.len());

    for line in pgn.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if let Some((name, value)) = parse_tag(trimmed) {
                if name.eq_ignore_ascii_case("FEN") {
                    start_fen = Some(value);
                }
            }
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }

    let mut game = match start_fen {
        Some(fen) => ChessGame::from_fen(&fen)?,
        None => ChessGame::new(),
    };

    for token in tokenize(&body) {
        if is_result_token(&token) {
            break;
        }
        if token.starts_with('$') {
            continue;
        }
        let san = strip_move_number(&token);
        if san.is_empty() {
            continue;
        }
        let ply = game.history().len() + 1;
        game.play_san(san).map_err(|e| GameError::Pgn {
            ply,
            token: token.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(game)
}

/// Split movetext into tokens, dropping `{...}` and `;` comments and
/// `(...)` variations (nested).
fn tokenize(body: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();
    let mut depth = 0usize;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.is_empty() {
            tokens.push(std::mem::take(current));
        }
    };

    while let Some(c) = chars.next() {
        if depth > 0 {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                '{' => skip_until(&mut chars, '}'),
                _ => {}
            }
            continue;
        }
        match c {
            '{' => {
                flush(&mut current, &mut tokens);
                skip_until(&mut chars, '}');
            }
            ';' => {
                flush(&mut current, &mut tokens);
                skip_until(&mut chars, '\n');
            }
            '(' => {
                flush(&mut current, &mut tokens);
                depth = 1;
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn skip_until(chars: &mut std::str::Chars<'_>, end: char) {
    for c in chars.by_ref() {
        if c == end {
            break;
        }
    }
}

fn is_result_token(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}

/// `12.` -> ``, `12...` -> ``, `12.Nf3` -> `Nf3`, `Nf3` -> `Nf3`.
fn strip_move_number(token: &str) -> &str {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() != token.len() && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    }
}

fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (name, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((name.to_string(), value.replace("\\\"", "\"").replace("\\\\", "\\")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Role;

    fn game_from(moves: &[&str]) -> ChessGame {
        let mut game = ChessGame::new();
        for m in moves {
            game.play_uci(m, Role::Queen).unwrap();
        }
        game
    }

    #[test]
    fn empty_game_has_empty_movetext() {
        assert_eq!(ChessGame::new().pgn_movetext(), "");
    }

    #[test]
    fn movetext_numbers_full_moves() {
        let game = game_from(&["e2e4", "e7e5", "g1f3"]);
        assert_eq!(game.pgn_movetext(), "1. e4 e5 2. Nf3");
    }

    #[test]
    fn movetext_appends_result_when_decided() {
        let game = game_from(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(game.pgn_movetext(), "1. f3 e5 2. g4 Qh4# 0-1");
    }

    #[test]
    fn movetext_from_black_to_move_fen() {
        let mut game =
            ChessGame::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        game.play_san("c5").unwrap();
        game.play_san("Nf3").unwrap();
        assert_eq!(game.pgn_movetext(), "1... c5 2. Nf3");
    }

    #[test]
    fn export_includes_seven_tag_roster() {
        let game = game_from(&["d2d4", "d7d5"]);
        let headers = PgnHeaders {
            event: Some("Casual".into()),
            white: Some("Human".into()),
            black: Some("gpt-4o".into()),
            date: NaiveDate::from_ymd_opt(2024, 3, 9),
            ..Default::default()
        };
        let pgn = game.export_pgn(&headers);
        assert!(pgn.starts_with("[Event \"Casual\"]\n[Site \"?\"]\n[Date \"2024.03.09\"]\n"));
        assert!(pgn.contains("[White \"Human\"]"));
        assert!(pgn.contains("[Black \"gpt-4o\"]"));
        assert!(pgn.contains("[Result \"*\"]"));
        assert!(!pgn.contains("[FEN"));
        assert!(pgn.ends_with("\n1. d4 d5 *\n"));
    }

    #[test]
    fn export_of_custom_start_has_fen_tag() {
        let game = ChessGame::from_fen("8/8/8/4k3/8/8/R7/4K3 w - - 0 1").unwrap();
        let pgn = game.export_pgn(&PgnHeaders::default());
        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains("[FEN \"8/8/8/4k3/8/8/R7/4K3 w - - 0 1\"]"));
        assert!(pgn.ends_with("\n*\n"));
    }

    #[test]
    fn export_escapes_tag_values() {
        let game = ChessGame::new();
        let headers = PgnHeaders {
            event: Some("The \"big\" one".into()),
            ..Default::default()
        };
        assert!(game
            .export_pgn(&headers)
            .contains("[Event \"The \\\"big\\\" one\"]"));
    }

    #[test]
    fn parse_plain_movetext() {
        let game = parse("1. e4 e5 2. Nf3 Nc6 3. Bb5").unwrap();
        assert_eq!(game.history().len(), 5);
        assert_eq!(game.last_move().unwrap().uci, "f1b5");
    }

    #[test]
    fn parse_round_trips_exported_pgn() {
        let game = game_from(&["e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4"]);
        let exported = game.export_pgn(&PgnHeaders::default());
        let replayed = parse(&exported).unwrap();
        assert_eq!(replayed.fen(), game.fen());
        assert_eq!(replayed.pgn_movetext(), game.pgn_movetext());
    }

    #[test]
    fn parse_skips_comments_variations_and_nags() {
        let pgn = "1. e4 {best by test} e5 $1 2. Nf3 (2. f4 exf4 (2... d5)) Nc6 ; line\n3. Bc4 *";
        let game = parse(pgn).unwrap();
        assert_eq!(game.pgn_movetext(), "1. e4 e5 2. Nf3 Nc6 3. Bc4");
    }

    #[test]
    fn parse_handles_compact_numbers_and_annotations() {
        let game = parse("1.e4 e5 2.Nf3!? Nc6?! 3.Bb5!! a6").unwrap();
        assert_eq!(game.history().len(), 6);
    }

    #[test]
    fn parse_stops_at_result() {
        let game = parse("1. e4 e5 1-0 2. Nf3").unwrap();
        assert_eq!(game.history().len(), 2);
    }

    #[test]
    fn parse_uses_fen_tag() {
        let pgn = "[SetUp \"1\"]\n[FEN \"8/P7/8/8/8/8/8/k6K w - - 0 1\"]\n\n1. a8=Q+ *";
        let game = parse(pgn).unwrap();
        assert_eq!(game.last_move().unwrap().uci, "a7a8q");
    }

    #[test]
    fn parse_reports_illegal_token() {
        let err = parse("1. e4 e5 2. Ke3").unwrap_err();
        match err {
            GameError::Pgn { ply, token, .. } => {
                assert_eq!(ply, 3);
                assert_eq!(token, "Ke3");
            }
            other => panic!("expected Pgn error, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_is_new_game() {
        assert!(parse("").unwrap().history().is_empty());
        assert!(parse("*").unwrap().history().is_empty());
    }

    #[test]
    fn tokenize_drops_nested_variations() {
        assert_eq!(
            tokenize("1. d4 (1. e4 (1. c4 {x}) e5) d5"),
            vec!["1.", "d4", "d5"]
        );
    }

    #[test]
    fn strip_move_number_cases() {
        assert_eq!(strip_move_number("12."), "");
        assert_eq!(strip_move_number("12..."), "");
        assert_eq!(strip_move_number("12.Nf3"), "Nf3");
        assert_eq!(strip_move_number("Nf3"), "Nf3");
        assert_eq!(strip_move_number("O-O"), "O-O");
        assert_eq!(strip_move_number("0-0"), "0-0");
    }
}
