// Message types passed between the app orchestrator, the TUI and LLM tasks.

use shakmaty::{Board, Color, Square};

use crate::config::CredentialsConfig;

// ---------------------------------------------------------------------------
// LLM streaming events
// ---------------------------------------------------------------------------

/// Events emitted by a streaming LLM task.
///
/// Every event carries the `generation` of the task that produced it so the
/// receiver can drop events from cancelled requests.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// A chunk of generated text.
    Token { text: String, generation: u64 },
    /// The stream finished; `full_text` is the concatenation of all tokens.
    Complete {
        full_text: String,
        input_tokens: u32,
        output_tokens: u32,
        generation: u64,
    },
    /// The request failed (transport, HTTP status, or provider error).
    Error { message: String, generation: u64 },
}

impl LlmEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LlmEvent::Token { generation, .. }
            | LlmEvent::Complete { generation, .. }
            | LlmEvent::Error { generation, .. } => *generation,
        }
    }
}

/// Where the AI opponent is in answering the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmStatus {
    #[default]
    Idle,
    Thinking,
    Complete,
    Error,
}

// ---------------------------------------------------------------------------
// TUI -> app
// ---------------------------------------------------------------------------

/// Commands sent from the TUI to the app orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// A move typed by the player, SAN or UCI.
    SubmitMove(String),
    /// Take back to the player's previous turn.
    Undo,
    /// Start over from the initial position.
    NewGame,
    /// Switch the opponent to the next configured model.
    CycleModel,
    /// Ask the AI to (re)try its move in the current position.
    RequestAiMove,
    /// Persist API keys entered in the settings dialog.
    SaveCredentials(CredentialsConfig),
    Quit,
}

// ---------------------------------------------------------------------------
// app -> TUI
// ---------------------------------------------------------------------------

/// Everything the TUI needs to draw the game.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub board: Board,
    pub turn: Color,
    pub human_color: Color,
    pub last_move: Option<(Square, Square)>,
    pub status_text: String,
    /// PGN movetext of the game so far.
    pub movetext: String,
    /// SAN of every half-move, in order.
    pub moves: Vec<String>,
    pub fen: String,
    pub model: String,
    pub game_over: bool,
    pub ai_status: LlmStatus,
}

/// Updates pushed from the app orchestrator to the TUI.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    /// Full game state after any change.
    Snapshot(Box<GameSnapshot>),
    /// A new AI request started; clears the reasoning panel.
    ThinkingStarted { model: String },
    /// Streamed text from the model.
    ReasoningToken(String),
    /// The model's move was applied.
    AiMoved { san: String, reasoning: String },
    /// The AI request failed or produced an unusable move. Play halts.
    AiError(String),
    /// A short message for the status line (e.g. an illegal human move).
    Notice(String),
}
