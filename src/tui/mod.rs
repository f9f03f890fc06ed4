// Terminal front-end: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the parts of the game the screen
// shows. The app orchestrator pushes `UiUpdate` messages over an mpsc channel;
// the TUI applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::config::CredentialsConfig;
use crate::protocol::{GameSnapshot, LlmStatus, UiUpdate, UserCommand};

use layout::{build_layout, AppLayout};

// ---------------------------------------------------------------------------
// Input modes
// ---------------------------------------------------------------------------

/// What keystrokes currently mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Single-key commands.
    #[default]
    Normal,
    /// Typing a move into the input line.
    MoveEntry,
    /// Editing API keys in the settings overlay.
    Settings,
    /// Quit confirmation overlay.
    ConfirmQuit,
}

/// API key fields of the settings overlay, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub openai: String,
    pub anthropic: String,
    pub gemini: String,
    /// Index of the field receiving input (0..3).
    pub focused: usize,
}

impl SettingsForm {
    pub const LABELS: [&'static str; 3] = ["OpenAI", "Anthropic", "Gemini"];

    pub fn field_mut(&mut self, index: usize) -> &mut String {
        match index {
            0 => &mut self.openai,
            1 => &mut self.anthropic,
            _ => &mut self.gemini,
        }
    }

    pub fn field(&self, index: usize) -> &str {
        match index {
            0 => &self.openai,
            1 => &self.anthropic,
            _ => &self.gemini,
        }
    }

    pub fn focused_mut(&mut self) -> &mut String {
        let focused = self.focused;
        self.field_mut(focused)
    }

    pub fn to_credentials(&self) -> CredentialsConfig {
        let opt = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        CredentialsConfig {
            openai_api_key: opt(&self.openai),
            anthropic_api_key: opt(&self.anthropic),
            gemini_api_key: opt(&self.gemini),
        }
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
///
/// Updated incrementally via `UiUpdate` messages from the app orchestrator.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Last full game state from the app; `None` until the first snapshot.
    pub snapshot: Option<GameSnapshot>,
    /// Streamed model output, replaced by the parsed reasoning once the move
    /// is played.
    pub reasoning_text: String,
    pub ai_status: LlmStatus,
    /// Why the AI stopped, shown until the next request.
    pub ai_error: Option<String>,
    /// One-line message for the input bar.
    pub notice: Option<String>,
    pub mode: InputMode,
    /// Move being typed in `MoveEntry` mode.
    pub move_input: String,
    pub settings: SettingsForm,
    /// Board orientation toggled by the user, on top of the human's side.
    pub flipped: bool,
}

impl ViewState {
    /// Whether the board is drawn with black at the bottom.
    pub fn black_at_bottom(&self) -> bool {
        let human_black = self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.human_color == shakmaty::Color::Black);
        human_black != self.flipped
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => {
            state.ai_status = snapshot.ai_status;
            // Idle only follows undo or a new game; the old answer no longer applies.
            if snapshot.ai_status == LlmStatus::Idle {
                state.reasoning_text.clear();
                state.ai_error = None;
            }
            state.snapshot = Some(*snapshot);
        }
        UiUpdate::ThinkingStarted { .. } => {
            state.reasoning_text.clear();
            state.ai_error = None;
            state.notice = None;
            state.ai_status = LlmStatus::Thinking;
        }
        UiUpdate::ReasoningToken(token) => {
            state.reasoning_text.push_str(&token);
        }
        UiUpdate::AiMoved { san, reasoning } => {
            state.ai_status = LlmStatus::Complete;
            if !reasoning.is_empty() {
                state.reasoning_text = reasoning;
            }
            state.notice = Some(format!("AI played {san}"));
        }
        UiUpdate::AiError(message) => {
            state.ai_status = LlmStatus::Error;
            state.ai_error = Some(message);
        }
        UiUpdate::Notice(message) => {
            state.notice = Some(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete screen.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::board::render(frame, layout.board, state);
    widgets::move_list::render(frame, layout.move_list, state);
    widgets::ai_panel::render(frame, layout.ai_panel, state);
    widgets::move_input::render(frame, layout.input, state);
    render_help_bar(frame, &layout, state);

    match state.mode {
        InputMode::Settings => widgets::settings::render(frame, frame.area(), &state.settings),
        InputMode::ConfirmQuit => widgets::quit_confirm::render(frame, frame.area(), state),
        InputMode::Normal | InputMode::MoveEntry => {}
    }
}

fn help_text(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => {
            " m/Enter:Move | u:Undo | n:New | c:Model | r:Retry AI | f:Flip | s:Keys | q:Quit"
        }
        InputMode::MoveEntry => " Enter:Play | Esc:Cancel | SAN (Nf3, O-O) or UCI (g1f3)",
        InputMode::Settings => " Tab:Next field | Enter:Save keys | Esc:Cancel",
        InputMode::ConfirmQuit => " y:Quit | n:Stay",
    }
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(state.mode),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Best-effort terminal restoration
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Channel closed: app is shutting down
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    // Mouse, resize, focus events
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::from(e).context("terminal input error")),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::from(e).context("failed to draw frame"));
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::ChessGame;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use shakmaty::Role;

    /// Snapshot of `game` as the app would send it.
    pub(crate) fn snapshot_of(game: &ChessGame, human: shakmaty::Color) -> GameSnapshot {
        GameSnapshot {
            board: game.board().clone(),
            turn: game.turn(),
            human_color: human,
            last_move: game.last_move().map(|m| (m.from, m.to)),
            status_text: game.status_text(),
            movetext: game.pgn_movetext(),
            moves: game.history().iter().map(|m| m.san.clone()).collect(),
            fen: game.fen(),
            model: "gpt-4o".to_string(),
            game_over: game.is_game_over(),
            ai_status: LlmStatus::Idle,
        }
    }

    /// All cell symbols of the rendered screen, row by row.
    pub(crate) fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert!(state.snapshot.is_none());
        assert!(state.reasoning_text.is_empty());
        assert_eq!(state.ai_status, LlmStatus::Idle);
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.move_input.is_empty());
        assert!(!state.flipped);
        assert!(!state.black_at_bottom());
    }

    #[test]
    fn reasoning_tokens_accumulate() {
        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::ThinkingStarted {
                model: "gpt-4o".into(),
            },
        );
        apply_ui_update(&mut state, UiUpdate::ReasoningToken("{\"reasoning\": ".into()));
        apply_ui_update(&mut state, UiUpdate::ReasoningToken("\"hi\"".into()));
        assert_eq!(state.reasoning_text, "{\"reasoning\": \"hi\"");
        assert_eq!(state.ai_status, LlmStatus::Thinking);
    }

    #[test]
    fn ai_moved_replaces_raw_stream_with_reasoning() {
        let mut state = ViewState::default();
        state.reasoning_text = "{\"reasoning\":\"Develop\",\"move\":\"g8f6\"}".into();
        apply_ui_update(
            &mut state,
            UiUpdate::AiMoved {
                san: "Nf6".into(),
                reasoning: "Develop".into(),
            },
        );
        assert_eq!(state.reasoning_text, "Develop");
        assert_eq!(state.ai_status, LlmStatus::Complete);
        assert_eq!(state.notice.as_deref(), Some("AI played Nf6"));
    }

    #[test]
    fn ai_error_is_kept_until_next_request() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::AiError("AI tried to make an illegal move: e7e4".into()));
        assert_eq!(state.ai_status, LlmStatus::Error);
        assert!(state.ai_error.is_some());

        apply_ui_update(
            &mut state,
            UiUpdate::ThinkingStarted {
                model: "gpt-4o".into(),
            },
        );
        assert!(state.ai_error.is_none());
    }

    #[test]
    fn fresh_game_snapshot_clears_panel() {
        let mut state = ViewState::default();
        state.reasoning_text = "old".into();
        state.ai_error = Some("old error".into());
        let snapshot = snapshot_of(&ChessGame::new(), shakmaty::Color::White);
        apply_ui_update(&mut state, UiUpdate::Snapshot(Box::new(snapshot)));
        assert!(state.reasoning_text.is_empty());
        assert!(state.ai_error.is_none());
        assert!(state.snapshot.is_some());
    }

    #[test]
    fn orientation_follows_human_side_and_flip() {
        let mut state = ViewState::default();
        state.snapshot = Some(snapshot_of(&ChessGame::new(), shakmaty::Color::Black));
        assert!(state.black_at_bottom());
        state.flipped = true;
        assert!(!state.black_at_bottom());
    }

    #[test]
    fn settings_form_to_credentials() {
        let mut form = SettingsForm::default();
        form.focused = 1;
        form.focused_mut().push_str(" sk-ant ");
        let creds = form.to_credentials();
        assert_eq!(creds.anthropic_api_key.as_deref(), Some("sk-ant"));
        assert_eq!(creds.openai_api_key, None);
        assert_eq!(form.field(1), " sk-ant ");
    }

    #[test]
    fn render_frame_without_snapshot() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let state = ViewState::default();
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        assert!(screen_text(&terminal).contains("q:Quit"));
    }

    #[test]
    fn render_frame_with_game_and_overlays() {
        let mut game = ChessGame::new();
        game.play_uci("e2e4", Role::Queen).unwrap();
        game.play_uci("e7e5", Role::Queen).unwrap();

        let mut state = ViewState::default();
        apply_ui_update(
            &mut state,
            UiUpdate::Snapshot(Box::new(snapshot_of(&game, shakmaty::Color::White))),
        );

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("White to move"));
        assert!(text.contains("1. e4      e5"));

        state.mode = InputMode::Settings;
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        assert!(screen_text(&terminal).contains("API Keys"));

        state.mode = InputMode::ConfirmQuit;
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        assert!(screen_text(&terminal).contains("Really quit?"));
    }

    #[test]
    fn render_frame_on_tiny_terminal() {
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        let mut state = ViewState::default();
        state.snapshot = Some(snapshot_of(&ChessGame::new(), shakmaty::Color::White));
        state.mode = InputMode::Settings;
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
    }
}
