// Application orchestrator: owns the game, triggers AI moves and routes
// events between the TUI and LLM tasks.

use std::time::Duration;

use shakmaty::{Color, Role};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{self, Config, ConfigError, CredentialsConfig};
use crate::game::{color_name, ChessGame};
use crate::llm::client::LlmClient;
use crate::llm::reply::parse_reply;
use crate::llm::{prompt, LlmError};
use crate::protocol::{GameSnapshot, LlmEvent, LlmStatus, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub game: ChessGame,
    pub human_color: Color,
    pub promotion: Role,
    /// Index into `config.llm.models` of the current opponent.
    pub model_index: usize,
    pub ai_status: LlmStatus,
    /// Text streamed by the model for the current (or last) request.
    pub reasoning_text: String,
    pub current_llm_task: Option<JoinHandle<()>>,
    /// Identifies the current LLM task. Bumped whenever a task is started or
    /// cancelled; events from other generations are discarded in
    /// `handle_llm_event`.
    pub llm_generation: u64,
    pub llm_client: LlmClient,
    /// Sender for LLM events; spawned tasks stream back through a clone.
    pub llm_tx: mpsc::Sender<LlmEvent>,
}

impl AppState {
    pub fn new(config: Config, llm_client: LlmClient, llm_tx: mpsc::Sender<LlmEvent>) -> Self {
        let model_index = config
            .llm
            .models
            .iter()
            .position(|m| *m == config.llm.model)
            .unwrap_or(0);

        AppState {
            human_color: config.game.human_color.color(),
            promotion: config.game.promotion(),
            config,
            game: ChessGame::new(),
            model_index,
            ai_status: LlmStatus::Idle,
            reasoning_text: String::new(),
            current_llm_task: None,
            llm_generation: 0,
            llm_client,
            llm_tx,
        }
    }

    /// The model currently playing the AI side.
    pub fn model(&self) -> &str {
        self.config
            .llm
            .models
            .get(self.model_index)
            .unwrap_or(&self.config.llm.model)
    }

    pub fn is_human_turn(&self) -> bool {
        self.game.turn() == self.human_color
    }

    /// Whether the AI should be asked for a move in the current position.
    pub fn ai_to_move(&self) -> bool {
        !self.is_human_turn() && !self.game.is_game_over()
    }

    pub fn build_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.game.board().clone(),
            turn: self.game.turn(),
            human_color: self.human_color,
            last_move: self.game.last_move().map(|m| (m.from, m.to)),
            status_text: self.game.status_text(),
            movetext: self.game.pgn_movetext(),
            moves: self.game.history().iter().map(|m| m.san.clone()).collect(),
            fen: self.game.fen(),
            model: self.model().to_string(),
            game_over: self.game.is_game_over(),
            ai_status: self.ai_status,
        }
    }

    /// Cancel the current LLM task if one is running. Events it already
    /// queued become stale.
    pub fn cancel_llm_task(&mut self) {
        if let Some(handle) = self.current_llm_task.take() {
            handle.abort();
            info!("Cancelled previous LLM task");
        }
        self.llm_generation += 1;
        if self.ai_status == LlmStatus::Thinking {
            self.ai_status = LlmStatus::Idle;
        }
    }

    /// Ask the current model for a move in the current position.
    ///
    /// Cancels any in-flight request and spawns a streaming task that sends
    /// events through the LLM channel.
    pub fn trigger_ai_move(&mut self) -> Result<(), LlmError> {
        self.cancel_llm_task();

        let model = self.model().to_string();
        let client = self.llm_client.chat_client(&model, None)?;
        let system = prompt::system_prompt();
        let user_content = prompt::build_move_prompt(&self.game.pgn_movetext(), &self.game);
        let max_tokens = self.llm_client.max_tokens();
        let tx = self.llm_tx.clone();

        self.llm_generation += 1;
        let generation = self.llm_generation;
        self.reasoning_text.clear();
        self.ai_status = LlmStatus::Thinking;

        let timeout_secs = self.config.llm.request_timeout_secs;
        let handle = tokio::spawn(async move {
            let stream = client.stream_message(system, &user_content, max_tokens, tx.clone(), generation);
            match tokio::time::timeout(Duration::from_secs(timeout_secs), stream).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("LLM move task failed: {}", e),
                Err(_) => {
                    warn!("LLM move request timed out after {}s", timeout_secs);
                    let _ = tx
                        .send(LlmEvent::Error {
                            message: LlmError::Timeout(timeout_secs).to_string(),
                            generation,
                        })
                        .await;
                }
            }
        });
        self.current_llm_task = Some(handle);

        info!(
            "Requested AI move from {} for {} (gen: {})",
            model,
            color_name(self.game.turn()),
            generation
        );
        Ok(())
    }

    /// Apply the model's finished answer. Returns the SAN played, or the
    /// message to show when the answer is unusable.
    pub fn apply_ai_reply(&mut self, full_text: &str) -> Result<(String, String), String> {
        let reply = parse_reply(full_text).map_err(|e| e.to_string())?;
        match self.game.play_uci(&reply.mv, self.promotion) {
            Ok(played) => Ok((played.san.clone(), reply.reasoning)),
            Err(e) => {
                warn!(mv = %reply.mv, error = %e, "AI proposed an illegal move");
                Err(format!("AI tried to make an illegal move: {}", reply.mv))
            }
        }
    }

    /// Play the human's move (SAN or UCI).
    pub fn submit_human_move(&mut self, input: &str) -> Result<String, String> {
        if self.game.is_game_over() {
            return Err("The game is over. Press n for a new game.".to_string());
        }
        if self.ai_status == LlmStatus::Thinking {
            return Err("Wait for the AI to move.".to_string());
        }
        if !self.is_human_turn() {
            return Err("It is the AI's turn. Press r to ask again.".to_string());
        }
        let input = input.trim();
        if input.is_empty() {
            return Err("Enter a move, e.g. e4 or e2e4.".to_string());
        }
        match self.game.play_input(input, self.promotion) {
            Ok(played) => Ok(played.san.clone()),
            Err(e) => {
                debug!(input, error = %e, "rejected human move");
                Err(format!("Illegal move: {input}"))
            }
        }
    }

    /// Take back to the human's previous turn. Returns the number of
    /// half-moves undone.
    pub fn undo_to_human_turn(&mut self) -> usize {
        self.cancel_llm_task();
        self.ai_status = LlmStatus::Idle;
        self.reasoning_text.clear();

        let mut undone = 0;
        while self.game.undo().is_some() {
            undone += 1;
            if self.is_human_turn() {
                break;
            }
        }
        undone
    }

    pub fn new_game(&mut self) {
        self.cancel_llm_task();
        self.game.reset();
        self.ai_status = LlmStatus::Idle;
        self.reasoning_text.clear();
    }

    /// Switch to the next configured model, wrapping around.
    pub fn cycle_model(&mut self) -> &str {
        let count = self.config.llm.models.len().max(1);
        self.model_index = (self.model_index + 1) % count;
        self.model()
    }

    /// Persist API keys and use them for subsequent requests. Blank fields
    /// keep the stored key.
    pub fn save_credentials(
        &mut self,
        credentials: CredentialsConfig,
    ) -> Result<std::path::PathBuf, ConfigError> {
        let credentials = self.config.credentials.merge(credentials);
        let path = config::save_credentials(&self.config.base_dir, &credentials)?;
        self.llm_client.set_credentials(credentials.clone());
        self.config.credentials = credentials;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on the LLM event and user command channels using
/// `tokio::select!` and pushes UI updates through `ui_tx`. If the AI plays
/// white, its first move is requested immediately.
pub async fn run(
    mut llm_rx: mpsc::Receiver<LlmEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    send_snapshot(&state, &ui_tx).await;
    if state.ai_to_move() {
        start_ai_turn(&mut state, &ui_tx).await;
    }

    // When the LLM channel closes, stop polling it so select! never spins.
    let mut llm_open = true;

    loop {
        tokio::select! {
            // --- LLM events (only poll when channel is open) ---
            llm_event = llm_rx.recv(), if llm_open => {
                match llm_event {
                    Some(event) => {
                        handle_llm_event(&mut state, event, &ui_tx).await;
                    }
                    None => {
                        info!("LLM channel closed");
                        llm_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.cancel_llm_task();
    info!("Application event loop exiting");
    Ok(())
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.build_snapshot())))
        .await;
}

/// Request the AI move and report the outcome to the UI.
async fn start_ai_turn(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    match state.trigger_ai_move() {
        Ok(()) => {
            let _ = ui_tx
                .send(UiUpdate::ThinkingStarted {
                    model: state.model().to_string(),
                })
                .await;
        }
        Err(e) => {
            warn!("Could not request AI move: {}", e);
            state.ai_status = LlmStatus::Error;
            let message = match e {
                LlmError::MissingApiKey(provider) => {
                    format!("Missing API Key for {provider}. Press s to enter one.")
                }
                other => other.to_string(),
            };
            let _ = ui_tx.send(UiUpdate::AiError(message)).await;
        }
    }
    send_snapshot(state, ui_tx).await;
}

/// Handle an LLM streaming event.
///
/// Events whose generation differs from `state.llm_generation` come from a
/// cancelled task and are discarded. On completion the reply is parsed and
/// the move applied; an unusable reply halts play until the user retries,
/// undoes or starts over.
async fn handle_llm_event(state: &mut AppState, event: LlmEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    if event.generation() != state.llm_generation {
        debug!(
            "Discarding stale LLM event (event gen: {}, current gen: {})",
            event.generation(),
            state.llm_generation
        );
        return;
    }
    if state.ai_status != LlmStatus::Thinking {
        debug!("Received LLM event with no request in flight, discarding");
        return;
    }

    match event {
        LlmEvent::Token { text, .. } => {
            state.reasoning_text.push_str(&text);
            let _ = ui_tx.send(UiUpdate::ReasoningToken(text)).await;
        }
        LlmEvent::Complete {
            full_text,
            input_tokens,
            output_tokens,
            ..
        } => {
            state.current_llm_task = None;
            info!(input_tokens, output_tokens, "AI response complete");
            match state.apply_ai_reply(&full_text) {
                Ok((san, reasoning)) => {
                    state.ai_status = LlmStatus::Complete;
                    info!("AI played {}", san);
                    let _ = ui_tx.send(UiUpdate::AiMoved { san, reasoning }).await;
                }
                Err(message) => {
                    state.ai_status = LlmStatus::Error;
                    let _ = ui_tx.send(UiUpdate::AiError(message)).await;
                }
            }
            send_snapshot(state, ui_tx).await;
        }
        LlmEvent::Error { message, .. } => {
            warn!("LLM move error: {}", message);
            state.current_llm_task = None;
            state.ai_status = LlmStatus::Error;
            let _ = ui_tx.send(UiUpdate::AiError(message)).await;
            send_snapshot(state, ui_tx).await;
        }
    }
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::SubmitMove(input) => match state.submit_human_move(&input) {
            Ok(san) => {
                info!("Human played {}", san);
                send_snapshot(state, ui_tx).await;
                if state.ai_to_move() {
                    start_ai_turn(state, ui_tx).await;
                }
            }
            Err(message) => {
                let _ = ui_tx.send(UiUpdate::Notice(message)).await;
            }
        },
        UserCommand::Undo => {
            let undone = state.undo_to_human_turn();
            info!("Undid {} half-move(s)", undone);
            if undone == 0 {
                let _ = ui_tx.send(UiUpdate::Notice("Nothing to undo.".to_string())).await;
            }
            send_snapshot(state, ui_tx).await;
            if state.ai_to_move() {
                start_ai_turn(state, ui_tx).await;
            }
        }
        UserCommand::NewGame => {
            info!("Starting a new game");
            state.new_game();
            send_snapshot(state, ui_tx).await;
            if state.ai_to_move() {
                start_ai_turn(state, ui_tx).await;
            }
        }
        UserCommand::CycleModel => {
            let model = state.cycle_model().to_string();
            info!("Switched opponent to {}", model);
            let _ = ui_tx.send(UiUpdate::Notice(format!("Opponent: {model}"))).await;
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::RequestAiMove => {
            if state.game.is_game_over() {
                let _ = ui_tx.send(UiUpdate::Notice("The game is over.".to_string())).await;
            } else if state.is_human_turn() {
                let _ = ui_tx.send(UiUpdate::Notice("It is your move.".to_string())).await;
            } else {
                start_ai_turn(state, ui_tx).await;
            }
        }
        UserCommand::SaveCredentials(credentials) => {
            let notice = match state.save_credentials(credentials) {
                Ok(path) => {
                    info!("Saved API keys to {}", path.display());
                    format!("API keys saved to {}", path.display())
                }
                Err(e) => {
                    warn!("Failed to save API keys: {}", e);
                    format!("Could not save API keys: {e}")
                }
            };
            let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
