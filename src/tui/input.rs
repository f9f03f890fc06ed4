// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (move typing, board
// flip, settings form editing).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{InputMode, SettingsForm, ViewState};
use crate::protocol::UserCommand;

/// Longest move text accepted in the input line ("e7e8q", "exd8=Q+", ...).
const MAX_MOVE_LEN: usize = 12;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    match view_state.mode {
        InputMode::ConfirmQuit => handle_confirm_quit(key_event, view_state),
        InputMode::MoveEntry => handle_move_entry(key_event, view_state),
        InputMode::Settings => handle_settings(key_event, view_state),
        InputMode::Normal => handle_normal(key_event, view_state),
    }
}

fn handle_normal(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('m') | KeyCode::Enter => {
            view_state.mode = InputMode::MoveEntry;
            view_state.move_input.clear();
            view_state.notice = None;
            None
        }
        KeyCode::Char('u') => Some(UserCommand::Undo),
        KeyCode::Char('n') => Some(UserCommand::NewGame),
        KeyCode::Char('c') => Some(UserCommand::CycleModel),
        KeyCode::Char('r') => Some(UserCommand::RequestAiMove),
        KeyCode::Char('f') => {
            view_state.flipped = !view_state.flipped;
            None
        }
        KeyCode::Char('s') => {
            // Fields start blank; saving a blank field keeps the stored key.
            view_state.settings = SettingsForm::default();
            view_state.mode = InputMode::Settings;
            None
        }
        // Quit: enter confirmation mode instead of quitting immediately
        KeyCode::Char('q') => {
            view_state.mode = InputMode::ConfirmQuit;
            None
        }
        _ => None,
    }
}

/// Typing a move. Enter submits, Esc abandons.
fn handle_move_entry(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            view_state.move_input.clear();
            view_state.mode = InputMode::Normal;
            None
        }
        KeyCode::Enter => {
            let text = view_state.move_input.trim().to_string();
            view_state.move_input.clear();
            view_state.mode = InputMode::Normal;
            if text.is_empty() {
                None
            } else {
                Some(UserCommand::SubmitMove(text))
            }
        }
        KeyCode::Backspace => {
            view_state.move_input.pop();
            None
        }
        KeyCode::Char(c) if !c.is_whitespace() && view_state.move_input.len() < MAX_MOVE_LEN => {
            view_state.move_input.push(c);
            None
        }
        _ => None,
    }
}

/// Editing the API key form.
fn handle_settings(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let form = &mut view_state.settings;
    let fields = SettingsForm::LABELS.len();
    match key_event.code {
        KeyCode::Esc => {
            view_state.settings = SettingsForm::default();
            view_state.mode = InputMode::Normal;
            None
        }
        KeyCode::Tab | KeyCode::Down => {
            form.focused = (form.focused + 1) % fields;
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.focused = (form.focused + fields - 1) % fields;
            None
        }
        KeyCode::Backspace => {
            form.focused_mut().pop();
            None
        }
        KeyCode::Enter => {
            let credentials = form.to_credentials();
            view_state.settings = SettingsForm::default();
            view_state.mode = InputMode::Normal;
            Some(UserCommand::SaveCredentials(credentials))
        }
        KeyCode::Char(c) => {
            form.focused_mut().push(c);
            None
        }
        _ => None,
    }
}

/// Handle key events while in quit confirmation mode.
///
/// - `y` or `q` confirms quit (sends UserCommand::Quit)
/// - `n` or `Esc` cancels (returns to normal mode)
/// - All other keys are ignored
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('q') => Some(UserCommand::Quit),
        KeyCode::Char('n') | KeyCode::Esc => {
            view_state.mode = InputMode::Normal;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn type_text(state: &mut ViewState, text: &str) {
        for c in text.chars() {
            assert_eq!(handle_key(key(KeyCode::Char(c)), state), None);
        }
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let mut event = key(KeyCode::Char('q'));
        event.kind = KeyEventKind::Release;
        assert_eq!(handle_key(event, &mut state), None);
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        for mode in [
            InputMode::Normal,
            InputMode::MoveEntry,
            InputMode::Settings,
            InputMode::ConfirmQuit,
        ] {
            let mut state = ViewState::default();
            state.mode = mode;
            assert_eq!(handle_key(ctrl('c'), &mut state), Some(UserCommand::Quit));
        }
    }

    #[test]
    fn normal_mode_commands() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Char('u')), &mut state), Some(UserCommand::Undo));
        assert_eq!(handle_key(key(KeyCode::Char('n')), &mut state), Some(UserCommand::NewGame));
        assert_eq!(
            handle_key(key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::CycleModel)
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('r')), &mut state),
            Some(UserCommand::RequestAiMove)
        );
        assert_eq!(handle_key(key(KeyCode::Char('x')), &mut state), None);
    }

    #[test]
    fn f_flips_board() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('f')), &mut state);
        assert!(state.flipped);
        handle_key(key(KeyCode::Char('f')), &mut state);
        assert!(!state.flipped);
    }

    #[test]
    fn move_entry_submits_trimmed_move() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('m')), &mut state);
        assert_eq!(state.mode, InputMode::MoveEntry);

        type_text(&mut state, "Nf3x");
        handle_key(key(KeyCode::Backspace), &mut state);
        assert_eq!(state.move_input, "Nf3");

        let cmd = handle_key(key(KeyCode::Enter), &mut state);
        assert_eq!(cmd, Some(UserCommand::SubmitMove("Nf3".into())));
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.move_input.is_empty());
    }

    #[test]
    fn move_entry_letters_are_not_commands() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Enter), &mut state);
        // 'q', 'n', 'u' are ordinary characters while typing
        type_text(&mut state, "qnu");
        assert_eq!(state.mode, InputMode::MoveEntry);
        assert_eq!(state.move_input, "qnu");
    }

    #[test]
    fn move_entry_empty_enter_sends_nothing() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Enter), &mut state);
        assert_eq!(handle_key(key(KeyCode::Enter), &mut state), None);
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn move_entry_esc_cancels() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('m')), &mut state);
        type_text(&mut state, "e4");
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), None);
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.move_input.is_empty());
    }

    #[test]
    fn move_entry_is_length_limited() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('m')), &mut state);
        type_text(&mut state, "abcdefghijklmnop");
        assert_eq!(state.move_input.len(), MAX_MOVE_LEN);
    }

    #[test]
    fn settings_form_edits_focused_field_and_saves() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('s')), &mut state);
        assert_eq!(state.mode, InputMode::Settings);

        type_text(&mut state, "sk-openai");
        handle_key(key(KeyCode::Tab), &mut state);
        handle_key(key(KeyCode::Tab), &mut state);
        type_text(&mut state, "gem");
        assert_eq!(state.settings.focused, 2);

        let cmd = handle_key(key(KeyCode::Enter), &mut state);
        match cmd {
            Some(UserCommand::SaveCredentials(creds)) => {
                assert_eq!(creds.openai_api_key.as_deref(), Some("sk-openai"));
                assert_eq!(creds.anthropic_api_key, None);
                assert_eq!(creds.gemini_api_key.as_deref(), Some("gem"));
            }
            other => panic!("expected SaveCredentials, got {:?}", other),
        }
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.settings.openai.is_empty());
    }

    #[test]
    fn settings_focus_wraps_both_ways() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('s')), &mut state);
        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.settings.focused, 2);
        handle_key(key(KeyCode::Down), &mut state);
        assert_eq!(state.settings.focused, 0);
    }

    #[test]
    fn settings_esc_discards_input() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('s')), &mut state);
        type_text(&mut state, "secret");
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), None);
        assert_eq!(state.mode, InputMode::Normal);
        assert!(state.settings.openai.is_empty());
    }

    #[test]
    fn quit_requires_confirmation() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), None);
        assert_eq!(state.mode, InputMode::ConfirmQuit);

        // Other keys are blocked
        assert_eq!(handle_key(key(KeyCode::Char('u')), &mut state), None);
        assert_eq!(state.mode, InputMode::ConfirmQuit);

        assert_eq!(handle_key(key(KeyCode::Char('n')), &mut state), None);
        assert_eq!(state.mode, InputMode::Normal);

        handle_key(key(KeyCode::Char('q')), &mut state);
        assert_eq!(handle_key(key(KeyCode::Char('y')), &mut state), Some(UserCommand::Quit));
    }

    #[test]
    fn confirm_quit_esc_cancels() {
        let mut state = ViewState::default();
        state.mode = InputMode::ConfirmQuit;
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), None);
        assert_eq!(state.mode, InputMode::Normal);
    }
}
