// Parsing of the model's `{reasoning, move}` answer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("Could not parse JSON from model response")]
    NoJson,

    #[error("Invalid JSON in model response: {0}")]
    Json(String),

    #[error("Model response has no move")]
    EmptyMove,
}

/// The model's answer: free-form reasoning plus a move in UCI notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReply {
    #[serde(default)]
    pub reasoning: String,
    #[serde(rename = "move")]
    pub mv: String,
}

/// Extract a [`MoveReply`] from raw model output.
///
/// Markdown code fences are removed, then the text between the first `{`
/// and the last `}` is parsed as JSON.
pub fn parse_reply(text: &str) -> Result<MoveReply, ReplyError> {
    let cleaned = text.replace("```json", "").replace("```", "");

    let start = cleaned.find('{').ok_or(ReplyError::NoJson)?;
    let end = cleaned.rfind('}').ok_or(ReplyError::NoJson)?;
    if end < start {
        return Err(ReplyError::NoJson);
    }

    let mut reply: MoveReply = serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| ReplyError::Json(e.to_string()))?;
    reply.mv = reply.mv.trim().to_string();
    if reply.mv.is_empty() {
        return Err(ReplyError::EmptyMove);
    }
    Ok(reply)
}
