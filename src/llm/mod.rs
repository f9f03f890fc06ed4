// LLM opponent: provider selection, prompts, streaming clients and reply
// parsing.

pub mod client;
pub mod prompt;
pub mod provider;
pub mod reply;

use thiserror::Error;

use self::provider::Provider;
use self::reply::ReplyError;

/// Failure of a move request, from model selection to reply parsing.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unsupported model")]
    UnsupportedModel(String),

    #[error("Missing API Key")]
    MissingApiKey(Provider),

    #[error("{0}")]
    Api(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}
