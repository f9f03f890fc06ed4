// Model-name based provider selection.

use std::fmt;

/// A chat-completion API the opponent can be backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl Provider {
    /// Pick the provider for a model name by substring (`gpt`, `claude`,
    /// `gemini`). Returns `None` for anything else.
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.to_ascii_lowercase();
        if model.contains("gpt") {
            Some(Provider::OpenAi)
        } else if model.contains("claude") {
            Some(Provider::Anthropic)
        } else if model.contains("gemini") {
            Some(Provider::Gemini)
        } else {
            None
        }
    }

    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Gemini];

    /// Lower-case identifier, as used by the browser's key storage.
    pub fn id(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
