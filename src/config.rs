// Configuration loading and parsing (settings.toml, credentials.toml).

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::promotion_role;
use crate::llm::provider::Provider;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("failed to write {path}: {message}")]
    WriteError { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub game: GameConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub endpoints: EndpointsConfig,
    pub credentials: CredentialsConfig,
    /// Directory containing `config/` (and `defaults/`); credentials are
    /// saved back here.
    pub base_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// settings.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire settings.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    game: GameConfig,
    llm: LlmConfig,
    server: ServerConfig,
    #[serde(default)]
    endpoints: EndpointsConfig,
}

/// Which side the human plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn color(self) -> Color {
        match self {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub human_color: Side,
    /// Promotion piece (`q`, `r`, `b`, `n`) used when a move omits one.
    pub default_promotion: String,
}

impl GameConfig {
    /// The configured promotion role. Validated at load time; queen
    /// otherwise.
    pub fn promotion(&self) -> Role {
        promotion_role(&self.default_promotion).unwrap_or(Role::Queen)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Model used for the AI opponent at startup.
    pub model: String,
    /// Models offered in the model selector.
    pub models: Vec<String>,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// API base URLs, overridable for proxies and tests.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointsConfig {
    pub openai: String,
    pub anthropic: String,
    pub gemini: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        EndpointsConfig {
            openai: "https://api.openai.com".to_string(),
            anthropic: "https://api.anthropic.com".to_string(),
            gemini: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl EndpointsConfig {
    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Gemini => &self.gemini,
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CredentialsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
}

impl CredentialsConfig {
    /// The non-empty key configured for `provider`, if any.
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenAi => &self.openai_api_key,
            Provider::Anthropic => &self.anthropic_api_key,
            Provider::Gemini => &self.gemini_api_key,
        };
        key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Keys from `update` where given, otherwise the ones already stored.
    pub fn merge(&self, update: CredentialsConfig) -> Self {
        let update = update.normalized();
        CredentialsConfig {
            openai_api_key: update.openai_api_key.or_else(|| self.openai_api_key.clone()),
            anthropic_api_key: update
                .anthropic_api_key
                .or_else(|| self.anthropic_api_key.clone()),
            gemini_api_key: update.gemini_api_key.or_else(|| self.gemini_api_key.clone()),
        }
        .normalized()
    }

    /// Drop empty strings so they are not written back as `""`.
    pub fn normalized(self) -> Self {
        let keep = |k: Option<String>| {
            k.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        CredentialsConfig {
            openai_api_key: keep(self.openai_api_key),
            anthropic_api_key: keep(self.anthropic_api_key),
            gemini_api_key: keep(self.gemini_api_key),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/settings.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config_in()` which handles default initialization.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- settings.toml (required) ---
    let settings_path = config_dir.join("settings.toml");
    let settings_text = read_file(&settings_path)?;
    let settings: SettingsFile =
        toml::from_str(&settings_text).map_err(|e| ConfigError::ParseError {
            path: settings_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        game: settings.game,
        llm: settings.llm,
        server: settings.server,
        endpoints: settings.endpoints,
        credentials,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --config-dir",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to `base_dir`, copying defaults first.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

/// Write API keys to `config/credentials.toml` under `base_dir`, replacing
/// the file. Empty keys are omitted.
pub fn save_credentials(
    base_dir: &Path,
    credentials: &CredentialsConfig,
) -> Result<PathBuf, ConfigError> {
    let config_dir = base_dir.join("config");
    let path = config_dir.join("credentials.toml");
    let write_err = |message: String| ConfigError::WriteError {
        path: path.clone(),
        message,
    };

    std::fs::create_dir_all(&config_dir).map_err(|e| write_err(e.to_string()))?;
    let text = toml::to_string(&credentials.clone().normalized())
        .map_err(|e| write_err(e.to_string()))?;
    std::fs::write(&path, text).map_err(|e| write_err(e.to_string()))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if promotion_role(&config.game.default_promotion).is_none() {
        return Err(ConfigError::ValidationError {
            field: "game.default_promotion".into(),
            message: format!(
                "must be one of q, r, b, n; got {:?}",
                config.game.default_promotion
            ),
        });
    }

    let llm = &config.llm;
    if llm.models.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.models".into(),
            message: "must list at least one model".into(),
        });
    }
    for model in llm.models.iter().chain(std::iter::once(&llm.model)) {
        if Provider::from_model(model).is_none() {
            return Err(ConfigError::ValidationError {
                field: "llm.models".into(),
                message: format!("no provider for model {model:?} (expected gpt, claude or gemini)"),
            });
        }
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::ValidationError {
            field: "llm.max_tokens".into(),
            message: "must be greater than 0".into(),
        });
    }
    if llm.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "llm.request_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.server.host.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".into(),
            message: "must not be empty".into(),
        });
    }
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
