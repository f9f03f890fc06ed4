// Streaming chat clients for OpenAI, Anthropic and Gemini using
// reqwest-eventsource.
//
// Each provider is asked for a streamed response; the Server-Sent Events are
// parsed into `LlmEvent` variants and forwarded over an mpsc channel for the
// app orchestrator to consume. `complete` and `request_move` build the
// blocking request/response flow used by the HTTP endpoint on top of that.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::prompt::{build_move_prompt, system_prompt};
use super::provider::Provider;
use super::reply::{parse_reply, MoveReply};
use super::LlmError;
use crate::config::{Config, CredentialsConfig, EndpointsConfig};
use crate::game::ChessGame;
use crate::protocol::LlmEvent;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_DONE: &str = "[DONE]";

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Low-level streaming client bound to one provider, model and key.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    provider: Provider,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Create a client for `model` on `provider`, talking to `base_url`
    /// (scheme and host, no path).
    #[cfg(test)]
    pub fn new(provider: Provider, base_url: &str, api_key: String, model: String) -> Self {
        Self::with_http(reqwest::Client::new(), provider, base_url, api_key, model)
    }

    fn with_http(
        http: reqwest::Client,
        provider: Provider,
        base_url: &str,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            http,
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a prompt and stream the response as `LlmEvent`s over `tx`.
    ///
    /// The `generation` counter is threaded through every emitted event so that
    /// the receiving side can discard stale events from cancelled tasks.
    ///
    /// The method returns when the stream is complete, an error occurs, or the
    /// receiver is dropped.
    pub async fn stream_message(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        tx: mpsc::Sender<LlmEvent>,
        generation: u64,
    ) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "API key not configured".to_string(),
                    generation,
                })
                .await;
            return Ok(());
        }

        let request = self.build_request(system, user_content, max_tokens);
        let mut es = match request.eventsource() {
            Ok(es) => es,
            Err(e) => {
                let _ = tx
                    .send(LlmEvent::Error {
                        message: format!("Failed to create event source: {e}"),
                        generation,
                    })
                    .await;
                return Ok(());
            }
        };

        debug!(provider = %self.provider, model = %self.model, generation, "streaming request");

        let mut full_text = String::new();
        let mut usage = Usage::default();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    match interpret_message(self.provider, &msg.event, &msg.data, &mut usage) {
                        Chunk::Text(text) => {
                            full_text.push_str(&text);
                            if tx.send(LlmEvent::Token { text, generation }).await.is_err() {
                                // Receiver dropped, nobody is listening.
                                es.close();
                                return Ok(());
                            }
                        }
                        Chunk::Stop => {
                            debug!(
                                input_tokens = usage.input_tokens,
                                output_tokens = usage.output_tokens,
                                "streaming complete"
                            );
                            es.close();
                            finish(&tx, full_text, usage, generation).await;
                            return Ok(());
                        }
                        Chunk::Failed(message) => {
                            warn!(%message, "provider reported an error mid-stream");
                            es.close();
                            let _ = tx.send(LlmEvent::Error { message, generation }).await;
                            return Ok(());
                        }
                        Chunk::Skip => {
                            debug!(event_type = %msg.event, "ignoring SSE event");
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    // Gemini signals completion by closing the stream.
                    es.close();
                    finish(&tx, full_text, usage, generation).await;
                    return Ok(());
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    let message = describe_error(err).await;
                    let _ = tx.send(LlmEvent::Error { message, generation }).await;
                    return Ok(());
                }
            }
        }

        finish(&tx, full_text, usage, generation).await;
        Ok(())
    }

    /// Stream a prompt to completion and return the whole text.
    ///
    /// Fails with [`LlmError::Timeout`] if the response does not finish within
    /// `timeout`.
    pub async fn complete(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let (tx, mut rx) = mpsc::channel(64);

        let collect = async move {
            let mut outcome = None;
            while let Some(event) = rx.recv().await {
                match event {
                    LlmEvent::Token { .. } => {}
                    LlmEvent::Complete { full_text, .. } => outcome = Some(Ok(full_text)),
                    LlmEvent::Error { message, .. } => outcome = Some(Err(LlmError::Api(message))),
                }
            }
            outcome
        };

        let run = async {
            let (streamed, outcome) =
                tokio::join!(self.stream_message(system, user_content, max_tokens, tx, 0), collect);
            streamed.map_err(|e| LlmError::Api(e.to_string()))?;
            outcome.unwrap_or_else(|| Err(LlmError::Api("Stream produced no result".to_string())))
        };

        tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| LlmError::Timeout(timeout.as_secs()))?
    }

    fn build_request(
        &self,
        system: &str,
        user_content: &str,
        max_tokens: u32,
    ) -> reqwest::RequestBuilder {
        match self.provider {
            Provider::OpenAi => {
                let body = serde_json::json!({
                    "model": self.model,
                    "stream": true,
                    "stream_options": { "include_usage": true },
                    "response_format": { "type": "json_object" },
                    "messages": [
                        { "role": "system", "content": system },
                        { "role": "user", "content": user_content }
                    ]
                });
                self.http
                    .post(format!("{}/v1/chat/completions", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&body)
            }
            Provider::Anthropic => {
                let body = serde_json::json!({
                    "model": self.model,
                    "max_tokens": max_tokens,
                    "stream": true,
                    "system": system,
                    "messages": [{ "role": "user", "content": user_content }]
                });
                self.http
                    .post(format!("{}/v1/messages", self.base_url))
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            }
            Provider::Gemini => {
                let body = serde_json::json!({
                    "systemInstruction": { "parts": [{ "text": system }] },
                    "contents": [{ "role": "user", "parts": [{ "text": user_content }] }],
                    "generationConfig": {
                        "maxOutputTokens": max_tokens,
                        "responseMimeType": "application/json"
                    }
                });
                self.http
                    .post(format!(
                        "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                        self.base_url, self.model
                    ))
                    .header("x-goog-api-key", &self.api_key)
                    .json(&body)
            }
        }
    }
}

/// Send the terminal event for a stream that stopped cleanly.
async fn finish(tx: &mpsc::Sender<LlmEvent>, full_text: String, usage: Usage, generation: u64) {
    let event = if full_text.is_empty() {
        LlmEvent::Error {
            message: "Stream ended unexpectedly without any content".to_string(),
            generation,
        }
    } else {
        LlmEvent::Complete {
            full_text,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            generation,
        }
    };
    let _ = tx.send(event).await;
}

// ---------------------------------------------------------------------------
// LlmClient
// ---------------------------------------------------------------------------

/// Hands out [`ChatClient`]s for any configured model and runs whole move
/// requests.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoints: EndpointsConfig,
    credentials: CredentialsConfig,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmClient {
    /// Build an `LlmClient` from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints: config.endpoints.clone(),
            credentials: config.credentials.clone(),
            max_tokens: config.llm.max_tokens,
            timeout: Duration::from_secs(config.llm.request_timeout_secs),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Replace the stored API keys (after the user saved new ones).
    pub fn set_credentials(&mut self, credentials: CredentialsConfig) {
        self.credentials = credentials;
    }

    /// Whether a key is available for `model`'s provider.
    pub fn has_key_for(&self, model: &str) -> bool {
        Provider::from_model(model)
            .and_then(|p| self.credentials.api_key(p))
            .is_some()
    }

    /// Providers with a configured key.
    pub fn configured_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.credentials.api_key(*p).is_some())
            .collect()
    }

    /// Build a client for `model`. A non-empty `api_key` takes precedence over
    /// the configured key for the model's provider.
    pub fn chat_client(&self, model: &str, api_key: Option<&str>) -> Result<ChatClient, LlmError> {
        let provider =
            Provider::from_model(model).ok_or_else(|| LlmError::UnsupportedModel(model.to_string()))?;

        let key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or_else(|| self.credentials.api_key(provider))
            .ok_or(LlmError::MissingApiKey(provider))?;

        Ok(ChatClient::with_http(
            self.http.clone(),
            provider,
            self.endpoints.base_url(provider),
            key.to_string(),
            model.to_string(),
        ))
    }

    /// Ask `model` for its move in `game`'s position and parse the answer.
    ///
    /// The move is returned as the model wrote it; legality is checked by the
    /// caller.
    pub async fn request_move(
        &self,
        pgn: &str,
        game: &ChessGame,
        model: &str,
        api_key: Option<&str>,
    ) -> Result<MoveReply, LlmError> {
        let client = self.chat_client(model, api_key)?;
        let prompt = build_move_prompt(pgn, game);

        info!(provider = %client.provider(), model, "requesting move");
        let text = client
            .complete(system_prompt(), &prompt, self.max_tokens, self.timeout)
            .await?;
        debug!(len = text.len(), "model response received");

        let reply = parse_reply(&text)?;
        info!(model, mv = %reply.mv, "model proposed move");
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Token usage reported by the provider, where available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// What a single SSE message means for the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Chunk {
    Text(String),
    Stop,
    Failed(String),
    Skip,
}

/// Interpret one SSE message from `provider`, updating `usage` as a side
/// effect.
pub(crate) fn interpret_message(
    provider: Provider,
    event_type: &str,
    data: &str,
    usage: &mut Usage,
) -> Chunk {
    match provider {
        Provider::OpenAi => {
            if data.trim() == OPENAI_DONE {
                return Chunk::Stop;
            }
            let Ok(v) = serde_json::from_str::<Value>(data) else {
                return Chunk::Skip;
            };
            if let Some(message) = error_message_in(&v) {
                return Chunk::Failed(message);
            }
            if let Some((input, output)) = parse_openai_usage(&v) {
                usage.input_tokens = input;
                usage.output_tokens = output;
            }
            match parse_openai_delta(&v) {
                Some(text) if !text.is_empty() => Chunk::Text(text),
                _ => Chunk::Skip,
            }
        }
        Provider::Anthropic => match event_type {
            "message_start" => {
                match parse_input_tokens(data) {
                    Some(n) => usage.input_tokens = n,
                    None => warn!("failed to parse input_tokens from message_start"),
                }
                Chunk::Skip
            }
            "content_block_delta" => match parse_delta_text(data) {
                Some(text) => Chunk::Text(text),
                None => Chunk::Skip,
            },
            "message_delta" => {
                match parse_output_tokens(data) {
                    Some(n) => usage.output_tokens = n,
                    None => warn!("failed to parse output_tokens from message_delta"),
                }
                Chunk::Skip
            }
            "message_stop" => Chunk::Stop,
            "error" => Chunk::Failed(
                extract_api_error(data).unwrap_or_else(|| "Provider returned an error".to_string()),
            ),
            // ping, content_block_start, content_block_stop
            _ => Chunk::Skip,
        },
        Provider::Gemini => {
            let Ok(v) = serde_json::from_str::<Value>(data) else {
                return Chunk::Skip;
            };
            if let Some(message) = error_message_in(&v) {
                return Chunk::Failed(message);
            }
            if let Some((input, output)) = parse_gemini_usage(&v) {
                usage.input_tokens = input;
                usage.output_tokens = output;
            }
            match parse_gemini_text(&v) {
                Some(text) if !text.is_empty() => Chunk::Text(text),
                _ => Chunk::Skip,
            }
        }
    }
}

/// Extract `input_tokens` from an Anthropic `message_start` event's JSON.
///
/// Expected shape: `{ "type": "message_start", "message": { "usage": { "input_tokens": N } } }`
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.text` from an Anthropic `content_block_delta` event's JSON.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?.get("text")?.as_str().map(|s| s.to_string())
}

/// Extract `usage.output_tokens` from an Anthropic `message_delta` event's JSON.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// `choices[0].delta.content` of an OpenAI chunk.
pub(crate) fn parse_openai_delta(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

/// `(prompt_tokens, completion_tokens)` from the final OpenAI usage chunk.
pub(crate) fn parse_openai_usage(v: &Value) -> Option<(u32, u32)> {
    let usage = v.get("usage")?;
    let input = usage.get("prompt_tokens")?.as_u64()?;
    let output = usage.get("completion_tokens")?.as_u64()?;
    Some((input as u32, output as u32))
}

/// Concatenated `candidates[0].content.parts[*].text` of a Gemini chunk.
pub(crate) fn parse_gemini_text(v: &Value) -> Option<String> {
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    Some(
        parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
    )
}

/// `(promptTokenCount, candidatesTokenCount)` from a Gemini chunk.
pub(crate) fn parse_gemini_usage(v: &Value) -> Option<(u32, u32)> {
    let meta = v.get("usageMetadata")?;
    let input = meta.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0);
    let output = meta
        .get("candidatesTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Some((input as u32, output as u32))
}

/// `error.message` (or a bare `error` string) of a provider error body.
/// Gemini wraps errors in a one-element array.
pub(crate) fn extract_api_error(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    let v = match v.as_array() {
        Some(items) => items.first()?.clone(),
        None => v,
    };
    error_message_in(&v)
}

fn error_message_in(v: &Value) -> Option<String> {
    let error = v.get("error")?;
    match error.get("message").and_then(Value::as_str) {
        Some(message) => Some(message.to_string()),
        None => error.as_str().map(|s| s.to_string()),
    }
}

/// Human-readable message for an SSE error. For HTTP errors the provider's
/// own message is read from the response body.
async fn describe_error(err: reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            match extract_api_error(&body) {
                Some(message) => format!("API returned status {status}: {message}"),
                None => format!("API returned status {status}"),
            }
        }
        reqwest_eventsource::Error::Transport(e) => format!("Network error: {e}"),
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
