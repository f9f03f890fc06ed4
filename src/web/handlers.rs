use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game::pgn;
use crate::llm::provider::Provider;

use super::errors::ApiError;
use super::SharedState;

// =========================================================================
// Request / response bodies
// =========================================================================

#[derive(Debug, Deserialize, Default)]
pub struct MoveRequest {
    #[serde(default)]
    pub pgn: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MoveResponse {
    pub reasoning: String,
    /// The move in UCI, as applied.
    #[serde(rename = "move")]
    pub mv: String,
    pub san: String,
    /// Position after the move.
    pub fen: String,
    pub status: String,
    pub game_over: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub default: String,
    /// Providers with a key configured on the server.
    pub configured: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =========================================================================
// Health
// =========================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =========================================================================
// Models
// =========================================================================

/// GET /api/models
pub async fn list_models(State(state): State<SharedState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.models.clone(),
        default: state.default_model.clone(),
        configured: state
            .llm
            .configured_providers()
            .into_iter()
            .map(|p| p.id().to_string())
            .collect(),
    })
}

// =========================================================================
// AI move
// =========================================================================

/// POST /api/move
///
/// Replays `pgn`, asks `model` for the side to move's best move and returns
/// it only if it is legal.
pub async fn make_move(
    State(state): State<SharedState>,
    Json(input): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let pgn_text = input.pgn.unwrap_or_default();
    let model = input.model.unwrap_or_default();
    if pgn_text.trim().is_empty() || model.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing PGN or model".to_string()));
    }

    let api_key = input
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    if api_key.is_none() && !state.llm.has_key_for(&model) {
        return Err(ApiError::BadRequest("Missing API Key".to_string()));
    }
    if Provider::from_model(&model).is_none() {
        return Err(ApiError::BadRequest("Unsupported model".to_string()));
    }

    let mut game = pgn::parse(&pgn_text).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if game.is_game_over() {
        return Err(ApiError::BadRequest(format!(
            "Game is already over: {}",
            game.status_text()
        )));
    }

    let reply = state
        .llm
        .request_move(&pgn_text, &game, &model, api_key)
        .await?;

    let played = game
        .play_uci(&reply.mv, state.default_promotion)
        .map_err(|_| ApiError::IllegalAiMove {
            mv: reply.mv.clone(),
        })?;
    let (mv, san) = (played.uci.clone(), played.san.clone());
    info!(model = %model, %mv, %san, "AI move accepted");

    Ok(Json(MoveResponse {
        reasoning: reply.reasoning,
        mv,
        san,
        fen: game.fen(),
        status: game.status_text(),
        game_over: game.is_game_over(),
    }))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use crate::llm::client::LlmClient;
    use crate::web::router::create_router;
    use crate::web::WebState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use shakmaty::Role;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    fn test_config(credentials: CredentialsConfig, endpoints: EndpointsConfig) -> Config {
        Config {
            game: GameConfig {
                human_color: Side::White,
                default_promotion: "q".to_string(),
            },
            llm: LlmConfig {
                model: "claude-3-5-sonnet-latest".to_string(),
                models: vec![
                    "gpt-4o".to_string(),
                    "claude-3-5-sonnet-latest".to_string(),
                    "gemini-1.5-pro".to_string(),
                ],
                max_tokens: 256,
                request_timeout_secs: 5,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5001,
            },
            endpoints,
            credentials,
            base_dir: std::env::temp_dir(),
        }
    }

    fn test_state() -> SharedState {
        WebState::from_config(&test_config(
            CredentialsConfig::default(),
            EndpointsConfig::default(),
        ))
    }

    /// State whose Anthropic endpoint is a mock that streams `reply_text`.
    async fn mock_state(reply_text: &str) -> SharedState {
        let data = serde_json::json!({ "delta": { "text": reply_text } }).to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\n\
             event: content_block_delta\r\ndata: {data}\r\n\r\n\
             event: message_stop\r\ndata: {{}}\r\n\r\n"
        );
        mock_state_raw(response).await
    }

    async fn mock_state_raw(response: String) -> SharedState {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });

        let endpoints = EndpointsConfig {
            anthropic: format!("http://{addr}"),
            ..Default::default()
        };
        WebState::from_config(&test_config(CredentialsConfig::default(), endpoints))
    }

    async fn post_move(state: SharedState, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let resp = create_router(state)
            .oneshot(
                Request::post("/api/move")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(state: SharedState, uri: &str) -> (StatusCode, String) {
        let resp = create_router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    // --- Static pages ---

    #[tokio::test]
    async fn index_and_assets_are_served() {
        let (status, body) = get(test_state(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("id=\"board\""));
        assert!(body.contains("/static/js/game.js"));

        let (status, body) = get(test_state(), "/static/js/game.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/move"));

        let (status, _) = get(test_state(), "/static/css/style.css").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (status, _) = get(test_state(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // --- Health / models ---

    #[tokio::test]
    async fn health_returns_ok() {
        let (status, body) = get(test_state(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn models_lists_configuration() {
        let state = WebState::from_config(&test_config(
            CredentialsConfig {
                gemini_api_key: Some("g".into()),
                ..Default::default()
            },
            EndpointsConfig::default(),
        ));
        let (status, body) = get(state, "/api/models").await;
        assert_eq!(status, StatusCode::OK);
        let json: ModelsResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(json.models.len(), 3);
        assert_eq!(json.default, "claude-3-5-sonnet-latest");
        assert_eq!(json.configured, vec!["gemini".to_string()]);
    }

    // --- Validation ---

    #[tokio::test]
    async fn missing_pgn_or_model_is_400() {
        let (status, json) = post_move(
            test_state(),
            serde_json::json!({ "pgn": "", "model": "gpt-4o", "api_key": "k" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing PGN or model");

        let (status, json) =
            post_move(test_state(), serde_json::json!({ "pgn": "1. e4" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing PGN or model");
    }

    #[tokio::test]
    async fn missing_api_key_is_400() {
        let (status, json) = post_move(
            test_state(),
            serde_json::json!({ "pgn": "1. e4", "model": "gpt-4o", "api_key": "" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing API Key");
    }

    #[tokio::test]
    async fn unsupported_model_is_400() {
        let (status, json) = post_move(
            test_state(),
            serde_json::json!({ "pgn": "1. e4", "model": "llama-3", "api_key": "k" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Unsupported model");
    }

    #[tokio::test]
    async fn illegal_pgn_is_400() {
        let (status, json) = post_move(
            test_state(),
            serde_json::json!({ "pgn": "1. e4 e4", "model": "gpt-4o", "api_key": "k" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("ply 2"), "{message}");
    }

    #[tokio::test]
    async fn finished_game_is_400() {
        let (status, json) = post_move(
            test_state(),
            serde_json::json!({
                "pgn": "1. f3 e5 2. g4 Qh4#",
                "model": "gpt-4o",
                "api_key": "k"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("checkmate"));
    }

    // --- Round trips against a mock provider ---

    #[tokio::test]
    async fn legal_ai_move_is_applied() {
        let state = mock_state(r#"{"reasoning": "Mirror the centre.", "move": "E7E5"}"#).await;
        let (status, json) = post_move(
            state,
            serde_json::json!({
                "pgn": "1. e4",
                "model": "claude-3-5-sonnet-latest",
                "api_key": "sk-ant"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{json}");
        let body: MoveResponse = serde_json::from_value(json).unwrap();
        assert_eq!(body.mv, "e7e5");
        assert_eq!(body.san, "e5");
        assert_eq!(body.reasoning, "Mirror the centre.");
        assert_eq!(body.status, "White to move");
        assert!(!body.game_over);

        let mut expected = crate::game::ChessGame::new();
        expected.play_uci("e2e4", Role::Queen).unwrap();
        expected.play_uci("e7e5", Role::Queen).unwrap();
        assert_eq!(body.fen, expected.fen());
    }

    #[tokio::test]
    async fn stray_promotion_letter_in_ai_move_is_dropped() {
        let state = mock_state(r#"{"reasoning": "Centre.", "move": "e7e5q"}"#).await;
        let (status, json) = post_move(
            state,
            serde_json::json!({
                "pgn": "1. e4",
                "model": "claude-3-5-sonnet-latest",
                "api_key": "sk-ant"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{json}");
        let body: MoveResponse = serde_json::from_value(json).unwrap();
        assert_eq!(body.mv, "e7e5");
        assert_eq!(body.san, "e5");
    }

    #[tokio::test]
    async fn illegal_ai_move_is_422() {
        let state = mock_state(r#"{"reasoning": "Bold.", "move": "e7e4"}"#).await;
        let (status, json) = post_move(
            state,
            serde_json::json!({
                "pgn": "1. e4",
                "model": "claude-3-5-sonnet-latest",
                "api_key": "sk-ant"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "AI tried to make an illegal move: e7e4");
        assert_eq!(json["move"], "e7e4");
    }

    #[tokio::test]
    async fn unparseable_reply_is_500() {
        let state = mock_state("I resign.").await;
        let (status, json) = post_move(
            state,
            serde_json::json!({
                "pgn": "1. e4",
                "model": "claude-3-5-sonnet-latest",
                "api_key": "sk-ant"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Could not parse JSON from model response");
    }

    #[tokio::test]
    async fn provider_error_is_500() {
        let body = r#"{"error":{"message":"Overloaded"}}"#;
        let response = format!(
            "HTTP/1.1 529 Overloaded\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let state = mock_state_raw(response).await;
        let (status, json) = post_move(
            state,
            serde_json::json!({
                "pgn": "1. e4",
                "model": "claude-3-5-sonnet-latest",
                "api_key": "sk-ant"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("Overloaded"), "{message}");
    }

    #[tokio::test]
    async fn configured_key_is_used_when_request_has_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let data = serde_json::json!({ "delta": { "text": "{\"move\":\"c7c5\"}" } });
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\n\
                 event: content_block_delta\r\ndata: {data}\r\n\r\n\
                 event: message_stop\r\ndata: {{}}\r\n\r\n"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let config = test_config(
            CredentialsConfig {
                anthropic_api_key: Some("sk-server".into()),
                ..Default::default()
            },
            EndpointsConfig {
                anthropic: format!("http://{addr}"),
                ..Default::default()
            },
        );
        let state = Arc::new(WebState {
            llm: LlmClient::from_config(&config),
            models: config.llm.models.clone(),
            default_model: config.llm.model.clone(),
            default_promotion: Role::Queen,
        });

        let (status, json) = post_move(
            state,
            serde_json::json!({ "pgn": "1. e4", "model": "claude-3-5-sonnet-latest" }),
        )
        .await;
        let request = server.await.unwrap();

        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["san"], "c5");
        assert!(request.contains("x-api-key: sk-server"));
    }
}
