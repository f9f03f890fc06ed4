// HTTP server for the browser front-end.
//
// Serves the single-page board UI and the `/api/move` endpoint that replays
// the browser's PGN, asks the selected model for a move and validates it.

pub mod assets;
pub mod errors;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use shakmaty::Role;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::llm::client::LlmClient;

/// State shared by all handlers.
#[derive(Debug)]
pub struct WebState {
    pub llm: LlmClient,
    pub models: Vec<String>,
    pub default_model: String,
    pub default_promotion: Role,
}

pub type SharedState = Arc<WebState>;

impl WebState {
    pub fn from_config(config: &Config) -> SharedState {
        Arc::new(WebState {
            llm: LlmClient::from_config(config),
            models: config.llm.models.clone(),
            default_model: config.llm.model.clone(),
            default_promotion: config.game.promotion(),
        })
    }
}

/// Bind `host:port` and serve the browser front-end until the process exits.
pub async fn run(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let local_addr = listener.local_addr()?;
    info!("web server listening on http://{local_addr}");

    let app = router::create_router(WebState::from_config(config));
    axum::serve(listener, app).await?;
    Ok(())
}
