// Route table for the browser front-end.

use axum::routing::{get, post};
use axum::Router;

use super::{assets, handlers, SharedState};

/// Build the application router.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/static/js/game.js", get(assets::game_js))
        .route("/static/css/style.css", get(assets::style_css))
        .route("/health", get(handlers::health))
        .route("/api/models", get(handlers::list_models))
        .route("/api/move", post(handlers::make_move))
        .with_state(state)
}
