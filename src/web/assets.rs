// Static files compiled into the binary.

use axum::http::header;
use axum::response::{Html, IntoResponse};

pub const INDEX_HTML: &str = include_str!("../../static/index.html");
pub const GAME_JS: &str = include_str!("../../static/js/game.js");
pub const STYLE_CSS: &str = include_str!("../../static/css/style.css");

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /static/js/game.js
pub async fn game_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        GAME_JS,
    )
}

/// GET /static/css/style.css
pub async fn style_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}
