//! Embedded browser control page

use axum::Router;
use axum::response::Html;
use axum::routing::get;

/// Build the UI router
pub fn router() -> Router {
    Router::new().route("/", get(index))
}

/// Serve the single-page control UI
async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
