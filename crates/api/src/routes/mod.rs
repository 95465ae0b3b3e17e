pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the relay route tree.
///
/// ```text
/// /eventsub                                        EventSub webhook (POST)
/// /ws                                              WebSocket
/// ```
pub fn relay_routes() -> Router<AppState> {
    Router::new()
        .route("/eventsub", post(handlers::eventsub::receive_notification))
        .route("/ws", get(ws::ws_handler))
}
