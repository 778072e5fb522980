pub mod config;
pub mod res;
pub mod rooms;

use axum::{extract::FromRef, routing::get, Router};
use tower_http::trace::TraceLayer;

use rooms::{Hub, HubHandle};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub hub: HubHandle,
}

impl AppState {
    /// Spawns the room hub, so this needs a running tokio runtime.
    pub fn new() -> Self {
        Self { hub: Hub::spawn() }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(res::index))
        .merge(rooms::router())

        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
