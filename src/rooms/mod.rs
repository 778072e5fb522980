mod error;
mod event;
mod hub;
mod outbox;
mod registry;
mod session;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use error::SessionError;
pub use event::{ClientEvent, ServerEvent};
pub use hub::{Hub, HubEvent, HubHandle};
pub use outbox::ConnId;
pub use registry::{Registry, Room, EVICTION_GRACE};
pub use session::{is_room_code, resolve_username, Session};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::room_ws))
}
