use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade, ws::Message},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::{event::ClientEvent, hub::HubHandle};

#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    State(hub): State<HubHandle>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(async move |stream| {
        let conn = Uuid::now_v7();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut sender, mut receiver) = stream.split();
        hub.connect(conn, tx);

        let send_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%conn, %err, "couldn't encode event");
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }

            let Ok(event) = serde_json::from_slice::<ClientEvent>(&msg.into_data()) else {
                debug!(%conn, "dropping unreadable frame");
                continue
            };

            trace!(%conn, ?event, "received");
            hub.client(conn, event);
        }

        hub.disconnect(conn);
        send_task.abort();
    })
}
