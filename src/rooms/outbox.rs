use std::collections::HashMap;

use indexmap::IndexSet;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use super::event::ServerEvent;

pub type ConnId = Uuid;

/// Outbound side of every open connection, plus which room group each one listens to.
#[derive(Default)]
pub struct Outbox {
    conns: HashMap<ConnId, mpsc::UnboundedSender<ServerEvent>>,
    groups: HashMap<String, IndexSet<ConnId>>,
}

impl Outbox {
    pub fn register(&mut self, conn: ConnId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.conns.insert(conn, tx);
    }

    /// Drops the connection, and its subscription to `code` if it had one.
    pub fn unregister(&mut self, conn: ConnId, code: Option<&str>) {
        self.conns.remove(&conn);

        let Some(code) = code else {
            return;
        };
        if let Some(members) = self.groups.get_mut(code) {
            members.shift_remove(&conn);
            if members.is_empty() {
                self.groups.remove(code);
            }
        }
    }

    pub fn subscribe(&mut self, conn: ConnId, code: &str) {
        self.groups.entry(code.to_owned()).or_default().insert(conn);
    }

    pub fn send(&self, conn: ConnId, event: ServerEvent) {
        if let Some(tx) = self.conns.get(&conn) {
            // closed receiver means the socket is going away; its disconnect cleans up
            let _ = tx.send(event);
        }
    }

    pub fn broadcast(&self, code: &str, event: ServerEvent) {
        let Some(members) = self.groups.get(code) else {
            return;
        };

        trace!(room = %code, members = members.len(), ?event, "broadcast");
        for conn in members {
            self.send(*conn, event.clone());
        }
    }

    #[cfg(test)]
    pub fn group_len(&self, code: &str) -> usize {
        self.groups.get(code).map_or(0, IndexSet::len)
    }
}
