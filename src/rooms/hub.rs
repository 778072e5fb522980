//! The single event loop every connection funnels into.
//!
//! One task owns the [`Registry`], the [`Outbox`] and every connection's [`Session`], and
//! handles [`HubEvent`]s strictly one at a time. Eviction timers post back into the same
//! loop, so "is this room still empty" is never read while a join is half done.

use std::{collections::HashMap, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    event::{ClientEvent, ServerEvent},
    outbox::{ConnId, Outbox},
    registry::{EVICTION_GRACE, Registry},
    session::Session,
};

#[derive(Debug)]
pub enum HubEvent {
    Connect {
        conn: ConnId,
        tx: mpsc::UnboundedSender<ServerEvent>,
    },
    Client {
        conn: ConnId,
        event: ClientEvent,
    },
    Disconnect {
        conn: ConnId,
    },
}

/// Cheap to clone; this is what the transport holds.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
}

impl HubHandle {
    fn post(&self, event: HubEvent) {
        if self.tx.send(event).is_err() {
            warn!("hub is gone, dropping event");
        }
    }

    pub fn connect(&self, conn: ConnId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.post(HubEvent::Connect { conn, tx });
    }

    pub fn client(&self, conn: ConnId, event: ClientEvent) {
        self.post(HubEvent::Client { conn, event });
    }

    pub fn disconnect(&self, conn: ConnId) {
        self.post(HubEvent::Disconnect { conn });
    }
}

pub struct Hub {
    registry: Registry,
    outbox: Outbox,
    sessions: HashMap<ConnId, Session>,
}

impl Hub {
    pub fn new(grace: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let hub = Self {
            registry: Registry::new(grace, expired_tx),
            outbox: Outbox::default(),
            sessions: HashMap::new(),
        };
        (hub, expired_rx)
    }

    /// Starts the loop on the current runtime. It stops once every handle is dropped.
    pub fn spawn() -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (hub, expired) = Self::new(EVICTION_GRACE);
        tokio::spawn(hub.run(rx, expired));
        HubHandle { tx }
    }

    /// Runs until every [`HubHandle`] is dropped, then hands the final state back.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<HubEvent>,
        mut expired: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                Some(code) = expired.recv() => self.expire(&code),
            }
        }
        debug!(rooms = self.registry.len(), "hub stopped");
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connect { conn, tx } => {
                debug!(%conn, "connected");
                self.outbox.register(conn, tx);
                self.sessions.insert(conn, Session::Unbound);
            }
            HubEvent::Client { conn, event } => {
                let Some(session) = self.sessions.get_mut(&conn) else {
                    debug!(%conn, "event from unknown connection");
                    return;
                };

                let result = match event {
                    ClientEvent::Join { code, username } => session.join(
                        conn,
                        &mut self.registry,
                        &mut self.outbox,
                        &code,
                        username.as_deref(),
                    ),
                    ClientEvent::Message { text } => session.message(&mut self.registry, &self.outbox, &text),
                };
                if let Err(err) = result {
                    debug!(%conn, %err, "ignored client event");
                }
            }
            HubEvent::Disconnect { conn } => {
                let session = self.sessions.remove(&conn);
                self.outbox.unregister(conn, session.as_ref().and_then(Session::code));
                let Some(session) = session else {
                    return;
                };

                debug!(%conn, "disconnected");
                if let Err(err) = session.disconnect(&mut self.registry, &self.outbox) {
                    debug!(%conn, %err, "nothing to clean up");
                }
            }
        }
    }

    pub fn expire(&mut self, code: &str) {
        self.registry.evict_if_empty(code);
    }
}
