use std::{collections::HashMap, time::Duration};

use indexmap::IndexSet;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How long a room may sit empty before it is dropped.
pub const EVICTION_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
pub struct Room {
    pub messages: Vec<String>,
    pub users: IndexSet<String>,
}

/// Every live room, keyed by its code.
///
/// Nothing here checks the shape of a code; callers validate before they get this far.
/// Deletion is two-step: [`Registry::schedule_eviction_if_empty`] arms a timer that posts
/// the code to the `expired` channel, and whoever drains that channel calls
/// [`Registry::evict_if_empty`], which looks at the room again before removing it.
pub struct Registry {
    rooms: HashMap<String, Room>,
    grace: Duration,
    expired: mpsc::UnboundedSender<String>,
}

impl Registry {
    pub fn new(grace: Duration, expired: mpsc::UnboundedSender<String>) -> Self {
        Self {
            rooms: HashMap::new(),
            grace,
            expired,
        }
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rooms.contains_key(code)
    }

    pub(crate) fn len(&self) -> usize {
        self.rooms.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get_or_create(&mut self, code: &str) -> &mut Room {
        self.rooms.entry(code.to_owned()).or_insert_with(|| {
            info!(room = %code, "created room");
            Room::default()
        })
    }

    /// Returns false when the room doesn't exist.
    pub fn add_user(&mut self, code: &str, username: &str) -> bool {
        let Some(room) = self.rooms.get_mut(code) else {
            return false;
        };
        room.users.insert(username.to_owned());
        true
    }

    pub fn remove_user(&mut self, code: &str, username: &str) {
        if let Some(room) = self.rooms.get_mut(code) {
            room.users.shift_remove(username);
        }
    }

    pub fn append_message(&mut self, code: &str, text: String) -> bool {
        let Some(room) = self.rooms.get_mut(code) else {
            return false;
        };
        room.messages.push(text);
        true
    }

    /// Arms a grace timer if the room is empty right now. Each call gets its own timer.
    pub fn schedule_eviction_if_empty(&self, code: &str) {
        if !self.rooms.get(code).is_some_and(|room| room.users.is_empty()) {
            return;
        }

        debug!(room = %code, grace = ?self.grace, "room empty, scheduling eviction");
        let expired = self.expired.clone();
        let grace = self.grace;
        let code = code.to_owned();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            // the loop may already be gone on shutdown
            let _ = expired.send(code);
        });
    }

    /// Timer expiry. Removes the room only if it is still there and still empty.
    pub fn evict_if_empty(&mut self, code: &str) -> bool {
        if !self.rooms.get(code).is_some_and(|room| room.users.is_empty()) {
            return false;
        }

        self.rooms.remove(code);
        info!(room = %code, "deleted room (empty)");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (Registry, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Registry::new(EVICTION_GRACE, tx), rx)
    }

    #[test]
    fn rooms_are_created_lazily() {
        let (mut registry, _rx) = registry();
        assert!(!registry.contains("123456"));
        assert!(!registry.add_user("123456", "ann"));
        assert!(registry.is_empty());

        registry.get_or_create("123456");
        assert!(registry.add_user("123456", "ann"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_or_create_keeps_existing_room() {
        let (mut registry, _rx) = registry();
        registry.get_or_create("123456");
        registry.append_message("123456", "ann: hi".to_owned());

        let room = registry.get_or_create("123456");
        assert_eq!(room.messages, ["ann: hi"]);
    }

    #[test]
    fn users_collapse_by_name_and_keep_join_order() {
        let (mut registry, _rx) = registry();
        registry.get_or_create("000001");
        for name in ["carl", "ann", "carl", "bob"] {
            registry.add_user("000001", name);
        }

        let users: Vec<_> = registry.get("000001").unwrap().users.iter().cloned().collect();
        assert_eq!(users, ["carl", "ann", "bob"]);

        registry.remove_user("000001", "ann");
        let users: Vec<_> = registry.get("000001").unwrap().users.iter().cloned().collect();
        assert_eq!(users, ["carl", "bob"]);
    }

    #[test]
    fn missing_room_mutations_are_noops() {
        let (mut registry, _rx) = registry();
        registry.remove_user("999999", "ann");
        assert!(!registry.append_message("999999", "ann: hi".to_owned()));
        assert!(!registry.evict_if_empty("999999"));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_room_is_evicted_after_grace() {
        let (mut registry, mut rx) = registry();
        registry.get_or_create("123456");
        registry.schedule_eviction_if_empty("123456");

        let start = tokio::time::Instant::now();
        let code = rx.recv().await.unwrap();
        assert!(start.elapsed() >= EVICTION_GRACE);
        assert_eq!(code, "123456");

        assert!(registry.evict_if_empty(&code));
        assert!(!registry.contains("123456"));
    }

    #[tokio::test(start_paused = true)]
    async fn occupied_room_is_not_scheduled() {
        let (mut registry, mut rx) = registry();
        registry.get_or_create("123456");
        registry.add_user("123456", "ann");
        registry.schedule_eviction_if_empty("123456");

        tokio::time::sleep(EVICTION_GRACE * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn repopulated_room_survives_expiry() {
        let (mut registry, mut rx) = registry();
        registry.get_or_create("123456");
        registry.schedule_eviction_if_empty("123456");
        registry.add_user("123456", "ann");

        let code = rx.recv().await.unwrap();
        assert!(!registry.evict_if_empty(&code));
        assert!(registry.get("123456").unwrap().users.contains("ann"));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_timers_tolerate_deleted_room() {
        let (mut registry, mut rx) = registry();
        registry.get_or_create("123456");
        registry.schedule_eviction_if_empty("123456");
        registry.schedule_eviction_if_empty("123456");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(registry.evict_if_empty(&first));
        assert!(!registry.evict_if_empty(&second));
        assert!(registry.is_empty());
    }
}
