use rand::Rng;
use tracing::info;

use super::{
    error::SessionError,
    event::ServerEvent,
    outbox::{ConnId, Outbox},
    registry::Registry,
};

/// What one connection is bound to. Dropping it is the closed state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unbound,
    Bound {
        code: String,
        username: String,
    },
}

pub fn is_room_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Keeps a non-blank name as given, otherwise makes up `User<0..1000>`.
pub fn resolve_username(raw: Option<&str>) -> String {
    match raw {
        Some(name) if !name.trim().is_empty() => name.to_owned(),
        _ => format!("User{}", rand::rng().random_range(0..1000u32)),
    }
}

impl Session {
    pub fn code(&self) -> Option<&str> {
        match self {
            Session::Unbound => None,
            Session::Bound { code, .. } => Some(code),
        }
    }

    pub fn join(
        &mut self,
        conn: ConnId,
        registry: &mut Registry,
        outbox: &mut Outbox,
        raw_code: &str,
        raw_username: Option<&str>,
    ) -> Result<(), SessionError> {
        if let Session::Bound { code, .. } = self {
            return Err(SessionError::AlreadyJoined(code.clone()));
        }
        if !is_room_code(raw_code) {
            return Err(SessionError::InvalidRoomCode(raw_code.to_owned()));
        }

        let code = raw_code.to_owned();
        let username = resolve_username(raw_username);

        outbox.subscribe(conn, &code);
        registry.get_or_create(&code);
        registry.add_user(&code, &username);
        info!(room = %code, %username, %conn, "user joined");

        let Some(room) = registry.get(&code) else {
            return Err(SessionError::RoomGone(code));
        };
        outbox.broadcast(&code, ServerEvent::UserJoined { username: username.clone() });
        outbox.broadcast(&code, ServerEvent::UserList { users: room.users.iter().cloned().collect() });
        outbox.send(conn, ServerEvent::History { messages: room.messages.clone() });

        *self = Session::Bound { code, username };
        Ok(())
    }

    pub fn message(&self, registry: &mut Registry, outbox: &Outbox, text: &str) -> Result<(), SessionError> {
        let Session::Bound { code, username } = self else {
            return Err(SessionError::NotJoined);
        };

        let text = format!("{username}: {text}");
        if !registry.append_message(code, text.clone()) {
            return Err(SessionError::RoomGone(code.clone()));
        }

        outbox.broadcast(code, ServerEvent::Message { text });
        Ok(())
    }

    /// Consumes the session; the caller has already pulled `conn` out of the room's group.
    pub fn disconnect(self, registry: &mut Registry, outbox: &Outbox) -> Result<(), SessionError> {
        let Session::Bound { code, username } = self else {
            return Err(SessionError::NotJoined);
        };

        registry.remove_user(&code, &username);
        let Some(room) = registry.get(&code) else {
            return Err(SessionError::RoomGone(code));
        };
        info!(room = %code, %username, "user left");

        let users = room.users.iter().cloned().collect();
        let now_empty = room.users.is_empty();
        outbox.broadcast(&code, ServerEvent::UserLeft { username });
        outbox.broadcast(&code, ServerEvent::UserList { users });

        if now_empty {
            registry.schedule_eviction_if_empty(&code);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_codes_are_exactly_six_ascii_digits() {
        for ok in ["000000", "123456", "999999"] {
            assert!(is_room_code(ok), "{ok}");
        }
        for bad in ["", "12345", "1234567", "12345a", " 123456", "１２３４５６", "12 456"] {
            assert!(!is_room_code(bad), "{bad:?}");
        }
    }

    #[test]
    fn given_usernames_are_kept_verbatim() {
        assert_eq!(resolve_username(Some("ann")), "ann");
        assert_eq!(resolve_username(Some(" ann ")), " ann ");
    }

    #[test]
    fn blank_usernames_get_a_placeholder() {
        for raw in [None, Some(""), Some("   "), Some("\t\n")] {
            for _ in 0..50 {
                let name = resolve_username(raw);
                let n = name.strip_prefix("User").unwrap();
                assert!((1..=3).contains(&n.len()), "{name}");
                assert!(n.parse::<u32>().unwrap() < 1000, "{name}");
            }
        }
    }
}
