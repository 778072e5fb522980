use serde::{Deserialize, Serialize};

/// Frames a client may send, one JSON object per text frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    Join {
        code: String,
        #[serde(default)]
        username: Option<String>,
    },
    Message {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    UserJoined { username: String },
    UserList { users: Vec<String> },
    History { messages: Vec<String> },
    Message { text: String },
    UserLeft { username: String },
}
