use thiserror::Error;

/// Reasons a client event had no effect. None of these ever reach the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),

    #[error("already joined room {0}")]
    AlreadyJoined(String),

    #[error("not joined to a room")]
    NotJoined,

    #[error("room {0} no longer exists")]
    RoomGone(String),
}
